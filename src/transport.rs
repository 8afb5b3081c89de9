//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;

//-------------------------------------------------------------------------------------------------------------------

/// Close code for an intentional, normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

//-------------------------------------------------------------------------------------------------------------------

/// One open bidirectional text channel to the server.
#[async_trait::async_trait]
pub trait Channel: Send + 'static
{
    /// Write one text frame. Returns once the frame has been handed to the socket.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Read the next text frame.
    /// - Returns `None` once the channel is closed.
    /// - Must be cancel-safe: dropping the future must not lose a frame.
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the channel with a close code.
    async fn close(&mut self, code: u16, reason: &str);
}

//-------------------------------------------------------------------------------------------------------------------

/// Opens [`Channel`]s.
#[async_trait::async_trait]
pub trait Connector: Debug + Send + Sync + 'static
{
    async fn connect(&self, url: &url::Url) -> Result<Box<dyn Channel>, TransportError>;
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(feature = "tungstenite")]
mod ws
{
    //local shortcuts
    use crate::*;

    //third-party shortcuts
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::{Error as WsError, Message};
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    //standard shortcuts

    type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    /// Websocket [`Connector`] built on `tokio-tungstenite`.
    ///
    /// Ping/pong control frames are answered by the websocket layer.
    #[derive(Debug, Clone, Default)]
    pub struct WsConnector;

    #[async_trait::async_trait]
    impl Connector for WsConnector
    {
        async fn connect(&self, url: &url::Url) -> Result<Box<dyn Channel>, TransportError>
        {
            let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|err| TransportError::Connect(err.to_string()))?;
            tracing::debug!(%url, "websocket opened");

            Ok(Box::new(WsChannel{ stream }))
        }
    }

    struct WsChannel
    {
        stream: WsStream,
    }

    #[async_trait::async_trait]
    impl Channel for WsChannel
    {
        async fn send_text(&mut self, text: String) -> Result<(), TransportError>
        {
            self.stream
                .send(Message::Text(text.into()))
                .await
                .map_err(|err| match err
                    {
                        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
                        err => TransportError::Send(err.to_string()),
                    })
        }

        async fn next_text(&mut self) -> Option<Result<String, TransportError>>
        {
            loop
            {
                match self.stream.next().await?
                {
                    Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                    Ok(Message::Binary(bytes)) =>
                    {
                        match String::from_utf8(bytes.to_vec())
                        {
                            Ok(text) => return Some(Ok(text)),
                            Err(_)   => tracing::warn!("ignoring non-utf8 binary frame from server"),
                        }
                    }
                    Ok(Message::Close(close_frame)) =>
                    {
                        tracing::debug!(?close_frame, "closed by server");
                        return None;
                    }
                    Ok(_)    => (),  //ping/pong
                    Err(err) => return Some(Err(TransportError::Receive(err.to_string()))),
                }
            }
        }

        async fn close(&mut self, code: u16, reason: &str)
        {
            let close_frame = CloseFrame{ code: CloseCode::from(code), reason: reason.to_owned().into() };
            if let Err(err) = self.stream.close(Some(close_frame)).await
            {
                tracing::debug!(?err, "error while closing websocket");
            }
        }
    }
}

#[cfg(feature = "tungstenite")]
pub use ws::WsConnector;

//-------------------------------------------------------------------------------------------------------------------
