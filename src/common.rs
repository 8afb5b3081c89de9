//local shortcuts

//third-party shortcuts
use serde::{Serialize, Deserialize};

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// Prefix for application message ids.
pub const MESSAGE_ID_PREFIX: &'static str = "msg";
/// Prefix for heartbeat message ids.
pub const HEARTBEAT_ID_PREFIX: &'static str = "hb";

/// Name of the default stream (transcripts and call lifecycle).
pub const CALL_STREAM: &'static str = "call";
/// Name of the optional dedicated location stream.
pub const LOCATION_STREAM: &'static str = "location";

//-------------------------------------------------------------------------------------------------------------------

/// Make a globally unique message id: `{prefix}_{uuid}`.
pub fn new_message_id(prefix: &str) -> String
{
    format!("{}_{}", prefix, uuid::Uuid::new_v4())
}

//-------------------------------------------------------------------------------------------------------------------

/// Connection state of a [`Client`](crate::Client).
///
/// Exactly one state exists per client. It decides whether sends go to the channel or to the offline queue.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState
{
    /// Not connected and not trying to connect. Initial state, and the state after [`Client::disconnect()`].
    ///
    /// [`Client::disconnect()`]: crate::Client::disconnect
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The channel is open.
    Connected,
    /// Waiting for the backoff timer before the next connection attempt.
    Reconnecting,
    /// The initial connection attempt failed and automatic reconnects are disabled.
    ///
    /// Calling [`Client::connect()`](crate::Client::connect) again is allowed.
    Error,
    /// Reconnect attempts were exhausted. The client will not reconnect on its own.
    Failed,
}

impl ConnectionState
{
    pub(crate) fn to_u8(self) -> u8
    {
        match self
        {
            ConnectionState::Disconnected => 0u8,
            ConnectionState::Connecting   => 1u8,
            ConnectionState::Connected    => 2u8,
            ConnectionState::Reconnecting => 3u8,
            ConnectionState::Error        => 4u8,
            ConnectionState::Failed       => 5u8,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self
    {
        match value
        {
            0u8 => ConnectionState::Disconnected,
            1u8 => ConnectionState::Connecting,
            2u8 => ConnectionState::Connected,
            3u8 => ConnectionState::Reconnecting,
            4u8 => ConnectionState::Error,
            _   => ConnectionState::Failed,
        }
    }

    /// Terminal states end a connection cycle; only an explicit `connect()` leaves them.
    pub fn is_terminal(&self) -> bool
    {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed)
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Make a stream url: `{server_url}/ws/{stream}/{session_id}`.
///
/// Any path already on `server_url` is kept as a prefix.
pub fn make_stream_url(server_url: &url::Url, stream: &str, session_id: &str) -> Result<url::Url, ()>
{
    let mut url = server_url.clone();
    {
        let mut segments = url.path_segments_mut()?;
        segments.pop_if_empty();
        segments.push("ws");
        segments.push(stream);
        segments.push(session_id);
    }
    Ok(url)
}

//-------------------------------------------------------------------------------------------------------------------
