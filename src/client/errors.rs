//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// Errors emitted by the internal client handler.
#[derive(Debug, Clone)]
pub enum ClientError
{
    NotConnected,
    Serialization,
    Transport(TransportError),
}

impl std::fmt::Display for ClientError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let _ = write!(f, "ClientError::");
        match self
        {
            ClientError::NotConnected   => write!(f, "NotConnected"),
            ClientError::Serialization  => write!(f, "Serialization"),
            ClientError::Transport(err) => write!(f, "Transport({err})"),
        }
    }
}
impl std::error::Error for ClientError {}

impl From<TransportError> for ClientError
{
    fn from(err: TransportError) -> Self
    {
        ClientError::Transport(err)
    }
}

//-------------------------------------------------------------------------------------------------------------------
