//local shortcuts

//third-party shortcuts
use thiserror::Error;

//standard shortcuts


//-------------------------------------------------------------------------------------------------------------------

/// Errors emitted by a [`Connector`](crate::Connector) or [`Channel`](crate::Channel).
///
/// These are always recoverable from the client's point of view.
#[derive(Debug, Clone, Error)]
pub enum TransportError
{
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("connect timed out")]
    Timeout,
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("channel closed")]
    Closed,
}

//-------------------------------------------------------------------------------------------------------------------

/// Errors emitted by a [`Storage`](crate::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError
{
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("storage lock poisoned")]
    Poisoned,
}

//-------------------------------------------------------------------------------------------------------------------
