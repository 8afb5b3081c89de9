//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// Emitted by clients when the connection changes.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientReport
{
    /// The client connected to the server. Queued messages start draining after this report.
    Connected,
    /// The channel was lost. A [`ClientReport::Reconnecting`] or [`ClientReport::Failed`] report follows unless the
    /// client was told to disconnect.
    Disconnected,
    /// A reconnect attempt is scheduled.
    Reconnecting{
        /// 1-based attempt number since the last successful connection.
        attempt: u32,
        /// Wait before the attempt.
        delay: Duration,
    },
    /// A connection attempt or channel operation failed. Recoverable.
    TransportError(String),
    /// The channel was closed to reopen it for another session. A [`ClientReport::Connected`] report follows
    /// once the channel for `session_id` is open.
    SessionChanged{ session_id: String },
    /// The client closed itself via `disconnect()`.
    ClosedBySelf,
    /// Reconnect attempts were exhausted. The client stays down until `connect()` is called.
    Failed{ attempts: u32 },
}

//-------------------------------------------------------------------------------------------------------------------

/// An event received by a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent
{
    /// A connection report.
    Report(ClientReport),
    /// The server accepted the stream.
    ConnectionAck(ConnectionAck),
    /// The server confirmed a transcript chunk.
    ChunkAck(ChunkAck),
    /// Structured information the server extracted from the call.
    ExtractedInfo(ExtractedInfo),
    /// Aggregated incident summary.
    SummaryUpdate(SummaryUpdate),
    /// The server rejected something.
    ServerError(ServerError),
}

//-------------------------------------------------------------------------------------------------------------------
