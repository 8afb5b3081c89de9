//local shortcuts

//third-party shortcuts

//standard shortcuts
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

//-------------------------------------------------------------------------------------------------------------------

/// Indicates where an outbound message currently is.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SendStatus
{
    /// The client handler has not processed the message yet.
    Pending,
    /// The message was written to the channel.
    ///
    /// Transcript chunks stay tracked until the server sends a matching `chunk_ack`.
    Sent,
    /// The message is in the offline queue and will be sent after (re)connecting.
    Queued,
    /// The message could not be serialized and was discarded.
    Dropped,
}

//-------------------------------------------------------------------------------------------------------------------

/// Tracks the status of one outbound message.
#[derive(Clone, Debug)]
pub struct SendSignal
{
    message_id : String,
    signal     : Arc<AtomicU8>,
}

impl SendSignal
{
    pub(crate) fn new(message_id: String, status: SendStatus) -> Self
    {
        let signal = Self{ message_id, signal: Arc::new(AtomicU8::new(0u8)) };
        signal.set(status);
        signal
    }

    /// Get the envelope id of the message.
    pub fn message_id(&self) -> &str
    {
        &self.message_id
    }

    /// Get the current status.
    pub fn status(&self) -> SendStatus
    {
        match self.signal.load(Ordering::Acquire)
        {
            0u8 => SendStatus::Pending,
            1u8 => SendStatus::Sent,
            2u8 => SendStatus::Queued,
            _   => SendStatus::Dropped,
        }
    }

    pub(crate) fn set(&self, status: SendStatus)
    {
        let value = match status
        {
            SendStatus::Pending => 0u8,
            SendStatus::Sent    => 1u8,
            SendStatus::Queued  => 2u8,
            SendStatus::Dropped => 3u8,
        };
        self.signal.store(value, Ordering::Release);
    }
}

//-------------------------------------------------------------------------------------------------------------------
