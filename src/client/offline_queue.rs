//local shortcuts
use crate::*;

//third-party shortcuts
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

//standard shortcuts
use std::collections::VecDeque;
use std::sync::Arc;

//-------------------------------------------------------------------------------------------------------------------

/// An envelope waiting in the offline queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEnvelope
{
    pub envelope: Envelope,
    /// Session the envelope belongs to. It is only ever sent on a channel opened for this session.
    pub session_id: String,
    /// When the envelope entered the queue.
    pub queued_at: DateTime<Utc>,
}

//-------------------------------------------------------------------------------------------------------------------

/// Durable FIFO of envelopes that could not be sent yet.
///
/// The whole queue is written to storage after every mutation, so a process restart resumes with the same entries
/// in the same order. Storage failures are logged and the in-memory queue stays authoritative.
#[derive(Debug)]
pub struct OfflineQueue
{
    storage: Arc<dyn Storage>,
    key: String,
    entries: VecDeque<QueuedEnvelope>,
}

impl OfflineQueue
{
    /// Load the queue persisted under `key`. Missing or unreadable data starts an empty queue.
    pub fn load(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self
    {
        let key = key.into();
        let entries = match storage.load(&key)
        {
            Ok(None) => VecDeque::default(),
            Ok(Some(value)) => match serde_json::from_str::<VecDeque<QueuedEnvelope>>(&value)
            {
                Ok(entries) => entries,
                Err(err) =>
                {
                    tracing::warn!(?err, key = %key, "discarding unreadable offline queue");
                    VecDeque::default()
                }
            },
            Err(err) =>
            {
                tracing::warn!(?err, key = %key, "failed loading offline queue");
                VecDeque::default()
            }
        };

        if !entries.is_empty()
        {
            tracing::info!(key = %key, len = entries.len(), "restored offline queue");
        }

        Self{ storage, key, entries }
    }

    /// Append an envelope of `session_id` to the back of the queue and persist.
    ///
    /// The envelope is kept in memory even if persisting fails.
    pub fn enqueue(&mut self, envelope: Envelope, session_id: impl Into<String>) -> Result<(), StorageError>
    {
        self.entries.push_back(QueuedEnvelope{ envelope, session_id: session_id.into(), queued_at: Utc::now() });
        self.persist()
    }

    /// Peek at the oldest entry.
    pub fn front(&self) -> Option<&QueuedEnvelope>
    {
        self.entries.front()
    }

    /// Remove the oldest entry and persist.
    pub fn pop_front(&mut self) -> Option<QueuedEnvelope>
    {
        let entry = self.entries.pop_front()?;
        if let Err(err) = self.persist()
        {
            tracing::error!(?err, key = %self.key, "failed persisting offline queue");
        }
        Some(entry)
    }

    /// Remove the oldest entry only if it is the envelope with `message_id`.
    pub fn pop_sent(&mut self, message_id: &str) -> Option<QueuedEnvelope>
    {
        if self.entries.front()?.envelope.message_id() != message_id { return None; }
        self.pop_front()
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// Iterate entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedEnvelope> + '_
    {
        self.entries.iter()
    }

    fn persist(&self) -> Result<(), StorageError>
    {
        if self.entries.is_empty()
        {
            return self.storage.remove(&self.key);
        }

        let value = serde_json::to_string(&self.entries)?;
        self.storage.store(&self.key, &value)
    }
}

//-------------------------------------------------------------------------------------------------------------------
