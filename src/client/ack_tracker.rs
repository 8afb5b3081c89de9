//local shortcuts
use crate::*;

//third-party shortcuts
use tokio::time::Instant;

//standard shortcuts
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// A sent envelope that the server has not acknowledged yet.
#[derive(Debug, Clone)]
pub struct UnackedEntry
{
    pub envelope: Envelope,
    /// Session the envelope was sent under.
    pub session_id: String,
    pub sent_at: Instant,
}

//-------------------------------------------------------------------------------------------------------------------

/// Tracks sent transcript chunks until the server acknowledges them by chunk index.
///
/// Chunk indices are only unique within a session, so entries are keyed by session and chunk index. If an index
/// repeats within a session, an acknowledgment removes the oldest entry with that index.
#[derive(Debug, Default)]
pub struct AckTracker
{
    /// [ message id : entry ]
    entries: HashMap<String, UnackedEntry>,
    /// [ (session id, chunk index) : message ids in send order ]
    by_chunk: HashMap<(String, u64), VecDeque<String>>,
}

impl AckTracker
{
    /// Track an envelope sent under `session_id`. Envelopes that don't expect an ack are ignored and `false` is
    /// returned.
    pub fn track(&mut self, envelope: &Envelope, session_id: &str) -> bool
    {
        let Some(chunk_index) = envelope.chunk_index() else { return false; };

        let message_id = String::from(envelope.message_id());
        self.by_chunk
            .entry((String::from(session_id), chunk_index))
            .or_default()
            .push_back(message_id.clone());
        self.entries.insert(
                message_id,
                UnackedEntry{ envelope: envelope.clone(), session_id: String::from(session_id), sent_at: Instant::now() }
            );

        true
    }

    /// Remove the entry of `session_id` acknowledged by `chunk_index`. Unknown indices are ignored.
    pub fn acknowledge(&mut self, session_id: &str, chunk_index: u64) -> Option<UnackedEntry>
    {
        let key = (String::from(session_id), chunk_index);
        let ids = self.by_chunk.get_mut(&key)?;
        let message_id = ids.pop_front();
        if ids.is_empty() { self.by_chunk.remove(&key); }

        self.entries.remove(&message_id?)
    }

    pub fn get(&self, message_id: &str) -> Option<&UnackedEntry>
    {
        self.entries.get(message_id)
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// Entries written longer than `older_than` ago, oldest first.
    pub fn stale(&self, older_than: Duration) -> Vec<&UnackedEntry>
    {
        let now = Instant::now();
        let mut stale: Vec<&UnackedEntry> = self.entries
            .values()
            .filter(|entry| now.saturating_duration_since(entry.sent_at) > older_than)
            .collect();
        stale.sort_by_key(|entry| entry.sent_at);
        stale
    }

    pub fn clear(&mut self)
    {
        self.entries.clear();
        self.by_chunk.clear();
    }
}

//-------------------------------------------------------------------------------------------------------------------
