//local shortcuts
use crate::*;

//third-party shortcuts
use serde::{Serialize, Deserialize};

//standard shortcuts
use std::sync::{Arc, Mutex};

//-------------------------------------------------------------------------------------------------------------------

/// What is persisted under [`SESSION_ID_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionRecord
{
    id: String,
    /// Next transcript chunk index to hand out.
    #[serde(default)]
    next_chunk_index: u64,
}

impl SessionRecord
{
    fn new() -> Self
    {
        Self{ id: uuid::Uuid::new_v4().to_string(), next_chunk_index: 0u64 }
    }

    /// Accepts the full record, or a bare id string (counter starts at zero).
    fn parse(value: &str) -> Option<Self>
    {
        if let Ok(record) = serde_json::from_str::<SessionRecord>(value) { return Some(record); }
        let id = serde_json::from_str::<String>(value).ok()?;
        Some(Self{ id, next_chunk_index: 0u64 })
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[derive(Debug)]
struct SessionInner
{
    /// where the record is persisted
    storage: Arc<dyn Storage>,
    record: Mutex<SessionRecord>,
}

//-------------------------------------------------------------------------------------------------------------------

/// Stable identity for one call attempt, shared by every stream of a call.
///
/// The id and the transcript chunk counter are persisted together under [`SESSION_ID_KEY`], so a resumed session
/// keeps handing out increasing chunk indices. The id only changes on [`Self::reset()`].
/// Clones share the same identity.
#[derive(Debug, Clone)]
pub struct SessionIdentity
{
    inner: Arc<SessionInner>,
}

impl SessionIdentity
{
    /// Resume the persisted session, or generate and persist a new one.
    pub fn load_or_create(storage: Arc<dyn Storage>) -> Self
    {
        let existing = match storage.load(SESSION_ID_KEY)
        {
            Ok(value) => value.and_then(|value| SessionRecord::parse(&value)),
            Err(err) =>
            {
                tracing::warn!(?err, "failed loading persisted session, starting a new session");
                None
            }
        };

        let record = match existing
        {
            Some(record) =>
            {
                tracing::info!(session_id = %record.id, next_chunk_index = record.next_chunk_index, "resumed session");
                record
            }
            None =>
            {
                let record = SessionRecord::new();
                persist_record(&*storage, &record);
                tracing::info!(session_id = %record.id, "created session");
                record
            }
        };

        Self{ inner: Arc::new(SessionInner{ storage, record: Mutex::new(record) }) }
    }

    /// Access the current session id.
    pub fn id(&self) -> String
    {
        let Ok(record) = self.inner.record.lock() else { return String::default(); };
        record.id.clone()
    }

    /// Reserve the next transcript chunk index.
    pub fn next_chunk_index(&self) -> u64
    {
        self.reserve_chunk_index().1
    }

    /// Reserve the next transcript chunk index together with the session it belongs to.
    ///
    /// The advanced counter is persisted before returning.
    pub fn reserve_chunk_index(&self) -> (String, u64)
    {
        let Ok(mut record) = self.inner.record.lock() else { return (String::default(), 0u64); };
        let chunk_index = record.next_chunk_index;
        record.next_chunk_index = chunk_index.saturating_add(1u64);
        persist_record(&*self.inner.storage, &record);

        (record.id.clone(), chunk_index)
    }

    /// Number of chunk indices handed out in this session.
    pub fn chunks_issued(&self) -> u64
    {
        let Ok(record) = self.inner.record.lock() else { return 0u64; };
        record.next_chunk_index
    }

    /// Start a new session: new id and the chunk counter back at zero, both persisted.
    pub fn reset(&self) -> String
    {
        let Ok(mut record) = self.inner.record.lock() else { return String::default(); };
        *record = SessionRecord::new();
        persist_record(&*self.inner.storage, &record);
        tracing::info!(session_id = %record.id, "session reset");

        record.id.clone()
    }
}

//-------------------------------------------------------------------------------------------------------------------

fn persist_record(storage: &dyn Storage, record: &SessionRecord)
{
    let Ok(value) = serde_json::to_string(record) else { return; };
    if let Err(err) = storage.store(SESSION_ID_KEY, &value)
    {
        tracing::error!(?err, "failed persisting session");
    }
}

//-------------------------------------------------------------------------------------------------------------------
