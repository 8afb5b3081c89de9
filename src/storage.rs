//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use core::fmt::Debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

//-------------------------------------------------------------------------------------------------------------------

/// Storage key for the persisted session (id and transcript chunk counter).
pub const SESSION_ID_KEY: &'static str = "session_id";

/// Storage key for the offline queue of a stream.
pub fn offline_queue_key(stream: &str) -> String
{
    format!("offline_queue.{}", stream)
}

//-------------------------------------------------------------------------------------------------------------------

/// Key-value store for client state that must survive restarts (the offline queue and the session id).
///
/// Values are JSON strings. Calls are synchronous; writes must be durable when `store()` returns.
pub trait Storage: Debug + Send + Sync + 'static
{
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn store(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

//-------------------------------------------------------------------------------------------------------------------

/// In-memory storage. Clones share the same map, so a clone can stand in for a restarted process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage
{
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage
{
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl Storage for MemoryStorage
{
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>
    {
        let Ok(values) = self.values.lock() else { return Err(StorageError::Poisoned); };
        Ok(values.get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> Result<(), StorageError>
    {
        let Ok(mut values) = self.values.lock() else { return Err(StorageError::Poisoned); };
        values.insert(String::from(key), String::from(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError>
    {
        let Ok(mut values) = self.values.lock() else { return Err(StorageError::Poisoned); };
        values.remove(key);
        Ok(())
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// File-backed storage: one `<key>.json` file per key inside a directory.
///
/// Writes go to a temp file that is then renamed over the target, so a crash mid-write leaves the old value intact.
#[derive(Debug, Clone)]
pub struct FileStorage
{
    dir: PathBuf,
}

impl FileStorage
{
    /// Open (and create if needed) a storage directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StorageError>
    {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self{ dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError>
    {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid { return Err(StorageError::InvalidKey(String::from(key))); }

        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl Storage for FileStorage
{
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>
    {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path)
        {
            Ok(value)                                             => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err)                                              => Err(err.into()),
        }
    }

    fn store(&self, key: &str, value: &str) -> Result<(), StorageError>
    {
        let path = self.path_for(key)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, value)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError>
    {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path)
        {
            Ok(())                                                => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err)                                              => Err(err.into()),
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------
