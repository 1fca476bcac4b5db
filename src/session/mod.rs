//! Session module - conversation state management
//!
//! The agent loop only needs two things from a session store: fetch (or
//! create) the session for a key, and persist it again after a turn. That
//! contract is the [`SessionStore`] trait. [`SessionManager`] is the bundled
//! implementation, an in-memory cache with optional JSON-file persistence.
//!
//! # Example
//!
//! ```
//! use golem::session::{Message, SessionManager, SessionStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = SessionManager::new_memory();
//!
//!     let mut session = manager.get_or_create("telegram:chat123").await.unwrap();
//!     session.add_message(Message::user("Hello!"));
//!     session.add_message(Message::assistant("Hi there!"));
//!
//!     manager.save(&session).await.unwrap();
//! }
//! ```

pub mod types;

pub use types::{Message, Role, Session, ToolCall};

use crate::config::Config;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Storage contract consumed by the agent loop.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session for `key`, creating an empty one if none exists.
    async fn get_or_create(&self, key: &str) -> Result<Session>;

    /// Persists `session` under its own key, replacing the previous state.
    async fn save(&self, session: &Session) -> Result<()>;
}

/// Session manager for storing and retrieving conversation sessions.
///
/// Sessions are cached in memory and, when a storage directory is set,
/// written to `<dir>/<sanitized key>.json` on every save. Saves to the same
/// key are serialized so concurrent writers never interleave on disk.
///
/// Cloning is cheap and clones share the same cache.
pub struct SessionManager {
    /// In-memory cache of sessions
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    /// One lock per key, held for the duration of a save
    save_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    /// Optional directory for file-based persistence
    storage_path: Option<PathBuf>,
}

impl SessionManager {
    /// Create a session manager persisting to `~/.golem/sessions/`.
    ///
    /// # Errors
    /// Returns an error if the sessions directory cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_path(Config::dir().join("sessions"))
    }

    /// Create an in-memory session manager without persistence.
    pub fn new_memory() -> Self {
        Self::build(None)
    }

    /// Create a session manager persisting to `path`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    ///
    /// # Example
    /// ```no_run
    /// use golem::session::SessionManager;
    /// use std::path::PathBuf;
    ///
    /// let manager = SessionManager::with_path(PathBuf::from("/tmp/sessions")).unwrap();
    /// ```
    pub fn with_path(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self::build(Some(path)))
    }

    fn build(storage_path: Option<PathBuf>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            save_locks: Arc::new(Mutex::new(HashMap::new())),
            storage_path,
        }
    }

    /// Get a session by key without creating it.
    ///
    /// # Errors
    /// Returns an error if the session file exists but cannot be read.
    pub async fn get(&self, key: &str) -> Result<Option<Session>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(key) {
                return Ok(Some(session.clone()));
            }
        }

        let Some(session) = self.load_from_disk(key).await? else {
            return Ok(None);
        };

        let mut sessions = self.sessions.write().await;
        let cached = sessions
            .entry(key.to_string())
            .or_insert(session)
            .clone();
        Ok(Some(cached))
    }

    /// Delete a session from memory and disk.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.sessions.write().await.remove(key);

        if let Some(file_path) = self.file_path(key) {
            if tokio::fs::try_exists(&file_path).await? {
                tokio::fs::remove_file(&file_path).await?;
            }
        }
        Ok(())
    }

    /// List all session keys, from memory and disk, sorted.
    ///
    /// # Example
    /// ```
    /// use golem::session::{SessionManager, SessionStore};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let manager = SessionManager::new_memory();
    ///     manager.get_or_create("session1").await.unwrap();
    ///     manager.get_or_create("session2").await.unwrap();
    ///
    ///     assert_eq!(manager.list().await.unwrap().len(), 2);
    /// }
    /// ```
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.sessions.read().await.keys().cloned().collect();

        // File names are lossy, so read each file for its real key.
        if let Some(ref storage_path) = self.storage_path {
            let mut dir_entries = tokio::fs::read_dir(storage_path).await?;
            while let Some(entry) = dir_entries.next_entry().await? {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    let Ok(content) = tokio::fs::read_to_string(&path).await else {
                        continue;
                    };
                    if let Ok(session) = serde_json::from_str::<Session>(&content) {
                        if !keys.contains(&session.key) {
                            keys.push(session.key);
                        }
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Number of sessions currently cached in memory.
    pub async fn cache_size(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn load_from_disk(&self, key: &str) -> Result<Option<Session>> {
        let Some(file_path) = self.file_path(key) else {
            return Ok(None);
        };
        if !tokio::fs::try_exists(&file_path).await? {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&file_path).await?;
        let session: Session = serde_json::from_str(&content)?;
        debug!(session = %key, path = %file_path.display(), "Loaded session from disk");
        Ok(Some(session))
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.save_locks.lock().await;
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    /// Drops the per-key lock, forgetting it once no other save holds it.
    async fn release_key_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        // Clones are only handed out under the map lock, so the count is stable here.
        let mut locks = self.save_locks.lock().await;
        drop(lock);
        if locks
            .get(key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(key);
        }
    }

    async fn write_session(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.key.clone(), session.clone());

        if let Some(file_path) = self.file_path(&session.key) {
            let content = serde_json::to_string_pretty(session)?;
            let tmp_path = file_path.with_extension("json.tmp");
            tokio::fs::write(&tmp_path, content).await?;
            tokio::fs::rename(&tmp_path, &file_path).await?;
            debug!(
                session = %session.key,
                messages = session.messages.len(),
                "Saved session"
            );
        }
        Ok(())
    }

    fn file_path(&self, key: &str) -> Option<PathBuf> {
        self.storage_path
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", sanitize_key(key))))
    }
}

#[async_trait]
impl SessionStore for SessionManager {
    /// Looks in memory, then on disk, then creates a new empty session.
    async fn get_or_create(&self, key: &str) -> Result<Session> {
        if let Some(session) = self.get(key).await? {
            return Ok(session);
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(key.to_string())
            .or_insert_with(|| Session::new(key))
            .clone();
        Ok(session)
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let lock = self.key_lock(&session.key).await;
        let result = {
            let _guard = lock.lock().await;
            self.write_session(session).await
        };
        self.release_key_lock(&session.key, lock).await;
        result
    }
}

/// Maps a session key to a file stem.
///
/// Characters that are unsafe in file names (`:` and `/` among them) are
/// percent-encoded, and `%` itself is escaped, so distinct keys never share
/// a file.
fn sanitize_key(key: &str) -> String {
    let mut result = String::with_capacity(key.len() * 3);
    for c in key.chars() {
        match c {
            '/' => result.push_str("%2F"),
            '\\' => result.push_str("%5C"),
            ':' => result.push_str("%3A"),
            '*' => result.push_str("%2A"),
            '?' => result.push_str("%3F"),
            '"' => result.push_str("%22"),
            '<' => result.push_str("%3C"),
            '>' => result.push_str("%3E"),
            '|' => result.push_str("%7C"),
            '%' => result.push_str("%25"),
            c => result.push(c),
        }
    }
    result
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            save_locks: Arc::clone(&self.save_locks),
            storage_path: self.storage_path.clone(),
        }
    }
}

impl Default for SessionManager {
    /// Creates an in-memory session manager.
    fn default() -> Self {
        Self::new_memory()
    }
}
