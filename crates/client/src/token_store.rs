//! Persistent storage for the bearer token and the cached user record.
//!
//! Both entries are always written and cleared together so the cache can
//! never hold a user without the token that authenticated it.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use thiserror::Error;

use arkedia_auth::UserRecord;

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "token";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenStoreError {
    #[error("token store I/O failed: {0}")]
    Io(String),

    #[error("token store is corrupt: {0}")]
    Corrupt(String),

    #[error("could not resolve a data directory for the token store")]
    NoDataDir,
}

impl From<std::io::Error> for TokenStoreError {
    fn from(value: std::io::Error) -> Self {
        TokenStoreError::Io(value.to_string())
    }
}

/// Key/value client storage (the browser's `localStorage`, a file, ...).
pub trait TokenStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, TokenStoreError>;

    /// Write several entries in one operation.
    fn write(&self, entries: &[(&str, String)]) -> Result<(), TokenStoreError>;

    /// Remove several entries in one operation. Missing keys are ignored.
    fn remove(&self, keys: &[&str]) -> Result<(), TokenStoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory store for tests and hosts without persistent storage.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn write(&self, entries: &[(&str, String)]) -> Result<(), TokenStoreError> {
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), TokenStoreError> {
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File-backed store
// ─────────────────────────────────────────────────────────────────────────────

/// JSON file store: `{ "user": "...", "token": "..." }`.
///
/// Writes go to a sibling temp file that is renamed over the original, so a
/// crash never leaves half of a session on disk.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at `{app_data_dir}/arkedia/session.json`.
    pub fn in_data_dir() -> Result<Self, TokenStoreError> {
        Ok(Self::new(default_session_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_map(&self) -> Result<HashMap<String, String>, TokenStoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&text).map_err(|e| TokenStoreError::Corrupt(e.to_string()))
    }

    fn save_map(&self, map: &HashMap<String, String>) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(map).map_err(|e| TokenStoreError::Corrupt(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        write_private(&tmp, json.as_bytes())?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Create or truncate `path`, readable by the owner only on unix.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

impl TokenStore for FileTokenStore {
    fn read(&self, key: &str) -> Result<Option<String>, TokenStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load_map()?.remove(key))
    }

    fn write(&self, entries: &[(&str, String)]) -> Result<(), TokenStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.load_map().unwrap_or_else(|e| {
            tracing::warn!(path = ?self.path, "overwriting unreadable token store: {e}");
            HashMap::new()
        });
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        self.save_map(&map)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), TokenStoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        // A corrupt file is replaced by an empty one: clearing must always work.
        let mut map = self.load_map().unwrap_or_default();
        for key in keys {
            map.remove(*key);
        }
        self.save_map(&map)
    }
}

/// Resolve `{app_data_dir}/arkedia/session.json`.
pub fn default_session_path() -> Result<PathBuf, TokenStoreError> {
    let mut dir = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or(TokenStoreError::NoDataDir)?;

    dir.push("arkedia");
    dir.push("session.json");
    Ok(dir)
}

// ─────────────────────────────────────────────────────────────────────────────
// Session view over a token store
// ─────────────────────────────────────────────────────────────────────────────

/// What the token store currently holds.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredSession {
    Empty,
    Valid { user: UserRecord, token: String },
    /// Something is stored but cannot be used; the caller should clear it.
    Invalid(String),
}

/// Typed access to the `user` + `token` pair.
#[derive(Clone)]
pub struct SessionStorage {
    store: Arc<dyn TokenStore>,
}

impl SessionStorage {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<StoredSession, TokenStoreError> {
        let user = self.store.read(USER_KEY)?;
        let token = self.store.read(TOKEN_KEY)?.filter(|t| !t.trim().is_empty());

        Ok(match (user, token) {
            (None, None) => StoredSession::Empty,
            (Some(raw), Some(token)) => match serde_json::from_str::<UserRecord>(&raw) {
                Ok(user) => StoredSession::Valid { user, token },
                Err(e) => StoredSession::Invalid(format!("cached user is unreadable: {e}")),
            },
            (Some(_), None) => StoredSession::Invalid("cached user has no token".to_string()),
            (None, Some(_)) => StoredSession::Invalid("token has no cached user".to_string()),
        })
    }

    pub fn token(&self) -> Result<Option<String>, TokenStoreError> {
        self.store.read(TOKEN_KEY)
    }

    pub fn persist(&self, user: &UserRecord, token: &str) -> Result<(), TokenStoreError> {
        let user_json =
            serde_json::to_string(user).map_err(|e| TokenStoreError::Corrupt(e.to_string()))?;
        self.store
            .write(&[(USER_KEY, user_json), (TOKEN_KEY, token.to_string())])
    }

    pub fn clear(&self) -> Result<(), TokenStoreError> {
        self.store.remove(&[USER_KEY, TOKEN_KEY])
    }
}

impl core::fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStorage").finish_non_exhaustive()
    }
}
