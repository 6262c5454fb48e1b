//! Local Cart Store.
//!
//! Everything the client remembers between runs lives in one JSON document:
//!
//! ```json
//! {
//!   "authToken": "eyJ...",
//!   "localCartItems": [ { "productId": "p1", "name": "Mug", "price": "12.50", "quantity": 2 } ],
//!   "pendingMergeCartItems": []
//! }
//! ```
//!
//! The document is always read and written whole. [`FileStore`] writes to a
//! sibling temp file and renames it over the original, so a reader sees either
//! the old document or the new one and a token change lands together with the
//! matching cart change.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use boutique_core::{LineItem, merge};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from reading or writing local state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state document is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("state store lock poisoned")]
    Poisoned,
}

/// The persisted client state.
///
/// - `auth_token`: bearer token of the signed-in account, if any.
/// - `local_cart_items`: lines that exist only on this client. For a guest this
///   is the whole cart; for a signed-in shopper these are lines whose merge
///   into the account cart has not been confirmed yet.
/// - `pending_merge_cart_items`: lines staged for the next account merge.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub local_cart_items: Vec<LineItem>,
    #[serde(default)]
    pub pending_merge_cart_items: Vec<LineItem>,
}

impl std::fmt::Debug for StoredState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredState")
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("local_cart_items", &self.local_cart_items)
            .field("pending_merge_cart_items", &self.pending_merge_cart_items)
            .finish()
    }
}

impl StoredState {
    /// Parse a state document, dropping cart lines that fail validation.
    ///
    /// One bad line (a zero quantity, a blank name) should not cost the
    /// shopper the rest of their cart. Duplicate lines are folded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the document itself is not valid JSON
    /// of the expected shape.
    pub fn from_json(bytes: &[u8]) -> Result<Self, StoreError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            #[serde(default)]
            auth_token: Option<String>,
            #[serde(default)]
            local_cart_items: Vec<serde_json::Value>,
            #[serde(default)]
            pending_merge_cart_items: Vec<serde_json::Value>,
        }

        let raw: Raw = serde_json::from_slice(bytes)?;
        Ok(Self {
            auth_token: raw.auth_token.filter(|token| !token.trim().is_empty()),
            local_cart_items: valid_lines(raw.local_cart_items, "localCartItems"),
            pending_merge_cart_items: valid_lines(
                raw.pending_merge_cart_items,
                "pendingMergeCartItems",
            ),
        })
    }
}

fn valid_lines(values: Vec<serde_json::Value>, key: &str) -> Vec<LineItem> {
    let items: Vec<LineItem> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<LineItem>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(key, error = %e, "Dropping invalid stored cart line");
                None
            }
        })
        .collect();
    merge(&[], &items)
}

/// Persistent storage for [`StoredState`].
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read the current state. A store that has never been written returns
    /// the default (empty) state.
    async fn load(&self) -> Result<StoredState, StoreError>;

    /// Replace the stored state in one atomic write.
    async fn save(&self, state: &StoredState) -> Result<(), StoreError>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// A store backed by the file at `path`. Nothing is touched until the
    /// first load or save.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The state document's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn load(&self) -> Result<StoredState, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(StoredState::default()),
            Ok(bytes) => StoredState::from_json(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No local state yet");
                Ok(StoredState::default())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn save(&self, state: &StoredState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_vec_pretty(state)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                warn!(path = %temp.display(), error = %cleanup, "Could not remove temp state file");
            }
            return Err(self.io_error(e));
        }
        Ok(())
    }
}

/// In-process store, for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoredState>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with `state`.
    #[must_use]
    pub const fn with_state(state: StoredState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// A copy of the current state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Poisoned`] if a writer panicked.
    pub fn snapshot(&self) -> Result<StoredState, StoreError> {
        self.state
            .lock()
            .map(|state| state.clone())
            .map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn load(&self) -> Result<StoredState, StoreError> {
        self.snapshot()
    }

    async fn save(&self, state: &StoredState) -> Result<(), StoreError> {
        let mut guard = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        state.clone_into(&mut guard);
        Ok(())
    }
}

/// Typed access to the three stored keys.
///
/// Each helper is one load-modify-save of the whole document, so a multi-key
/// change such as staging (move local lines into the staging key) is a single
/// atomic write.
#[derive(Clone)]
pub struct CartStorage {
    store: Arc<dyn LocalStore>,
}

impl std::fmt::Debug for CartStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStorage").finish_non_exhaustive()
    }
}

impl CartStorage {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// The whole stored document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn load(&self) -> Result<StoredState, StoreError> {
        self.store.load().await
    }

    /// Apply `change` to the stored document and write it back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read or written.
    pub async fn update<T: Send>(
        &self,
        change: impl FnOnce(&mut StoredState) -> T + Send,
    ) -> Result<(StoredState, T), StoreError> {
        let mut state = self.store.load().await?;
        let output = change(&mut state);
        self.store.save(&state).await?;
        Ok((state, output))
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn token(&self) -> Result<Option<SecretString>, StoreError> {
        Ok(self.load().await?.auth_token.map(SecretString::from))
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub async fn set_token(&self, token: &SecretString) -> Result<(), StoreError> {
        let token = token.expose_secret().to_owned();
        self.update(|state| state.auth_token = Some(token)).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub async fn clear_token(&self) -> Result<(), StoreError> {
        self.update(|state| state.auth_token = None).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn local_items(&self) -> Result<Vec<LineItem>, StoreError> {
        Ok(self.load().await?.local_cart_items)
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub async fn set_local_items(&self, items: &[LineItem]) -> Result<(), StoreError> {
        let items = items.to_vec();
        self.update(|state| state.local_cart_items = items).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub async fn clear_local_items(&self) -> Result<(), StoreError> {
        self.update(|state| state.local_cart_items.clear()).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    pub async fn staged_items(&self) -> Result<Vec<LineItem>, StoreError> {
        Ok(self.load().await?.pending_merge_cart_items)
    }

    /// Move the local lines into the staging key, merging with anything
    /// already staged. Returns the staged list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read or written.
    pub async fn stage_items(&self) -> Result<Vec<LineItem>, StoreError> {
        let (state, ()) = self
            .update(|state| {
                let local = std::mem::take(&mut state.local_cart_items);
                state.pending_merge_cart_items = merge(&state.pending_merge_cart_items, &local);
            })
            .await?;
        Ok(state.pending_merge_cart_items)
    }

    /// Read and clear the staging key in one write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read or written.
    pub async fn take_staged(&self) -> Result<Vec<LineItem>, StoreError> {
        let (_, staged) = self
            .update(|state| std::mem::take(&mut state.pending_merge_cart_items))
            .await?;
        Ok(staged)
    }

    /// Fold the staging key back into the local lines.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read or written.
    pub async fn unstage_items(&self) -> Result<Vec<LineItem>, StoreError> {
        let (state, ()) = self
            .update(|state| {
                let staged = std::mem::take(&mut state.pending_merge_cart_items);
                state.local_cart_items = merge(&state.local_cart_items, &staged);
            })
            .await?;
        Ok(state.local_cart_items)
    }

    /// Forget the token and both cart keys.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be written.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        self.store.save(&StoredState::default()).await
    }
}
