//! Token Holder: durable storage for the single bearer credential.
//!
//! SYSTEM CONTEXT
//! ==============
//! The credential is owned here and nowhere else. The gateway reads it on
//! every request and clears it on `401`; the session store writes it after
//! login. Neither keeps a second copy.
//!
//! TRADE-OFFS
//! ==========
//! Reads and clears never fail from the caller's point of view: a broken
//! storage medium is logged and treated as "no credential", which degrades to
//! an anonymous session instead of wedging the client. Writes do report
//! failure, because login must not claim success for a credential that was
//! never persisted.

#[cfg(test)]
#[path = "token_test.rs"]
mod token_test;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Storage key used by every medium that is keyed (browser `localStorage`).
pub const DEFAULT_STORAGE_KEY: &str = "token";

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error("token storage unavailable: {0}")]
    Unavailable(String),
    #[error("token storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A storage medium holding at most one credential value.
pub trait TokenStore: Send + Sync {
    /// Read the stored value, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read.
    fn load(&self) -> Result<Option<String>, TokenStoreError>;

    /// Replace the stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn save(&self, token: &str) -> Result<(), TokenStoreError>;

    /// Remove the stored value. Removing an absent value succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be written.
    fn remove(&self) -> Result<(), TokenStoreError>;
}

/// Shared handle to the credential slot.
#[derive(Clone)]
pub struct TokenHolder {
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for TokenHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenHolder")
            .field("present", &self.is_present())
            .finish()
    }
}

impl TokenHolder {
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self { store: Arc::new(store) }
    }

    /// Holder backed by process memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::default())
    }

    /// Store `token` unconditionally. No shape validation is performed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage medium rejects the write.
    pub fn set(&self, token: &str) -> Result<(), TokenStoreError> {
        self.store.save(token)
    }

    /// Current credential, or `None` when absent or unreadable.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "token read failed; treating credential as absent");
                None
            }
        }
    }

    /// Drop the credential. Idempotent.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove() {
            tracing::warn!(error = %e, "token clear failed");
        }
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// Credential slot that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { slot: Mutex::new(Some(token.to_owned())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn remove(&self) -> Result<(), TokenStoreError> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

// =============================================================================
// FILE
// =============================================================================

/// Credential kept in a single file so it survives process restarts.
///
/// The file holds the token bytes; trailing line breaks from hand edits are
/// ignored and a missing file reads as absent. On unix the file is readable
/// by its owner only.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw.trim_end_matches(['\r', '\n']).to_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_private(&self.path, token)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), TokenStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn write_private(path: &Path, token: &str) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);

    let mut file = options.open(path)?;
    // `mode` only applies on create; a file left by an older run keeps its bits.
    #[cfg(unix)]
    file.set_permissions(std::os::unix::fs::PermissionsExt::from_mode(0o600))?;
    file.write_all(token.as_bytes())
}
