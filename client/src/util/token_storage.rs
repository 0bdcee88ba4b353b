//! `localStorage`-backed credential slot.
//!
//! Client-side (hydrate): reads and writes the tab's `localStorage`, so the
//! token survives reloads for the lifetime of the browser profile.
//! Server-side (SSR): no storage exists; reads are absent and writes fail.

#[cfg(test)]
#[path = "token_storage_test.rs"]
mod token_storage_test;

use notex::token::{DEFAULT_STORAGE_KEY, TokenStore, TokenStoreError};

#[derive(Debug, Clone)]
pub struct LocalStorageTokenStore {
    key: String,
}

impl Default for LocalStorageTokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_KEY)
    }
}

impl LocalStorageTokenStore {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[cfg(feature = "hydrate")]
fn storage() -> Result<web_sys::Storage, TokenStoreError> {
    web_sys::window()
        .ok_or_else(|| TokenStoreError::Unavailable("no window".to_owned()))?
        .local_storage()
        .map_err(|e| TokenStoreError::Unavailable(format!("{e:?}")))?
        .ok_or_else(|| TokenStoreError::Unavailable("localStorage disabled".to_owned()))
}

impl TokenStore for LocalStorageTokenStore {
    fn load(&self) -> Result<Option<String>, TokenStoreError> {
        #[cfg(feature = "hydrate")]
        {
            storage()?
                .get_item(&self.key)
                .map_err(|e| TokenStoreError::Unavailable(format!("{e:?}")))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            Ok(None)
        }
    }

    fn save(&self, token: &str) -> Result<(), TokenStoreError> {
        #[cfg(feature = "hydrate")]
        {
            storage()?
                .set_item(&self.key, token)
                .map_err(|e| TokenStoreError::Unavailable(format!("{e:?}")))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = token;
            Err(TokenStoreError::Unavailable(format!("no localStorage for {}", self.key)))
        }
    }

    fn remove(&self) -> Result<(), TokenStoreError> {
        #[cfg(feature = "hydrate")]
        {
            storage()?
                .remove_item(&self.key)
                .map_err(|e| TokenStoreError::Unavailable(format!("{e:?}")))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            Ok(())
        }
    }
}
