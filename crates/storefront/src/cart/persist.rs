//! Best-effort persistence of the cart identity.
//!
//! The held cart identity is mirrored to a single file so a returning
//! session can resume the same cart. Storage is a side channel: every
//! access is fail-silent, and a missing or corrupt file means "no
//! identity" - it never affects cart operation outcomes.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use greenmarket_core::CartId;

/// Durable single-file store for the cart identity.
#[derive(Debug, Clone)]
pub struct CartIdStore {
    path: PathBuf,
}

impl CartIdStore {
    /// Create a store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the persisted identity.
    ///
    /// Anything that does not read and parse as a numeric identifier is
    /// treated as no identity.
    #[must_use]
    pub fn load(&self) -> Option<CartId> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => raw.trim().parse::<CartId>().ok(),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no persisted cart id");
                None
            }
        }
    }

    /// Mirror a new identity to disk.
    pub fn store(&self, id: CartId) {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            debug!(path = %self.path.display(), error = %e, "failed to create cart id directory");
            return;
        }

        if let Err(e) = fs::write(&self.path, id.to_string()) {
            debug!(path = %self.path.display(), error = %e, "failed to persist cart id");
        }
    }

    /// Erase the persisted identity.
    pub fn remove(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %e, "failed to remove persisted cart id");
        }
    }
}
