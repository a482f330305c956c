//! Last-known-good snapshot of the resolved user.
//!
//! DESIGN
//! ======
//! The cache is a fallback for the "provider unreachable" path only; the
//! store always prefers a fresh resolution. One well-known key, overwrite on
//! every successful resolution, removed on logout. Storage failures are
//! logged and swallowed: a missing, unreadable, or corrupt entry all read as
//! `None`, and a failed write leaves the previous entry in place.

use std::sync::Arc;

use crate::model::User;
use crate::storage::KeyValueStorage;

/// Storage key holding the JSON-serialized [`User`].
pub const USER_CACHE_KEY: &str = "user";

#[derive(Clone)]
pub struct UserCache {
    storage: Arc<dyn KeyValueStorage>,
}

impl UserCache {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Store `user` under the cache key, replacing any previous entry.
    pub async fn persist(&self, user: &User) {
        let json = match serde_json::to_string(user) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "user cache serialize failed");
                return;
            }
        };
        match self.storage.set_item(USER_CACHE_KEY, &json).await {
            Ok(()) => tracing::debug!(user_id = %user.id, "user cached"),
            Err(e) => tracing::warn!(error = %e, "user cache write failed"),
        }
    }

    /// Last persisted user, or `None` when absent, unreadable, or corrupt.
    pub async fn read(&self) -> Option<User> {
        let raw = match self.storage.get_item(USER_CACHE_KEY).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "user cache read failed");
                return None;
            }
        };
        match serde_json::from_str::<User>(&raw) {
            Ok(user) if user.is_consistent() => Some(user),
            Ok(user) => {
                tracing::warn!(user_id = %user.id, "cached user has mismatched profile kind; ignoring");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "cached user is corrupt; ignoring");
                None
            }
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.storage.remove_item(USER_CACHE_KEY).await {
            tracing::warn!(error = %e, "user cache clear failed");
        }
    }
}

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
