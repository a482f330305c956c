//! The single subscribable identity value every screen consumes.
//!
//! ARCHITECTURE
//! ============
//! `IdentityStore` wraps one [`AsyncResource`] whose fetcher is the passive
//! load cycle:
//!
//! ```text
//! get_current_principal ──ok──▶ resolve ──ok──▶ persist ──▶ Resolved(user)
//!        │                         │
//!        │ err                     └─err──▶ cached user with same id ──▶ CachedFallback
//!        ▼                                   else                    ──▶ Resolved(unresolved)
//!   cache.read ──some──▶ CachedFallback(user)
//!              └─none──▶ Empty
//! ```
//!
//! The load cycle never fails; every fault degrades to a cached or empty
//! outcome. Interactive actions (`sign_in_*`, `sign_out`) go through the
//! `SessionClient`, return their own typed result, and then restart the load.
//!
//! SESSION CHANGES
//! ===============
//! A cycle records the session epoch when it starts and writes the cache only
//! if the epoch is unchanged. Session changes and cache writes are serialized
//! by one async commit lock, and a successful change advances the epoch before
//! releasing it. A cycle that overlapped a logout or sign-in therefore cannot
//! write the previous principal back into the cache.
//!
//! Instances are plain values: tests build as many independent stores as
//! they need.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::watch;

use crate::cache::UserCache;
use crate::config::CollectionIds;
use crate::error::{LoginError, OAuthError};
use crate::model::User;
use crate::provider::{IdentityProvider, OAuthProvider};
use crate::resolver::IdentityResolver;
use crate::resource::{AsyncResource, Fetcher, ResourceState};
use crate::session::{AuthBrowser, SessionClient};

// =============================================================================
// LOAD OUTCOME / SNAPSHOT
// =============================================================================

/// Result of one passive load cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Freshly resolved from the provider.
    Resolved(User),
    /// Provider unreachable or lookup failed; last persisted user served instead.
    CachedFallback(User),
    /// No session and nothing cached.
    Empty,
}

impl LoadOutcome {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Resolved(user) | Self::CachedFallback(user) => Some(user),
            Self::Empty => None,
        }
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::CachedFallback(_))
    }
}

/// Immutable view published on every store update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySnapshot {
    pub user: Option<User>,
    pub is_logged: bool,
    pub loading: bool,
    pub error: Option<String>,
    /// `user` came from the cache rather than a fresh resolution.
    pub stale: bool,
}

impl IdentitySnapshot {
    fn from_state(state: &ResourceState<LoadOutcome>) -> Self {
        let outcome = state.data.as_ref();
        let user = outcome.and_then(LoadOutcome::user).cloned();
        Self {
            is_logged: user.is_some() && state.error.is_none(),
            user,
            loading: state.loading,
            error: state.error.clone(),
            stale: outcome.is_some_and(LoadOutcome::is_stale),
        }
    }
}

/// Receiver side of the store; each update yields a fresh snapshot.
pub struct IdentitySubscription {
    rx: watch::Receiver<ResourceState<LoadOutcome>>,
}

impl IdentitySubscription {
    /// Wait for the next update. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<IdentitySnapshot> {
        self.rx.changed().await.ok()?;
        Some(IdentitySnapshot::from_state(&self.rx.borrow_and_update()))
    }

    #[must_use]
    pub fn current(&self) -> IdentitySnapshot {
        IdentitySnapshot::from_state(&self.rx.borrow())
    }
}

// =============================================================================
// SESSION EPOCH
// =============================================================================

#[derive(Default)]
struct SessionEpoch {
    current: AtomicU64,
    commit: tokio::sync::Mutex<()>,
}

impl SessionEpoch {
    fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Run `action` under the commit lock; advance the epoch if `changed` says the session moved.
    async fn change<T>(&self, action: impl Future<Output = T>, changed: impl FnOnce(&T) -> bool) -> T {
        let _commit = self.commit.lock().await;
        let result = action.await;
        if changed(&result) {
            self.current.fetch_add(1, Ordering::AcqRel);
        }
        result
    }
}

// =============================================================================
// LOAD CYCLE
// =============================================================================

struct Loader {
    provider: Arc<dyn IdentityProvider>,
    resolver: Arc<IdentityResolver>,
    cache: UserCache,
    epoch: Arc<SessionEpoch>,
}

impl Loader {
    async fn load(&self) -> LoadOutcome {
        let epoch = self.epoch.current();
        let principal = match self.provider.get_current_principal().await {
            Ok(principal) => principal,
            Err(e) => {
                if e.is_unauthorized() {
                    tracing::debug!("no active session");
                } else {
                    tracing::warn!(error = %e, "principal fetch failed");
                }
                return match self.cache.read().await {
                    Some(cached) => {
                        tracing::warn!(user_id = %cached.id, "serving cached user");
                        LoadOutcome::CachedFallback(cached)
                    }
                    None => LoadOutcome::Empty,
                };
            }
        };

        let avatar = self.provider.avatar_initials_url(principal.avatar_name());
        match self.resolver.resolve(&principal).await {
            Ok(resolution) => {
                let user = User::from_resolution(principal, avatar, resolution);
                self.commit(epoch, &user).await;
                tracing::info!(user_id = %user.id, user_type = ?user.user_type, "identity resolved");
                LoadOutcome::Resolved(user)
            }
            Err(e) => {
                tracing::warn!(user_id = %principal.id, error = %e, "profile resolution failed");
                match self.cache.read().await {
                    Some(cached) if cached.id == principal.id => LoadOutcome::CachedFallback(cached),
                    _ => LoadOutcome::Resolved(User::unresolved(principal, avatar)),
                }
            }
        }
    }

    /// Persist `user` unless the session changed since the cycle started.
    async fn commit(&self, started: u64, user: &User) {
        let _commit = self.epoch.commit.lock().await;
        if self.epoch.current() != started {
            tracing::debug!(user_id = %user.id, "session changed during load; not caching");
            return;
        }
        self.cache.persist(user).await;
    }
}

// =============================================================================
// STORE
// =============================================================================

struct StoreInner {
    resource: AsyncResource<(), LoadOutcome, Infallible>,
    session: SessionClient,
    resolver: Arc<IdentityResolver>,
    cache: UserCache,
    epoch: Arc<SessionEpoch>,
}

#[derive(Clone)]
pub struct IdentityStore {
    inner: Arc<StoreInner>,
}

impl IdentityStore {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        browser: Arc<dyn AuthBrowser>,
        cache: UserCache,
        collections: CollectionIds,
        redirect_uri: impl Into<String>,
    ) -> Self {
        let resolver = Arc::new(IdentityResolver::new(Arc::clone(&provider), collections));
        let epoch = Arc::new(SessionEpoch::default());
        let loader = Arc::new(Loader {
            provider: Arc::clone(&provider),
            resolver: Arc::clone(&resolver),
            cache: cache.clone(),
            epoch: Arc::clone(&epoch),
        });
        let fetcher: Fetcher<(), LoadOutcome, Infallible> = Arc::new(move |()| {
            let loader = Arc::clone(&loader);
            async move { Ok(loader.load().await) }.boxed()
        });

        Self {
            inner: Arc::new(StoreInner {
                resource: AsyncResource::new((), fetcher),
                session: SessionClient::new(provider, browser, cache.clone(), redirect_uri),
                resolver,
                cache,
                epoch,
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> IdentitySnapshot {
        IdentitySnapshot::from_state(&self.inner.resource.state())
    }

    #[must_use]
    pub fn subscribe(&self) -> IdentitySubscription {
        IdentitySubscription { rx: self.inner.resource.subscribe() }
    }

    /// Run one load cycle; calls overlapping an in-flight cycle join it.
    pub async fn refetch(&self) -> IdentitySnapshot {
        self.inner.resource.refetch().await;
        self.snapshot()
    }

    /// Load cycle after a session change; an older in-flight cycle saw the
    /// previous session and is superseded rather than joined.
    async fn reload(&self) -> IdentitySnapshot {
        self.inner.resource.restart().await;
        self.snapshot()
    }

    /// Start the first load cycle in the background.
    pub fn spawn_initial_load(&self) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            store.refetch().await;
        })
    }

    /// Password login followed by a fresh resolution.
    ///
    /// # Errors
    ///
    /// Propagates the [`LoginError`] from the session client; the store is
    /// not refetched in that case.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<IdentitySnapshot, LoginError> {
        self.inner
            .epoch
            .change(self.inner.session.login_with_password(email, password), Result::is_ok)
            .await?;
        Ok(self.reload().await)
    }

    /// OAuth login followed by a fresh resolution.
    ///
    /// # Errors
    ///
    /// Propagates the [`OAuthError`] from the session client; the store is
    /// not refetched in that case.
    pub async fn sign_in_with_oauth_session(&self, provider: OAuthProvider) -> Result<IdentitySnapshot, OAuthError> {
        self.inner
            .epoch
            .change(self.inner.session.login_with_oauth_session(provider), Result::is_ok)
            .await?;
        Ok(self.reload().await)
    }

    /// `bool` form of [`Self::sign_in_with_oauth_session`]; `false` leaves the store untouched.
    pub async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> bool {
        match self.sign_in_with_oauth_session(provider).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(provider = provider.slug(), error = %e, "oauth login failed");
                false
            }
        }
    }

    /// Logout followed by a reload, which then resolves to no user.
    pub async fn sign_out(&self) -> bool {
        let logged_out = self
            .inner
            .epoch
            .change(self.inner.session.logout(), |ok| *ok)
            .await;
        if !logged_out {
            return false;
        }
        self.reload().await;
        true
    }

    #[must_use]
    pub fn session(&self) -> &SessionClient {
        &self.inner.session
    }

    #[must_use]
    pub fn resolver(&self) -> &IdentityResolver {
        &self.inner.resolver
    }

    #[must_use]
    pub fn cache(&self) -> &UserCache {
        &self.inner.cache
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
