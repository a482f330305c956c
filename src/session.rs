//! Session establishment and teardown against the identity provider.
//!
//! ARCHITECTURE
//! ============
//! Password login is a single session-creation call. OAuth login is a
//! redirect exchange: request an authorization URL scoped to the app's
//! redirect URI, hand it to an interactive browser session, pull `userId` and
//! `secret` off the returned redirect, and trade that pair for a session.
//! The session handle is returned to the caller and never retained here; the
//! provider stays the system of record for "current session".
//!
//! ERROR HANDLING
//! ==============
//! Login paths return typed errors. `logout` and `login_with_oauth` never
//! fail: they log the cause and report `false`.

use std::sync::Arc;

use url::Url;

use crate::cache::UserCache;
use crate::error::{LoginError, OAuthError};
use crate::model::Session;
use crate::provider::{IdentityProvider, OAuthProvider};

/// Session id the provider resolves to the active session.
pub const CURRENT_SESSION: &str = "current";

// =============================================================================
// BROWSER HAND-OFF
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserOutcome {
    /// The browser navigated to the redirect URI; `url` is the full redirect.
    Success { url: String },
    /// The user dismissed the browser sheet.
    Cancelled,
}

/// Interactive browser session used for the OAuth hand-off.
#[async_trait::async_trait]
pub trait AuthBrowser: Send + Sync {
    /// Open `auth_url` and suspend until the browser reaches `redirect_uri` or is dismissed.
    async fn open_auth_session(&self, auth_url: &Url, redirect_uri: &str) -> BrowserOutcome;
}

// =============================================================================
// SESSION CLIENT
// =============================================================================

pub struct SessionClient {
    provider: Arc<dyn IdentityProvider>,
    browser: Arc<dyn AuthBrowser>,
    cache: UserCache,
    redirect_uri: String,
}

impl SessionClient {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        browser: Arc<dyn AuthBrowser>,
        cache: UserCache,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self { provider, browser, cache, redirect_uri: redirect_uri.into() }
    }

    /// Create a session from email and password.
    ///
    /// # Errors
    ///
    /// `InvalidEmail`/`MissingPassword` before any remote call; otherwise the
    /// provider failure translated to `InvalidCredentials`, `AccountNotFound`,
    /// `RateLimited`, or `LoginFailed`.
    pub async fn login_with_password(&self, email: &str, password: &str) -> Result<Session, LoginError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(LoginError::InvalidEmail);
        }
        if password.is_empty() {
            return Err(LoginError::MissingPassword);
        }

        match self
            .provider
            .create_email_password_session(email, password)
            .await
        {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id, "password session created");
                Ok(session)
            }
            Err(e) => {
                let err = LoginError::from(e);
                tracing::warn!(error = %err, "password login failed");
                Err(err)
            }
        }
    }

    /// Run the OAuth redirect exchange; `true` once a session exists.
    ///
    /// Callers resolve the new principal next (the store's `refetch`).
    pub async fn login_with_oauth(&self, provider: OAuthProvider) -> bool {
        match self.login_with_oauth_session(provider).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(provider = provider.slug(), error = %e, "oauth login failed");
                false
            }
        }
    }

    /// Typed form of [`Self::login_with_oauth`].
    ///
    /// # Errors
    ///
    /// `Cancelled` if the browser sheet was dismissed; `ExchangeFailed` if the
    /// authorization URL could not be obtained, the redirect lacks `secret` or
    /// `userId`, or the provider rejects the pair.
    pub async fn login_with_oauth_session(&self, provider: OAuthProvider) -> Result<Session, OAuthError> {
        let auth_url = self
            .provider
            .create_oauth2_token(provider, &self.redirect_uri, &self.redirect_uri)
            .await
            .map_err(|e| OAuthError::ExchangeFailed(e.to_string()))?;

        let redirect = match self
            .browser
            .open_auth_session(&auth_url, &self.redirect_uri)
            .await
        {
            BrowserOutcome::Success { url } => url,
            BrowserOutcome::Cancelled => return Err(OAuthError::Cancelled),
        };

        let (user_id, secret) = parse_oauth_redirect(&redirect)?;
        let session = self
            .provider
            .create_session(&user_id, &secret)
            .await
            .map_err(|e| OAuthError::ExchangeFailed(e.to_string()))?;

        tracing::info!(user_id = %session.user_id, provider = provider.slug(), "oauth session created");
        Ok(session)
    }

    /// Delete the current session and clear the cached user.
    ///
    /// Any provider failure is logged and reported as `false`; the cache is
    /// left untouched in that case.
    pub async fn logout(&self) -> bool {
        match self.provider.delete_session(CURRENT_SESSION).await {
            Ok(()) => {
                self.cache.clear().await;
                tracing::info!("session deleted");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "logout failed");
                false
            }
        }
    }

    /// Whether the provider currently recognizes a principal.
    pub async fn is_authenticated(&self) -> bool {
        self.provider.get_current_principal().await.is_ok()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Syntactic email check: `local@domain.tld`, no whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

/// Extract `(userId, secret)` from the OAuth redirect URL.
///
/// # Errors
///
/// `ExchangeFailed` if the URL does not parse or either parameter is missing or empty.
pub fn parse_oauth_redirect(redirect: &str) -> Result<(String, String), OAuthError> {
    let url = Url::parse(redirect.trim())
        .map_err(|e| OAuthError::ExchangeFailed(format!("malformed redirect url: {e}")))?;

    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    };

    match (param("userId"), param("secret")) {
        (Some(user_id), Some(secret)) => Ok((user_id, secret)),
        _ => Err(OAuthError::ExchangeFailed("redirect missing secret or userId".into())),
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
