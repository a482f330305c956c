//! Error taxonomy for interactive actions and collaborator seams.
//!
//! DESIGN
//! ======
//! Interactive actions (password login, OAuth login) return typed failures
//! the calling screen turns into a message via `user_message()`. The passive
//! load path never surfaces these: it degrades to cache-or-null in `store`.
//! `CacheError` exists only so storage backends can report failure; the
//! user cache logs and swallows it.

use crate::provider::ProviderError;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing config: env var {var} not set")]
    MissingVar { var: String },
    #[error("invalid provider endpoint: {0}")]
    InvalidEndpoint(String),
}

// =============================================================================
// PASSWORD LOGIN
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password is required")]
    MissingPassword,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account not found")]
    AccountNotFound,
    #[error("rate limited")]
    RateLimited,
    #[error("login failed: {0}")]
    LoginFailed(String),
}

impl LoginError {
    /// Text shown to the user by the sign-in screen.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "Please enter a valid email address",
            Self::MissingPassword => "Please enter your password",
            Self::InvalidCredentials => "Invalid email or password",
            Self::AccountNotFound => "No account found with this email",
            Self::RateLimited => "Too many attempts. Please try again later",
            Self::LoginFailed(_) => "Login failed. Please try again.",
        }
    }
}

impl From<ProviderError> for LoginError {
    fn from(err: ProviderError) -> Self {
        if let ProviderError::Api { code, kind, message } = &err {
            match kind.as_str() {
                "user_invalid_credentials" => return Self::InvalidCredentials,
                "user_not_found" => return Self::AccountNotFound,
                "general_rate_limit_exceeded" => return Self::RateLimited,
                _ => {}
            }
            if *code == 429 {
                return Self::RateLimited;
            }
            let lowered = message.to_ascii_lowercase();
            if lowered.contains("invalid credentials") {
                return Self::InvalidCredentials;
            }
            if lowered.contains("user not found") {
                return Self::AccountNotFound;
            }
            if lowered.contains("rate limit") {
                return Self::RateLimited;
            }
        }
        Self::LoginFailed(err.to_string())
    }
}

// =============================================================================
// OAUTH LOGIN
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OAuthError {
    #[error("oauth login cancelled")]
    Cancelled,
    #[error("oauth exchange failed: {0}")]
    ExchangeFailed(String),
}

impl OAuthError {
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Cancelled => "Login cancelled",
            Self::ExchangeFailed(_) => "Login failed. Please try again.",
        }
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("profile lookup in {collection} failed: {reason}")]
    ProfileLookupFailed { collection: String, reason: String },
}

// =============================================================================
// CACHE STORAGE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache storage unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
