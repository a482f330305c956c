//! Identity & Document Store provider seam.
//!
//! DESIGN
//! ======
//! `IdentityProvider` is the only path to the remote backend. `appwrite`
//! implements it over REST; tests substitute an in-memory provider. The seam
//! exposes exactly the calls this subsystem makes: current principal, the
//! session create/delete family, OAuth token URL, and equality-filtered
//! document listing.

pub mod appwrite;

use serde::Deserialize;

use crate::model::{Principal, Session};

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("provider request failed: {0}")]
    Transport(String),

    /// The provider answered with a structured error body.
    #[error("provider returned {code} ({kind}): {message}")]
    Api { code: u16, kind: String, message: String },

    #[error("provider response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ProviderError {
    /// No active session (guest scope).
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { code: 401, .. })
    }
}

// =============================================================================
// QUERIES / DOCUMENTS
// =============================================================================

/// Document list filter in the provider's JSON query syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Equal { attribute: String, value: serde_json::Value },
    Limit(u32),
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::Equal { attribute: attribute.into(), value: value.into() }
    }

    #[must_use]
    pub fn limit(n: u32) -> Self {
        Self::Limit(n)
    }

    /// Encode as the string sent in `queries[]`.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let json = match self {
            Self::Equal { attribute, value } => serde_json::json!({
                "method": "equal",
                "attribute": attribute,
                "values": [value],
            }),
            Self::Limit(n) => serde_json::json!({ "method": "limit", "values": [n] }),
        };
        json.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocumentList {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub documents: Vec<serde_json::Value>,
}

// =============================================================================
// OAUTH PROVIDERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Apple,
    Github,
    Facebook,
    Microsoft,
}

impl OAuthProvider {
    /// Path segment used by the provider's OAuth endpoints.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Apple => "apple",
            Self::Github => "github",
            Self::Facebook => "facebook",
            Self::Microsoft => "microsoft",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "apple" => Ok(Self::Apple),
            "github" => Ok(Self::Github),
            "facebook" => Ok(Self::Facebook),
            "microsoft" => Ok(Self::Microsoft),
            other => Err(format!("unknown oauth provider: {other}")),
        }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Remote identity and document service.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The principal owning the current session.
    async fn get_current_principal(&self) -> Result<Principal, ProviderError>;

    async fn create_email_password_session(&self, email: &str, password: &str) -> Result<Session, ProviderError>;

    /// Authorization URL the interactive browser session should open.
    async fn create_oauth2_token(
        &self,
        provider: OAuthProvider,
        success_uri: &str,
        failure_uri: &str,
    ) -> Result<url::Url, ProviderError>;

    /// Exchange the `userId`/`secret` pair from the OAuth redirect for a session.
    async fn create_session(&self, user_id: &str, secret: &str) -> Result<Session, ProviderError>;

    /// Delete a session by id; `"current"` addresses the active one.
    async fn delete_session(&self, session_id: &str) -> Result<(), ProviderError>;

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList, ProviderError>;

    /// Initials avatar URL for a display name, if the provider serves one.
    fn avatar_initials_url(&self, name: &str) -> Option<String>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
