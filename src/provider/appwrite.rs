//! Appwrite REST client implementing [`IdentityProvider`].
//!
//! Thin HTTP wrapper over the account, database, and avatar endpoints. Pure
//! parsing in `parse_body`/`parse_error` for testability.
//!
//! SESSION COOKIES
//! ===============
//! Native clients cannot rely on a cookie jar, so the provider mirrors the
//! session cookie in an `X-Fallback-Cookies` response header. The client
//! echoes the last value back on every request and, when a cookie store is
//! attached, persists it under the SDK-owned `cookieFallback` key. This is
//! provider plumbing; the identity subsystem itself never holds a session.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use super::{DocumentList, IdentityProvider, OAuthProvider, ProviderError, Query};
use crate::config::IdentityConfig;
use crate::model::{Principal, Session};
use crate::storage::KeyValueStorage;

const FALLBACK_COOKIES_HEADER: &str = "X-Fallback-Cookies";
const COOKIE_FALLBACK_KEY: &str = "cookieFallback";
const RESPONSE_FORMAT: &str = "1.5.0";
const PLATFORM_OS: &str = "android";

// =============================================================================
// CLIENT
// =============================================================================

pub struct AppwriteClient {
    http: reqwest::Client,
    base: Url,
    project_id: String,
    platform: String,
    cookies: RwLock<Option<String>>,
    cookie_store: Option<Arc<dyn KeyValueStorage>>,
}

impl AppwriteClient {
    /// Build a client from the identity config.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a URL or the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, ProviderError> {
        let base = Url::parse(&config.endpoint).map_err(|e| ProviderError::HttpClientBuild(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ProviderError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base,
            project_id: config.project_id.clone(),
            platform: config.platform.clone(),
            cookies: RwLock::new(None),
            cookie_store: None,
        })
    }

    /// Persist the provider session cookie across process restarts.
    #[must_use]
    pub fn with_cookie_store(mut self, store: Arc<dyn KeyValueStorage>) -> Self {
        self.cookie_store = Some(store);
        self
    }

    /// Load a previously persisted session cookie, if any.
    pub async fn restore_session_cookies(&self) {
        let Some(store) = &self.cookie_store else {
            return;
        };
        match store.get_item(COOKIE_FALLBACK_KEY).await {
            Ok(value) => self.set_cookies(value),
            Err(e) => tracing::warn!(error = %e, "failed to restore provider session cookie"),
        }
    }

    fn cookies(&self) -> Option<String> {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_cookies(&self, value: Option<String>) {
        *self
            .cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    async fn remember_cookies(&self, value: String) {
        self.set_cookies(Some(value.clone()));
        if let Some(store) = &self.cookie_store {
            if let Err(e) = store.set_item(COOKIE_FALLBACK_KEY, &value).await {
                tracing::warn!(error = %e, "failed to persist provider session cookie");
            }
        }
    }

    async fn forget_cookies(&self) {
        self.set_cookies(None);
        if let Some(store) = &self.cookie_store {
            if let Err(e) = store.remove_item(COOKIE_FALLBACK_KEY).await {
                tracing::warn!(error = %e, "failed to remove provider session cookie");
            }
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderError::HttpClientBuild(format!("endpoint cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request with project headers; returns `(status, body)`.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<(u16, String), ProviderError> {
        let mut request = self
            .http
            .request(method, url)
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Response-Format", RESPONSE_FORMAT)
            .header("Origin", format!("appwrite-{PLATFORM_OS}://{}", self.platform));
        if let Some(cookies) = self.cookies() {
            request = request.header(FALLBACK_COOKIES_HEADER, cookies);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let fallback = response
            .headers()
            .get(FALLBACK_COOKIES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if let Some(cookies) = fallback.filter(|c| !c.is_empty()) {
            self.remember_cookies(cookies).await;
        }
        Ok((status, text))
    }

    /// OAuth authorization URL. Built locally, the provider answers it with a redirect.
    fn oauth2_token_url(&self, provider: OAuthProvider, success_uri: &str, failure_uri: &str) -> Result<Url, ProviderError> {
        let mut url = self.url(&["account", "tokens", "oauth2", provider.slug()])?;
        url.query_pairs_mut()
            .append_pair("project", &self.project_id)
            .append_pair("success", success_uri)
            .append_pair("failure", failure_uri);
        Ok(url)
    }

    fn documents_url(&self, database_id: &str, collection_id: &str, queries: &[Query]) -> Result<Url, ProviderError> {
        let mut url = self.url(&["databases", database_id, "collections", collection_id, "documents"])?;
        if !queries.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for query in queries {
                pairs.append_pair("queries[]", &query.to_query_string());
            }
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for AppwriteClient {
    async fn get_current_principal(&self) -> Result<Principal, ProviderError> {
        let (status, body) = self.send(Method::GET, self.url(&["account"])?, None).await?;
        parse_body(status, &body)
    }

    async fn create_email_password_session(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        let payload = serde_json::json!({ "email": email, "password": password });
        let (status, body) = self
            .send(Method::POST, self.url(&["account", "sessions", "email"])?, Some(payload))
            .await?;
        parse_body(status, &body)
    }

    async fn create_oauth2_token(
        &self,
        provider: OAuthProvider,
        success_uri: &str,
        failure_uri: &str,
    ) -> Result<Url, ProviderError> {
        self.oauth2_token_url(provider, success_uri, failure_uri)
    }

    async fn create_session(&self, user_id: &str, secret: &str) -> Result<Session, ProviderError> {
        let payload = serde_json::json!({ "userId": user_id, "secret": secret });
        let (status, body) = self
            .send(Method::POST, self.url(&["account", "sessions", "token"])?, Some(payload))
            .await?;
        parse_body(status, &body)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ProviderError> {
        let (status, body) = self
            .send(Method::DELETE, self.url(&["account", "sessions", session_id])?, None)
            .await?;
        check_status(status, &body)?;
        self.forget_cookies().await;
        Ok(())
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList, ProviderError> {
        let url = self.documents_url(database_id, collection_id, queries)?;
        let (status, body) = self.send(Method::GET, url, None).await?;
        parse_body(status, &body)
    }

    fn avatar_initials_url(&self, name: &str) -> Option<String> {
        let mut url = self.url(&["avatars", "initials"]).ok()?;
        url.query_pairs_mut()
            .append_pair("name", name)
            .append_pair("project", &self.project_id);
        Some(url.to_string())
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(serde::Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default, rename = "type")]
    kind: String,
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn parse_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ProviderError> {
    if !is_success(status) {
        return Err(parse_error(status, body));
    }
    serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))
}

fn check_status(status: u16, body: &str) -> Result<(), ProviderError> {
    if is_success(status) { Ok(()) } else { Err(parse_error(status, body)) }
}

fn parse_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(err) => ProviderError::Api { code: err.code.unwrap_or(status), kind: err.kind, message: err.message },
        Err(_) => ProviderError::Api { code: status, kind: String::new(), message: body.to_string() },
    }
}

#[cfg(test)]
#[path = "appwrite_test.rs"]
mod tests;
