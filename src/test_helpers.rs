//! In-memory provider, scripted browser, and fixtures shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use url::Url;

use crate::cache::UserCache;
use crate::config::CollectionIds;
use crate::model::{ApplicantProfile, Principal, ProfileDocument, RecruiterProfile, Session, User};
use crate::provider::{DocumentList, IdentityProvider, OAuthProvider, ProviderError, Query};
use crate::session::{AuthBrowser, BrowserOutcome};
use crate::storage::MemoryStorage;
use crate::store::IdentityStore;

pub const DATABASE: &str = "db";
pub const APPLICANTS: &str = "applicants";
pub const RECRUITERS: &str = "recruiters";
pub const REDIRECT_URI: &str = "findrr://";

// =============================================================================
// FIXTURES
// =============================================================================

pub fn collections() -> CollectionIds {
    CollectionIds {
        database_id: DATABASE.into(),
        applicant_collection_id: APPLICANTS.into(),
        recruiter_collection_id: RECRUITERS.into(),
    }
}

pub fn principal(id: &str) -> Principal {
    Principal { id: id.into(), name: format!("User {id}"), email: format!("{id}@example.com") }
}

pub fn applicant_doc(user_id: &str) -> ProfileDocument {
    ProfileDocument::Applicant(ApplicantProfile {
        document_id: format!("doc-{user_id}"),
        user_id: user_id.into(),
        email: format!("{user_id}@example.com"),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        ..ApplicantProfile::default()
    })
}

pub fn recruiter_doc(user_id: &str) -> ProfileDocument {
    ProfileDocument::Recruiter(RecruiterProfile {
        document_id: format!("doc-{user_id}"),
        user_id: user_id.into(),
        email: format!("{user_id}@example.com"),
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        company_name: "Findrr".into(),
        ..RecruiterProfile::default()
    })
}

/// Raw document JSON as the provider would list it.
pub fn raw_doc(doc: &ProfileDocument) -> serde_json::Value {
    match doc {
        ProfileDocument::Applicant(p) => serde_json::to_value(p).unwrap(),
        ProfileDocument::Recruiter(p) => serde_json::to_value(p).unwrap(),
    }
}

pub fn recruiter_user(id: &str) -> User {
    User {
        id: id.into(),
        name: format!("User {id}"),
        email: format!("{id}@example.com"),
        avatar: Some(avatar_url(&format!("User {id}"))),
        user_type: Some(crate::model::UserType::Recruiter),
        profile: Some(recruiter_doc(id)),
    }
}

pub fn avatar_url(name: &str) -> String {
    format!("https://avatars.test/initials?name={name}")
}

// =============================================================================
// MOCK PROVIDER
// =============================================================================

#[derive(Default)]
pub struct MockState {
    /// Principal behind the current session; `None` is guest scope.
    pub principal: Option<Principal>,
    /// Every `get_current_principal` fails with a transport error.
    pub offline: bool,
    /// `(email, password, principal)` accepted by password login.
    pub accounts: Vec<(String, String, Principal)>,
    /// `(userId, secret, principal)` accepted by the OAuth exchange.
    pub oauth_grants: Vec<(String, String, Principal)>,
    pub applicants: Vec<serde_json::Value>,
    pub recruiters: Vec<serde_json::Value>,
    /// Collection id whose listing fails.
    pub failing_collection: Option<String>,
    pub delete_fails: bool,
    /// Every call, in order: method name, or `list:{collection}` for listings.
    pub calls: Vec<String>,
}

#[derive(Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with(&self, f: impl FnOnce(&mut MockState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn signed_in(&self, p: Principal) {
        self.with(|s| s.principal = Some(p));
    }

    pub fn add_applicant(&self, user_id: &str) {
        self.with(|s| s.applicants.push(raw_doc(&applicant_doc(user_id))));
    }

    pub fn add_recruiter(&self, user_id: &str) {
        self.with(|s| s.recruiters.push(raw_doc(&recruiter_doc(user_id))));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn session_for(p: &Principal, provider: &str) -> Session {
        Session {
            id: format!("session-{}", p.id),
            user_id: p.id.clone(),
            expire: "2099-01-01T00:00:00.000+00:00".into(),
            provider: provider.into(),
        }
    }
}

fn unauthorized(kind: &str) -> ProviderError {
    ProviderError::Api { code: 401, kind: kind.into(), message: "unauthorized".into() }
}

#[async_trait::async_trait]
impl IdentityProvider for MockProvider {
    async fn get_current_principal(&self) -> Result<Principal, ProviderError> {
        self.record("get_current_principal".into());
        tokio::task::yield_now().await;
        let state = self.state.lock().unwrap();
        if state.offline {
            return Err(ProviderError::Transport("network unreachable".into()));
        }
        state
            .principal
            .clone()
            .ok_or_else(|| unauthorized("general_unauthorized_scope"))
    }

    async fn create_email_password_session(&self, email: &str, password: &str) -> Result<Session, ProviderError> {
        self.record("create_email_password_session".into());
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let Some((_, expected, p)) = state.accounts.iter().find(|(e, _, _)| e == email).cloned() else {
            return Err(ProviderError::Api {
                code: 404,
                kind: "user_not_found".into(),
                message: "User not found".into(),
            });
        };
        if expected != password {
            return Err(unauthorized("user_invalid_credentials"));
        }
        let session = Self::session_for(&p, "email");
        state.principal = Some(p);
        Ok(session)
    }

    async fn create_oauth2_token(
        &self,
        provider: OAuthProvider,
        success_uri: &str,
        _failure_uri: &str,
    ) -> Result<Url, ProviderError> {
        self.record("create_oauth2_token".into());
        tokio::task::yield_now().await;
        let mut url = Url::parse("https://provider.test/oauth2")
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider.slug())
            .append_pair("success", success_uri);
        Ok(url)
    }

    async fn create_session(&self, user_id: &str, secret: &str) -> Result<Session, ProviderError> {
        self.record("create_session".into());
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let Some((_, _, p)) = state
            .oauth_grants
            .iter()
            .find(|(u, s, _)| u == user_id && s == secret)
            .cloned()
        else {
            return Err(unauthorized("user_invalid_token"));
        };
        let session = Self::session_for(&p, "oauth2");
        state.principal = Some(p);
        Ok(session)
    }

    async fn delete_session(&self, _session_id: &str) -> Result<(), ProviderError> {
        self.record("delete_session".into());
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        if state.delete_fails {
            return Err(ProviderError::Transport("network unreachable".into()));
        }
        if state.principal.take().is_none() {
            return Err(unauthorized("general_unauthorized_scope"));
        }
        Ok(())
    }

    async fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList, ProviderError> {
        self.record(format!("list:{collection_id}"));
        tokio::task::yield_now().await;
        let state = self.state.lock().unwrap();
        if database_id != DATABASE {
            return Err(ProviderError::Api { code: 404, kind: "database_not_found".into(), message: database_id.into() });
        }
        if state.failing_collection.as_deref() == Some(collection_id) {
            return Err(ProviderError::Transport("connection reset".into()));
        }
        let pool = match collection_id {
            APPLICANTS => &state.applicants,
            RECRUITERS => &state.recruiters,
            other => {
                return Err(ProviderError::Api { code: 404, kind: "collection_not_found".into(), message: other.into() });
            }
        };

        let mut limit = usize::MAX;
        let mut filters = Vec::new();
        for q in queries {
            match q {
                Query::Equal { attribute, value } => filters.push((attribute.as_str(), value)),
                Query::Limit(n) => limit = *n as usize,
            }
        }
        let documents: Vec<serde_json::Value> = pool
            .iter()
            .filter(|doc| filters.iter().all(|(attr, value)| doc.get(*attr) == Some(*value)))
            .take(limit)
            .cloned()
            .collect();
        Ok(DocumentList { total: documents.len() as u64, documents })
    }

    fn avatar_initials_url(&self, name: &str) -> Option<String> {
        Some(avatar_url(name))
    }
}

// =============================================================================
// MOCK BROWSER
// =============================================================================

/// Replays scripted outcomes, one per `open_auth_session`; `Cancelled` once exhausted.
#[derive(Default)]
pub struct MockBrowser {
    outcomes: Mutex<VecDeque<BrowserOutcome>>,
    opened: Mutex<Vec<String>>,
}

impl MockBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, outcome: BrowserOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn redirect_to(&self, url: &str) {
        self.push(BrowserOutcome::Success { url: url.into() });
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AuthBrowser for MockBrowser {
    async fn open_auth_session(&self, auth_url: &Url, _redirect_uri: &str) -> BrowserOutcome {
        self.opened.lock().unwrap().push(auth_url.to_string());
        tokio::task::yield_now().await;
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(BrowserOutcome::Cancelled)
    }
}

// =============================================================================
// ASSEMBLY
// =============================================================================

pub struct Harness {
    pub provider: Arc<MockProvider>,
    pub browser: Arc<MockBrowser>,
    pub storage: Arc<MemoryStorage>,
    pub cache: UserCache,
}

impl Harness {
    pub fn new() -> Self {
        let storage = Arc::new(MemoryStorage::new());
        Self {
            provider: MockProvider::new(),
            browser: MockBrowser::new(),
            cache: UserCache::new(storage.clone()),
            storage,
        }
    }

    pub fn session_client(&self) -> crate::session::SessionClient {
        crate::session::SessionClient::new(
            self.provider.clone(),
            self.browser.clone(),
            self.cache.clone(),
            REDIRECT_URI,
        )
    }

    pub fn store(&self) -> IdentityStore {
        IdentityStore::new(self.provider.clone(), self.browser.clone(), self.cache.clone(), collections(), REDIRECT_URI)
    }
}
