//! Principal → profile kind resolution.
//!
//! DESIGN
//! ======
//! Applicant and recruiter profiles live in separate collections keyed by
//! `userId`. The applicant collection is queried first; the recruiter
//! collection only when that answer is conclusively empty. The sequential,
//! short-circuiting order is what keeps "exactly one kind" true: there is no
//! lock, and the two queries must not be issued concurrently.
//!
//! A failed applicant query aborts with `ProfileLookupFailed` rather than
//! falling through, so a transient fault cannot classify an applicant as a
//! recruiter (or as profile-less).

use std::sync::Arc;

use crate::config::CollectionIds;
use crate::error::ResolveError;
use crate::model::{ApplicantProfile, Principal, ProfileDocument, RecruiterProfile, Resolution, UserType};
use crate::provider::{IdentityProvider, Query};

/// Profile attribute holding the owning principal's id.
const FOREIGN_KEY: &str = "userId";

pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    collections: CollectionIds,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, collections: CollectionIds) -> Self {
        Self { provider, collections }
    }

    /// Locate the principal's single profile document.
    ///
    /// At most two round-trips. No document in either collection is a valid
    /// (transient) state and yields [`Resolution::empty`].
    ///
    /// # Errors
    ///
    /// Returns `ProfileLookupFailed` if a query fails or a matching document
    /// cannot be decoded.
    pub async fn resolve(&self, principal: &Principal) -> Result<Resolution, ResolveError> {
        if let Some(profile) = self.lookup(UserType::Applicant, &principal.id).await? {
            tracing::debug!(user_id = %principal.id, "resolved as applicant");
            return Ok(Resolution::found(profile));
        }
        if let Some(profile) = self.lookup(UserType::Recruiter, &principal.id).await? {
            tracing::debug!(user_id = %principal.id, "resolved as recruiter");
            return Ok(Resolution::found(profile));
        }
        tracing::debug!(user_id = %principal.id, "no profile document in either collection");
        Ok(Resolution::empty())
    }

    /// Look up one collection when the caller already knows the kind.
    ///
    /// # Errors
    ///
    /// Returns `ProfileLookupFailed` if the query fails or the document is malformed.
    pub async fn fetch_profile(&self, user_id: &str, kind: UserType) -> Result<Option<ProfileDocument>, ResolveError> {
        self.lookup(kind, user_id).await
    }

    fn collection_id(&self, kind: UserType) -> &str {
        match kind {
            UserType::Applicant => &self.collections.applicant_collection_id,
            UserType::Recruiter => &self.collections.recruiter_collection_id,
        }
    }

    async fn lookup(&self, kind: UserType, user_id: &str) -> Result<Option<ProfileDocument>, ResolveError> {
        let collection = self.collection_id(kind);
        let failed = |reason: String| ResolveError::ProfileLookupFailed { collection: collection.to_string(), reason };

        let list = self
            .provider
            .list_documents(
                &self.collections.database_id,
                collection,
                &[Query::equal(FOREIGN_KEY, user_id), Query::limit(1)],
            )
            .await
            .map_err(|e| failed(e.to_string()))?;

        let Some(raw) = list.documents.into_iter().next() else {
            return Ok(None);
        };
        decode_profile(kind, raw)
            .map(Some)
            .map_err(|e| failed(format!("malformed {kind} document: {e}")))
    }
}

fn decode_profile(kind: UserType, raw: serde_json::Value) -> Result<ProfileDocument, serde_json::Error> {
    match kind {
        UserType::Applicant => serde_json::from_value::<ApplicantProfile>(raw).map(ProfileDocument::Applicant),
        UserType::Recruiter => serde_json::from_value::<RecruiterProfile>(raw).map(ProfileDocument::Recruiter),
    }
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
