//! Identity data model: principal, session, profile documents, resolved user.
//!
//! DESIGN
//! ======
//! Field names mirror the provider's JSON (`$id`, camelCase attributes) so a
//! resolved `User` serializes to the same shape the mobile client cached
//! under the `"user"` key. The profile is a tagged variant keyed by the
//! `userType` attribute each profile document already carries.

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// PRINCIPAL / SESSION
// =============================================================================

/// The identity provider's bare authenticated account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Principal {
    /// Name used for the initials avatar: display name, then email, then `"U"`.
    #[must_use]
    pub fn avatar_name(&self) -> &str {
        if !self.name.trim().is_empty() {
            &self.name
        } else if !self.email.trim().is_empty() {
            &self.email
        } else {
            "U"
        }
    }
}

/// Opaque provider-issued authentication handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub expire: String,
    #[serde(default)]
    pub provider: String,
}

// =============================================================================
// PROFILE DOCUMENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Applicant,
    Recruiter,
}

impl UserType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applicant => "applicant",
            Self::Recruiter => "recruiter",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job-seeker profile document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplicantProfile {
    #[serde(rename = "$id")]
    pub document_id: String,
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub avatar: Option<String>,
    pub location: String,
    pub resume: String,
    pub application_count: u32,
    pub interview_count: u32,
    pub profile_complete_count: u32,
    pub saved_jobs_count: u32,
    pub created_at: String,
}

/// Hiring-side profile document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecruiterProfile {
    #[serde(rename = "$id")]
    pub document_id: String,
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub company_name: String,
    pub company_website: String,
    pub created_at: String,
}

/// The kind-specific record associated 1:1 with a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "userType", rename_all = "lowercase")]
pub enum ProfileDocument {
    Applicant(ApplicantProfile),
    Recruiter(RecruiterProfile),
}

impl ProfileDocument {
    #[must_use]
    pub fn kind(&self) -> UserType {
        match self {
            Self::Applicant(_) => UserType::Applicant,
            Self::Recruiter(_) => UserType::Recruiter,
        }
    }

    /// Foreign key back to the owning principal.
    #[must_use]
    pub fn user_id(&self) -> &str {
        match self {
            Self::Applicant(doc) => &doc.user_id,
            Self::Recruiter(doc) => &doc.user_id,
        }
    }

    #[must_use]
    pub fn document_id(&self) -> &str {
        match self {
            Self::Applicant(doc) => &doc.document_id,
            Self::Recruiter(doc) => &doc.document_id,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        let (first, last) = match self {
            Self::Applicant(doc) => (&doc.first_name, &doc.last_name),
            Self::Recruiter(doc) => (&doc.first_name, &doc.last_name),
        };
        format!("{first} {last}").trim().to_string()
    }
}

// =============================================================================
// RESOLUTION / USER
// =============================================================================

/// Outcome of looking a principal up in both profile collections.
///
/// Built only from an optional profile, so `user_type` can never disagree
/// with the profile variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    profile: Option<ProfileDocument>,
}

impl Resolution {
    #[must_use]
    pub fn found(profile: ProfileDocument) -> Self {
        Self { profile: Some(profile) }
    }

    /// No profile document in either collection.
    #[must_use]
    pub fn empty() -> Self {
        Self { profile: None }
    }

    #[must_use]
    pub fn user_type(&self) -> Option<UserType> {
        self.profile.as_ref().map(ProfileDocument::kind)
    }

    #[must_use]
    pub fn profile(&self) -> Option<&ProfileDocument> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn into_profile(self) -> Option<ProfileDocument> {
        self.profile
    }
}

/// The resolved entity the rest of the application consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub profile: Option<ProfileDocument>,
}

impl User {
    #[must_use]
    pub fn from_resolution(principal: Principal, avatar: Option<String>, resolution: Resolution) -> Self {
        Self {
            id: principal.id,
            name: principal.name,
            email: principal.email,
            avatar,
            user_type: resolution.user_type(),
            profile: resolution.into_profile(),
        }
    }

    /// Authenticated principal whose profile kind is unknown.
    #[must_use]
    pub fn unresolved(principal: Principal, avatar: Option<String>) -> Self {
        Self::from_resolution(principal, avatar, Resolution::empty())
    }

    /// True for a signed-in principal with no profile document (e.g. mid sign-up).
    #[must_use]
    pub fn needs_profile(&self) -> bool {
        self.profile.is_none()
    }

    /// `user_type` is set exactly when a profile of that kind is attached.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match (self.user_type, &self.profile) {
            (None, None) => true,
            (Some(kind), Some(profile)) => kind == profile.kind(),
            _ => false,
        }
    }

    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal { id: self.id.clone(), name: self.name.clone(), email: self.email.clone() }
    }
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
