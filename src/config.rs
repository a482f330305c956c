//! Identity configuration parsed from environment variables.

use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_PLATFORM: &str = "com.biggie.findrr";
pub const DEFAULT_REDIRECT_SCHEME: &str = "findrr";
pub const DEFAULT_CACHE_DIR: &str = ".findrr";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Configuration identifiers addressing the two profile collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionIds {
    pub database_id: String,
    pub applicant_collection_id: String,
    pub recruiter_collection_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Provider API root, e.g. `https://cloud.appwrite.io/v1` (no trailing slash).
    pub endpoint: String,
    pub project_id: String,
    pub platform: String,
    pub collections: CollectionIds,
    /// Scheme of the app-scoped OAuth redirect URI (`<scheme>://`).
    pub redirect_scheme: String,
    pub cache_dir: PathBuf,
    pub timeouts: Timeouts,
}

impl IdentityConfig {
    /// Build typed identity config from environment variables.
    ///
    /// Required:
    /// - `APPWRITE_ENDPOINT`
    /// - `APPWRITE_PROJECT_ID`
    /// - `APPWRITE_DATABASE_ID`
    /// - `APPWRITE_APPLICANT_COLLECTION_ID`
    /// - `APPWRITE_RECRUITER_COLLECTION_ID`
    ///
    /// Optional:
    /// - `APPWRITE_PLATFORM`: default `com.biggie.findrr`
    /// - `FINDRR_REDIRECT_SCHEME`: default `findrr`
    /// - `FINDRR_CACHE_DIR`: default `.findrr`
    /// - `FINDRR_REQUEST_TIMEOUT_SECS`: default 30
    /// - `FINDRR_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the endpoint is not a URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = required("APPWRITE_ENDPOINT")?.trim_end_matches('/').to_string();
        url::Url::parse(&endpoint).map_err(|e| ConfigError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        let collections = CollectionIds {
            database_id: required("APPWRITE_DATABASE_ID")?,
            applicant_collection_id: required("APPWRITE_APPLICANT_COLLECTION_ID")?,
            recruiter_collection_id: required("APPWRITE_RECRUITER_COLLECTION_ID")?,
        };

        Ok(Self {
            endpoint,
            project_id: required("APPWRITE_PROJECT_ID")?,
            platform: std::env::var("APPWRITE_PLATFORM").unwrap_or_else(|_| DEFAULT_PLATFORM.to_string()),
            collections,
            redirect_scheme: std::env::var("FINDRR_REDIRECT_SCHEME")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_SCHEME.to_string()),
            cache_dir: std::env::var("FINDRR_CACHE_DIR")
                .map_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR), PathBuf::from),
            timeouts: Timeouts {
                request_secs: env_parse_u64("FINDRR_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse_u64("FINDRR_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
        })
    }

    /// App-scoped redirect URI handed to the OAuth provider.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}://", self.redirect_scheme)
    }
}

fn required(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingVar { var: var.to_string() }),
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
