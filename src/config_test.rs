use super::*;

use std::sync::{Mutex, MutexGuard, PoisonError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn env_guard() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// # Safety
/// Callers must hold `ENV_LOCK`.
unsafe fn clear_identity_env() {
    unsafe {
        std::env::remove_var("APPWRITE_ENDPOINT");
        std::env::remove_var("APPWRITE_PROJECT_ID");
        std::env::remove_var("APPWRITE_DATABASE_ID");
        std::env::remove_var("APPWRITE_APPLICANT_COLLECTION_ID");
        std::env::remove_var("APPWRITE_RECRUITER_COLLECTION_ID");
        std::env::remove_var("APPWRITE_PLATFORM");
        std::env::remove_var("FINDRR_REDIRECT_SCHEME");
        std::env::remove_var("FINDRR_CACHE_DIR");
        std::env::remove_var("FINDRR_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("FINDRR_CONNECT_TIMEOUT_SECS");
    }
}

/// # Safety
/// Callers must hold `ENV_LOCK`.
unsafe fn set_required_env() {
    unsafe {
        std::env::set_var("APPWRITE_ENDPOINT", "https://cloud.appwrite.io/v1/");
        std::env::set_var("APPWRITE_PROJECT_ID", "proj");
        std::env::set_var("APPWRITE_DATABASE_ID", "db");
        std::env::set_var("APPWRITE_APPLICANT_COLLECTION_ID", "applicants");
        std::env::set_var("APPWRITE_RECRUITER_COLLECTION_ID", "recruiters");
    }
}

#[test]
fn from_env_applies_defaults() {
    let _guard = env_guard();
    unsafe {
        clear_identity_env();
        set_required_env();
    }

    let cfg = IdentityConfig::from_env().unwrap();
    assert_eq!(cfg.endpoint, "https://cloud.appwrite.io/v1");
    assert_eq!(cfg.project_id, "proj");
    assert_eq!(cfg.platform, DEFAULT_PLATFORM);
    assert_eq!(cfg.redirect_scheme, DEFAULT_REDIRECT_SCHEME);
    assert_eq!(cfg.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
    assert_eq!(
        cfg.timeouts,
        Timeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
    assert_eq!(
        cfg.collections,
        CollectionIds {
            database_id: "db".into(),
            applicant_collection_id: "applicants".into(),
            recruiter_collection_id: "recruiters".into(),
        }
    );

    unsafe { clear_identity_env() };
}

#[test]
fn from_env_parses_overrides() {
    let _guard = env_guard();
    unsafe {
        clear_identity_env();
        set_required_env();
        std::env::set_var("APPWRITE_PLATFORM", "com.example.app");
        std::env::set_var("FINDRR_REDIRECT_SCHEME", "exampleapp");
        std::env::set_var("FINDRR_CACHE_DIR", "/tmp/findrr-test");
        std::env::set_var("FINDRR_REQUEST_TIMEOUT_SECS", "5");
        std::env::set_var("FINDRR_CONNECT_TIMEOUT_SECS", "notanumber");
    }

    let cfg = IdentityConfig::from_env().unwrap();
    assert_eq!(cfg.platform, "com.example.app");
    assert_eq!(cfg.redirect_uri(), "exampleapp://");
    assert_eq!(cfg.cache_dir, PathBuf::from("/tmp/findrr-test"));
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 5, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS });

    unsafe { clear_identity_env() };
}

#[test]
fn from_env_missing_collection_errors() {
    let _guard = env_guard();
    unsafe {
        clear_identity_env();
        set_required_env();
        std::env::remove_var("APPWRITE_RECRUITER_COLLECTION_ID");
    }

    let err = IdentityConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::MissingVar { ref var } if var == "APPWRITE_RECRUITER_COLLECTION_ID"));

    unsafe { clear_identity_env() };
}

#[test]
fn from_env_blank_value_counts_as_missing() {
    let _guard = env_guard();
    unsafe {
        clear_identity_env();
        set_required_env();
        std::env::set_var("APPWRITE_PROJECT_ID", "   ");
    }

    let err = IdentityConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("APPWRITE_PROJECT_ID"));

    unsafe { clear_identity_env() };
}

#[test]
fn from_env_rejects_non_url_endpoint() {
    let _guard = env_guard();
    unsafe {
        clear_identity_env();
        set_required_env();
        std::env::set_var("APPWRITE_ENDPOINT", "not a url");
    }

    let err = IdentityConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEndpoint(_)));

    unsafe { clear_identity_env() };
}
