use super::*;

#[test]
fn equal_query_encodes_provider_syntax() {
    let q = Query::equal("userId", "p1");
    let parsed: serde_json::Value = serde_json::from_str(&q.to_query_string()).unwrap();
    assert_eq!(parsed["method"], "equal");
    assert_eq!(parsed["attribute"], "userId");
    assert_eq!(parsed["values"], serde_json::json!(["p1"]));
}

#[test]
fn limit_query_has_no_attribute() {
    let parsed: serde_json::Value = serde_json::from_str(&Query::limit(1).to_query_string()).unwrap();
    assert_eq!(parsed["method"], "limit");
    assert_eq!(parsed["values"], serde_json::json!([1]));
    assert!(parsed.get("attribute").is_none());
}

#[test]
fn unauthorized_detection() {
    let err = ProviderError::Api { code: 401, kind: "general_unauthorized_scope".into(), message: String::new() };
    assert!(err.is_unauthorized());
    assert!(!ProviderError::Transport("offline".into()).is_unauthorized());
}

#[test]
fn oauth_provider_parses_case_insensitively() {
    assert_eq!("Google".parse::<OAuthProvider>(), Ok(OAuthProvider::Google));
    assert_eq!("github".parse::<OAuthProvider>(), Ok(OAuthProvider::Github));
    assert!("myspace".parse::<OAuthProvider>().is_err());
}

#[test]
fn oauth_provider_slug() {
    assert_eq!(OAuthProvider::Microsoft.slug(), "microsoft");
    assert_eq!(OAuthProvider::Apple.slug(), "apple");
}

#[test]
fn document_list_defaults_missing_fields() {
    let list: DocumentList = serde_json::from_str("{}").unwrap();
    assert_eq!(list.total, 0);
    assert!(list.documents.is_empty());
}
