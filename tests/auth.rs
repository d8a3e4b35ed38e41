use mcp_plugins::{config::AuthConfig, ApiKeyAuth};

#[test]
fn disabled_auth_allows_any() {
    let cfg = AuthConfig {
        enabled: false,
        allowed_keys: vec!["a".into()],
        header_name: "x".into(),
    };
    let auth = ApiKeyAuth::new(&cfg);
    assert!(!auth.is_enabled());
    assert!(auth.validate(None));
    assert!(auth.validate(Some("whatever")));
}

#[test]
fn enabled_auth_checks_keys() {
    let cfg = AuthConfig {
        enabled: true,
        allowed_keys: vec!["secret".into(), "other".into()],
        header_name: "X-Api-Key".into(),
    };
    let auth = ApiKeyAuth::new(&cfg);
    assert_eq!(auth.header_name(), "x-api-key");
    assert!(auth.validate(Some("secret")));
    assert!(auth.validate(Some("other")));
    assert!(!auth.validate(Some("secre")));
    assert!(!auth.validate(Some("")));
    assert!(!auth.validate(None));
}
