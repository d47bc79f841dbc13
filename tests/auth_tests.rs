use stock_trader::auth;

#[test]
fn password_hash_verifies_original_only() {
    let hash = auth::hash_password("correct horse").unwrap();
    assert_ne!(hash, "correct horse");
    assert!(auth::verify_password(&hash, "correct horse"));
    assert!(!auth::verify_password(&hash, "wrong horse"));
}

#[test]
fn malformed_hash_never_verifies() {
    assert!(!auth::verify_password("not-a-phc-string", "anything"));
}

#[test]
fn hashes_are_salted() {
    let a = auth::hash_password("same password").unwrap();
    let b = auth::hash_password("same password").unwrap();
    assert_ne!(a, b);
}

#[test]
fn session_token_round_trips() {
    let token = auth::create_token(42, "test-secret").unwrap();
    assert_eq!(auth::verify_token(&token, "test-secret").unwrap(), 42);
}

#[test]
fn session_token_rejects_wrong_secret() {
    let token = auth::create_token(42, "test-secret").unwrap();
    assert!(auth::verify_token(&token, "other-secret").is_err());
}

#[test]
fn garbage_token_is_rejected() {
    assert!(auth::verify_token("definitely.not.a-jwt", "test-secret").is_err());
}
