// tests/login.rs
//
// Session login flow and credential configuration checks.
//
mod common;

use ao_scrape::error::Error;
use ao_scrape::net::ArchiveClient;
use common::{test_config, Canned, ScriptedTransport};

fn config_with_credentials(user: Option<&str>, pass: Option<&str>) -> ao_scrape::ClientConfig {
    let mut config = test_config();
    config.username = user.map(str::to_string);
    config.password = pass.map(str::to_string);
    config
}

#[test]
fn login_succeeds_when_redirected_to_the_profile() {
    let (transport, log) = ScriptedTransport::new();
    let transport = transport
        .route("/token_dispenser.json", Canned::body(r#"{"token":"t-123"}"#))
        .route(
            "/users/login",
            Canned::redirect("<html></html>", "https://example.org/users/alice"),
        );

    let client =
        ArchiveClient::with_transport(config_with_credentials(Some("alice"), Some("s3cret")), Box::new(transport));
    assert!(client.is_ok());
    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert!(log[0].starts_with("GET ") && log[0].ends_with("/token_dispenser.json"));
    assert!(log[1].starts_with("POST ") && log[1].ends_with("/users/login"));
}

#[test]
fn bad_credentials_report_the_flash_alert() {
    let (transport, _log) = ScriptedTransport::new();
    let transport = transport
        .route("/token_dispenser.json", Canned::body(r#"{"token":"t-123"}"#))
        .route(
            "/users/login",
            Canned::redirect(
                r#"<div class="flash alert">The password or user name you entered doesn't match our records.</div>"#,
                "https://example.org/users/login",
            ),
        );

    match ArchiveClient::with_transport(config_with_credentials(Some("alice"), Some("wrong")), Box::new(transport)) {
        Err(Error::Auth(reason)) => assert!(reason.contains("doesn't match our records")),
        Err(other) => panic!("expected Auth error, got {other:?}"),
        Ok(_) => panic!("expected Auth error, got a client"),
    }
}

#[test]
fn auth_error_page_reports_its_reason() {
    let (transport, _log) = ScriptedTransport::new();
    let transport = transport
        .route("/token_dispenser.json", Canned::body(r#"{"token":"t-123"}"#))
        .route(
            "/users/login",
            Canned::redirect(
                r#"<div class="error-auth_error"><p>Your session expired.</p></div>"#,
                "https://example.org/auth_error",
            ),
        );

    match ArchiveClient::with_transport(config_with_credentials(Some("alice"), Some("s3cret")), Box::new(transport)) {
        Err(Error::Auth(reason)) => assert!(reason.contains("Your session expired")),
        Err(other) => panic!("expected Auth error, got {other:?}"),
        Ok(_) => panic!("expected Auth error, got a client"),
    }
}

#[test]
fn lone_credential_is_rejected_eagerly() {
    for (user, pass) in [(Some("alice"), None), (None, Some("s3cret"))] {
        let (transport, log) = ScriptedTransport::new();
        match ArchiveClient::with_transport(config_with_credentials(user, pass), Box::new(transport)) {
            Err(Error::Config(_)) => {}
            Err(other) => panic!("expected Config error, got {other:?}"),
            Ok(_) => panic!("expected Config error, got a client"),
        }
        assert_eq!(log.borrow().len(), 0, "no request before validation");
    }
}
