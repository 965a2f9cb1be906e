#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::{bail, Result};
use portal_session::session::{
    ClientConfig, Credentials, FileStore, MemoryStore, SessionClient, SessionError, SessionEvent,
    SessionStore, SignupProfile, StoreKey,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::{net::TcpListener, path::PathBuf, sync::Arc, time::Duration};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn client_for(server: &MockServer, store: Arc<MemoryStore>) -> SessionClient {
    SessionClient::new(&ClientConfig::new(server.uri()), store).expect("client")
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

async fn request_count(server: &MockServer) -> Result<usize> {
    let Some(requests) = server.received_requests().await else {
        bail!("wiremock request recording is disabled");
    };
    Ok(requests.len())
}

struct FileGuard {
    path: PathBuf,
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[tokio::test]
async fn login_stores_token_and_user() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({
            "email": "student@uni.edu",
            "password": "Passw0rd"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok123",
            "user": { "id": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let client = client_for(&server, store.clone());
    let mut events = client.subscribe();

    let outcome = client
        .login(&Credentials::new("student@uni.edu", "Passw0rd"))
        .await?;

    assert!(outcome.authenticated);
    assert_eq!(client.token().unwrap().expose_secret(), "tok123");
    assert_eq!(store.get(StoreKey::Token)?.as_deref(), Some("tok123"));
    assert_eq!(
        client.current_user().map(|user| user.as_json().clone()),
        Some(json!({ "id": 1 }))
    );
    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::SignedIn { user: Some(_) })
    ));
    Ok(())
}

#[tokio::test]
async fn login_replaces_previous_token() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "new-token",
            "user": { "id": 2 }
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::Token, "old-token")?;
    let client = client_for(&server, store.clone());

    client
        .login(&Credentials::new("student@uni.edu", "Passw0rd"))
        .await?;

    assert_eq!(client.token().unwrap().expose_secret(), "new-token");
    assert_eq!(store.get(StoreKey::Token)?.as_deref(), Some("new-token"));

    // Credential endpoints never carry the previous bearer.
    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    Ok(())
}

#[tokio::test]
async fn login_rejected_keeps_token_absent() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let client = client_for(&server, store.clone());

    let err = client
        .login(&Credentials::new("student@uni.edu", "Passw0rd"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.message(), "Invalid credentials");
    assert!(client.token().is_none());
    assert_eq!(store.get(StoreKey::Token)?, None);
    Ok(())
}

#[tokio::test]
async fn logout_then_check_session_is_offline() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::Token, "tok123")?;
    store.set(StoreKey::ResetEmail, "a@b.com")?;
    let client = client_for(&server, store.clone());

    client.logout()?;
    assert!(client.check_session().await.is_none());

    assert_eq!(request_count(&server).await?, 0);
    assert_eq!(store.get(StoreKey::Token)?, None);
    assert_eq!(store.get(StoreKey::ResetEmail)?, None);
    Ok(())
}

#[tokio::test]
async fn check_session_sends_bearer_and_updates_user() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer tok123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "id": 7, "email": "student@uni.edu" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::Token, "tok123")?;
    let client = client_for(&server, store);

    let user = client.check_session().await.expect("session");
    assert_eq!(user.email(), Some("student@uni.edu"));
    assert_eq!(client.current_user(), Some(user));
    Ok(())
}

#[tokio::test]
async fn check_session_unauthorized_clears_and_short_circuits() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::Token, "stale")?;
    store.set(StoreKey::ResetEmail, "a@b.com")?;
    let client = client_for(&server, store.clone());
    let mut events = client.subscribe();

    assert!(client.check_session().await.is_none());
    assert!(client.token().is_none());
    assert_eq!(store.get(StoreKey::Token)?, None);
    assert_eq!(store.get(StoreKey::ResetEmail)?, None);
    assert_eq!(events.try_recv().ok(), Some(SessionEvent::Expired));

    assert!(client.check_session().await.is_none());
    assert_eq!(request_count(&server).await?, 1);
    Ok(())
}

#[tokio::test]
async fn check_session_swallows_server_errors() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::Token, "tok123")?;
    let client = client_for(&server, store.clone());
    let mut events = client.subscribe();

    assert!(client.check_session().await.is_none());
    assert_eq!(store.get(StoreKey::Token)?, None);
    assert_eq!(events.try_recv().ok(), Some(SessionEvent::Expired));
    assert!(events.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn late_unauthorized_does_not_end_newer_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "jwt expired" }))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "fresh",
            "user": { "id": 1 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::Token, "stale")?;
    store.set(StoreKey::ResetEmail, "a@b.com")?;
    let client = client_for(&server, store.clone());
    let mut events = client.subscribe();

    let checker = client.clone();
    let check = tokio::spawn(async move { checker.check_session().await });

    // Let the session check go out under the old token first.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let outcome = client
        .login(&Credentials::new("student@uni.edu", "Passw0rd"))
        .await?;
    assert!(outcome.authenticated);

    assert!(check.await?.is_none());

    assert_eq!(client.token().unwrap().expose_secret(), "fresh");
    assert_eq!(store.get(StoreKey::Token)?.as_deref(), Some("fresh"));
    assert_eq!(store.get(StoreKey::ResetEmail)?.as_deref(), Some("a@b.com"));
    assert!(client.current_user().is_some());

    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::SignedIn { .. })
    ));
    assert!(events.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn unauthorized_from_any_endpoint_ends_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/resend-verification"))
        .and(header("authorization", "Bearer tok123"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Not authorized" })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::Token, "tok123")?;
    let client = client_for(&server, store.clone());

    let err = client
        .resend_verification_email("student@uni.edu")
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.message(), "Not authorized");
    assert!(!client.is_authenticated());
    assert_eq!(store.get(StoreKey::Token)?, None);
    Ok(())
}

#[tokio::test]
async fn server_errors_surface_verbatim_without_state_change() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/forgot-password"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "No account with that email" })),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::Token, "tok123")?;
    let client = client_for(&server, store.clone());

    let err = client.forgot_password("ghost@uni.edu").await.unwrap_err();

    assert!(matches!(
        &err,
        SessionError::Http { status: 404, message } if message == "No account with that email"
    ));
    assert!(client.is_authenticated());
    assert_eq!(store.get(StoreKey::ResetEmail)?, None);
    Ok(())
}

#[tokio::test]
async fn forgot_password_remembers_email_for_resend() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/forgot-password"))
        .and(body_json(json!({ "email": "a@b.com" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Reset link sent" })),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/resend-verification"))
        .and(body_json(json!({ "email": "a@b.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Sent" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let client = client_for(&server, store.clone());

    let ack = client.forgot_password("a@b.com").await?;
    assert_eq!(ack.message(), Some("Reset link sent"));
    assert_eq!(client.reset_email_hint()?.as_deref(), Some("a@b.com"));
    assert_eq!(store.get(StoreKey::ResetEmail)?.as_deref(), Some("a@b.com"));

    client.resend_reset_link().await?;

    let hint = client.reset_email_hint()?.expect("hint");
    let ack = client.resend_verification_email(&hint).await?;
    assert_eq!(ack.message(), Some("Sent"));
    Ok(())
}

#[tokio::test]
async fn reset_password_posts_to_token_path_and_clears_hint() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/reset-password/abc123"))
        .and(body_json(json!({
            "password": "N3wPassword",
            "confirmPassword": "N3wPassword"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::ResetEmail, "a@b.com")?;
    let client = client_for(&server, store.clone());

    let ack = client
        .reset_password("abc123", &secret("N3wPassword"), &secret("N3wPassword"))
        .await?;

    assert_eq!(ack.as_json(), &json!({ "success": true }));
    assert_eq!(store.get(StoreKey::ResetEmail)?, None);
    Ok(())
}

#[tokio::test]
async fn reset_password_mismatch_never_reaches_network() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;
    let client = client_for(&server, Arc::new(MemoryStore::new()));

    let pairs = [
        ("N3wPassword", "N3wPassword2"),
        ("Abcdef1", "abcdef1"),
        ("Xyz12345", " Xyz12345"),
    ];
    for (password, confirmation) in pairs {
        let err = client
            .reset_password("abc123", &secret(password), &secret(confirmation))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    assert_eq!(request_count(&server).await?, 0);
    Ok(())
}

#[tokio::test]
async fn signup_persists_token_to_file_store() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/signup"))
        .and(body_json(json!({
            "name": "Ama Owusu",
            "email": "ama@uni.edu",
            "password": "Passw0rd",
            "confirmPassword": "Passw0rd",
            "phone": "+233201234567",
            "companyName": "Legon",
            "address": "University Ave"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "signup-token",
            "user": { "id": "u-1", "name": "Ama Owusu" }
        })))
        .mount(&server)
        .await;

    let state_file =
        std::env::temp_dir().join(format!("portal-session-{}.json", uuid::Uuid::new_v4()));
    let _guard = FileGuard {
        path: state_file.clone(),
    };

    let client = SessionClient::new(
        &ClientConfig::new(server.uri()),
        Arc::new(FileStore::new(state_file.clone())),
    )?;

    let profile = SignupProfile {
        name: "Ama Owusu".to_string(),
        email: "ama@uni.edu".to_string(),
        password: secret("Passw0rd"),
        confirm_password: secret("Passw0rd"),
        phone: "+233201234567".to_string(),
        company_name: "Legon".to_string(),
        address: "University Ave".to_string(),
        agree_terms: true,
    };
    let response = client.signup(&profile).await?;
    assert_eq!(response.token(), Some("signup-token"));

    // A fresh client (a new process) picks the token up from disk.
    let reopened = SessionClient::new(
        &ClientConfig::new(server.uri()),
        Arc::new(FileStore::new(state_file.clone())),
    )?;
    assert_eq!(reopened.token().unwrap().expose_secret(), "signup-token");
    Ok(())
}

#[tokio::test]
async fn signup_without_token_does_not_start_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/signup"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "message": "Check your email to verify your account" })),
        )
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let client = client_for(&server, store.clone());

    let profile = SignupProfile {
        name: "Ama Owusu".to_string(),
        email: "ama@uni.edu".to_string(),
        password: secret("Passw0rd"),
        confirm_password: secret("Passw0rd"),
        phone: "0201234567".to_string(),
        company_name: "Legon".to_string(),
        address: "University Ave".to_string(),
        agree_terms: true,
    };
    let response = client.signup(&profile).await?;

    assert_eq!(
        response.message.as_deref(),
        Some("Check your email to verify your account")
    );
    assert!(!client.is_authenticated());
    assert_eq!(store.get(StoreKey::Token)?, None);
    Ok(())
}

#[tokio::test]
async fn connection_refused_is_network_unreachable() -> Result<()> {
    // Reserve a port, then release it so nothing is listening.
    let port = match TcpListener::bind("127.0.0.1:0") {
        Ok(listener) => listener.local_addr()?.port(),
        Err(_) => {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
    };

    let store = Arc::new(MemoryStore::new());
    store.set(StoreKey::Token, "tok123")?;
    let client = SessionClient::new(
        &ClientConfig::new(format!("http://127.0.0.1:{port}")),
        store.clone(),
    )?;

    let err = client
        .login(&Credentials::new("student@uni.edu", "Passw0rd"))
        .await
        .unwrap_err();
    assert!(err.is_network(), "expected network error, got {err:?}");

    let err = client
        .resend_verification_email("student@uni.edu")
        .await
        .unwrap_err();
    assert!(err.is_network(), "expected network error, got {err:?}");

    // Transport failures leave the session alone.
    assert_eq!(store.get(StoreKey::Token)?.as_deref(), Some("tok123"));
    assert!(client.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn slow_backend_times_out() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/resend-verification"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "message": "Sent" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = SessionClient::new(
        &ClientConfig::new(server.uri()).with_timeout(Duration::from_millis(200)),
        Arc::new(MemoryStore::new()),
    )?;

    let err = client
        .resend_verification_email("student@uni.edu")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Timeout(_)), "got {err:?}");
    assert!(err.is_network());
    Ok(())
}
