//! End-to-end tests for `PortalClient` against a local axum server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use ddustack::prelude::*;
use tokio::net::TcpListener;

// =========================================================================
// Fake portal API
// =========================================================================

const PROFILE: &str = r#"{"id":"u-7","first_name":"Meron","last_name":"Haile","email":"meron@ddu.edu.et","role":"LECTURER","user_id":null,"is_active":true,"is_verified":true,"department":null,"year":null,"semester":null}"#;

/// One request as the portal's handlers saw it.
#[derive(Debug, Clone)]
struct Seen {
    route: &'static str,
    authorization: Option<String>,
    cookie: Option<String>,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn record(log: &Log, route: &'static str, headers: &HeaderMap) {
    let value = |name: header::HeaderName| {
        headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
    };
    log.lock().unwrap().push(Seen {
        route,
        authorization: value(header::AUTHORIZATION),
        cookie: value(header::COOKIE),
    });
}

fn json(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Login sets the `refresh_token` cookie and returns `T1`.
async fn login(State(log): State<Log>, headers: HeaderMap) -> Response {
    record(&log, "login", &headers);
    (
        [(header::SET_COOKIE, "refresh_token=r-1; Path=/; HttpOnly")],
        json(StatusCode::OK, format!(r#"{{"access_token":"T1","user":{PROFILE}}}"#)),
    )
        .into_response()
}

/// Answers `T2` only when the cookie comes back.
async fn refresh(State(log): State<Log>, headers: HeaderMap) -> Response {
    record(&log, "refresh", &headers);
    let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    if cookie.is_some_and(|c| c.split("; ").any(|pair| pair == "refresh_token=r-1")) {
        json(StatusCode::OK, r#"{"access_token":"T2"}"#.into())
    } else {
        json(StatusCode::UNAUTHORIZED, r#"{"detail":"Refresh token missing"}"#.into())
    }
}

/// Accepts `T1` or `T2`.
async fn me(State(log): State<Log>, headers: HeaderMap) -> Response {
    record(&log, "me", &headers);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some("Bearer T1" | "Bearer T2") => json(StatusCode::OK, PROFILE.into()),
        _ => json(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"Authentication credentials were not provided."}"#.into(),
        ),
    }
}

async fn start_portal() -> (String, Log) {
    let log = Log::default();
    let app = Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/refresh/", post(refresh))
        .route("/api/users/me/", get(me))
        .with_state(Arc::clone(&log));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().expect("should have addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server should run");
    });

    (format!("http://{addr}/api"), log)
}

fn client(base_url: &str) -> PortalClient {
    PortalClient::builder()
        .base_url(base_url)
        .request_timeout(Duration::from_secs(5))
        .build()
        .expect("should build")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_bootstrap_without_cookie_is_anonymous() {
    let (base, log) = start_portal().await;
    let client = client(&base);

    let outcome = client.bootstrap().await;

    assert_eq!(outcome, BootstrapOutcome::Anonymous);
    let session = client.session();
    assert!(session.is_anonymous());
    assert!(!session.is_initializing);
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1, "only the refresh attempt");
    assert_eq!(log[0].route, "refresh");
    assert_eq!(log[0].cookie, None);
}

#[tokio::test]
async fn test_login_cookie_recovers_session_after_reinitialize() {
    let (base, log) = start_portal().await;
    let client = client(&base);
    client.bootstrap().await;

    client
        .gatekeeper()
        .login("meron@ddu.edu.et", "secret")
        .await
        .expect("login should succeed");
    assert_eq!(client.session().access_token.as_deref(), Some("T1"));

    // Simulates a restart that kept the cookie jar.
    client.gatekeeper().reinitialize();
    let outcome = client.bootstrap().await;

    let BootstrapOutcome::Authenticated(user) = outcome else {
        panic!("expected a recovered session, got {outcome:?}");
    };
    assert_eq!(user.role, Role::Lecturer);
    assert_eq!(client.session().access_token.as_deref(), Some("T2"));

    let log = log.lock().unwrap();
    let [.., refresh, profile] = log.as_slice() else {
        panic!("expected refresh and profile calls, got {log:?}");
    };
    assert_eq!(refresh.route, "refresh");
    assert_eq!(refresh.cookie.as_deref(), Some("refresh_token=r-1"));
    assert_eq!(profile.route, "me");
    assert_eq!(profile.authorization.as_deref(), Some("Bearer T2"));
}

#[tokio::test]
async fn test_complete_oauth_redirect_rejects_state_mismatch() {
    let (base, log) = start_portal().await;
    let client = client(&base);

    let err = client
        .complete_oauth_redirect(
            "http://localhost:5173/oauth/callback/github?code=abc&state=forged",
            Some("issued"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DdustackError::Session(SessionError::OAuth(_))));
    assert!(log.lock().unwrap().is_empty(), "nothing sent for a forged callback");
}

#[tokio::test]
async fn test_complete_oauth_redirect_malformed_url_is_oauth_error() {
    let (base, log) = start_portal().await;
    let client = client(&base);

    let err = client
        .complete_oauth_redirect("not a callback", Some("issued"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, DdustackError::Session(SessionError::OAuth(ref msg)) if msg.contains("malformed")),
        "got {err:?}"
    );
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_github_authorization_requires_configuration() {
    let client = PortalClient::builder().build().expect("should build");
    assert!(matches!(client.github_authorization(), Err(DdustackError::Config(_))));

    let config = ClientConfig {
        github_client_id: Some("gh-id".into()),
        github_redirect_uri: Some("http://localhost:5173/oauth/callback/github".into()),
        ..ClientConfig::default()
    };
    let client = PortalClient::builder().config(config).build().expect("should build");
    let request = client.github_authorization().expect("github is configured");
    assert!(request.url.as_str().starts_with("https://github.com/login/oauth/authorize?"));
}

#[test]
fn test_build_rejects_invalid_base_url() {
    let result = PortalClient::builder().base_url("not a url").build();
    assert!(matches!(result, Err(DdustackError::Transport(TransportError::InvalidUrl(_)))));
}
