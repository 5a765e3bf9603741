//! Shared helpers for integration tests: an app wired with in-memory
//! stores and a recording notifier, plus request plumbing.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use learnhub_auth::{
    build_router,
    config::{
        AppConfig, Environment, SecurityConfig, SessionConfig, SmtpConfig, SwaggerConfig,
        SwaggerMode,
    },
    services::{
        AuthService, ChallengeIssuer, InMemoryChallengeStore, InMemoryCredentialStore,
        MockNotifier, SessionService,
    },
    AppState,
};

pub struct TestApp {
    pub router: Router,
    pub notifier: Arc<MockNotifier>,
    pub challenges: Arc<InMemoryChallengeStore>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        environment: Environment::Dev,
        service_name: "learnhub-auth-test".to_string(),
        service_version: env!("CARGO_PKG_VERSION").to_string(),
        log_level: "debug".to_string(),
        port: 3000,
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            user: "test@example.com".to_string(),
            password: "unused".to_string(),
            from: "test@example.com".to_string(),
        },
        session: SessionConfig {
            secret: "integration-test-secret-32-bytes-min".to_string(),
            token_expiry_hours: 24,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
    }
}

pub fn spawn_app() -> TestApp {
    let config = test_config();

    let credentials = Arc::new(InMemoryCredentialStore::new());
    let challenges = Arc::new(InMemoryChallengeStore::new());
    let notifier = Arc::new(MockNotifier::new());
    let issuer = ChallengeIssuer::new(challenges.clone(), notifier.clone());
    let sessions = SessionService::new(&config.session).expect("Failed to create session service");

    let auth = AuthService::new(credentials, challenges.clone(), issuer, sessions.clone());

    let state = AppState {
        config,
        auth,
        sessions,
    };

    TestApp {
        router: build_router(state),
        notifier,
        challenges,
    }
}

/// POST a JSON body and return (status, parsed response body).
pub async fn post_json(
    router: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, json)
}

/// GET a path and return (status, parsed response body).
pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    (status, json)
}

/// Register an account and complete email verification.
pub async fn register_verified(app: &TestApp, email: &str, password: &str) {
    let (status, _) = post_json(
        &app.router,
        "/auth/register",
        serde_json::json!({
            "email": email,
            "display_name": "Test User",
            "password": password,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let code = app.notifier.last_code_for(email).expect("no code sent");
    let (status, _) = post_json(
        &app.router,
        "/auth/verify-email",
        serde_json::json!({ "email": email, "code": code }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
