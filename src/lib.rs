pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, SwaggerMode};
use crate::services::{AuthService, SessionService};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::register,
        handlers::auth::verify_email,
        handlers::auth::login,
        handlers::auth::forgot_password,
        handlers::auth::verify_otp,
        handlers::auth::reset_password,
        handlers::session::introspect,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::RegisterResponse,
            dtos::auth::VerifyEmailRequest,
            dtos::auth::VerifyResponse,
            dtos::auth::LoginRequest,
            dtos::auth::LoginResponse,
            dtos::auth::UserResponse,
            dtos::auth::ForgotPasswordRequest,
            dtos::auth::VerifyOtpRequest,
            dtos::auth::ResetPasswordRequest,
            dtos::auth::MessageResponse,
            dtos::auth::IntrospectRequest,
            dtos::auth::IntrospectResponse,
            models::Role,
        )
    ),
    tags(
        (name = "Authentication", description = "Account registration, verification, login and password reset"),
        (name = "Session", description = "Session token introspection"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthService,
    pub sessions: SessionService,
}

pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new().route("/health", get(health_check));

    if state.config.swagger.enabled == SwaggerMode::Public {
        app = app.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    app.route("/auth/register", post(handlers::auth::register))
        .route("/auth/verify-email", post(handlers::auth::verify_email))
        .route("/auth/login", post(handlers::auth::login))
        .route(
            "/auth/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .route("/auth/verify-otp", post(handlers::auth::verify_otp))
        .route(
            "/auth/reset-password",
            post(handlers::auth::reset_password),
        )
        .route("/auth/introspect", post(handlers::session::introspect))
        .with_state(state.clone())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(origin = %o, error = %e, "Invalid CORS origin, using fallback");
                                HeaderValue::from_static("http://localhost:3000")
                            })
                        })
                        .collect::<Vec<HeaderValue>>(),
                )
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        )
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": state.config.service_name,
        "version": state.config.service_version,
    }))
}
