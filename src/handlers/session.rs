use axum::{extract::State, response::IntoResponse, Json};

use crate::{
    dtos::auth::{IntrospectRequest, IntrospectResponse},
    AppState,
};

/// Introspect a session token
#[utoipa::path(
    post,
    path = "/auth/introspect",
    request_body = IntrospectRequest,
    responses(
        (status = 200, description = "Token status returned", body = IntrospectResponse)
    ),
    tag = "Session"
)]
pub async fn introspect(
    State(state): State<AppState>,
    Json(req): Json<IntrospectRequest>,
) -> impl IntoResponse {
    Json(state.sessions.introspect(&req.token))
}
