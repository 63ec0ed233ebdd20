use axum::{
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Authentication middleware that validates Bearer JWT tokens
#[tracing::instrument(skip(state, req, next))]
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("Invalid authorization header format");
        StatusCode::UNAUTHORIZED
    })?;

    let claims = state.jwt_service.validate_token(token).map_err(|e| {
        tracing::warn!(error = %e, "Rejected bearer token");
        StatusCode::UNAUTHORIZED
    })?;

    // Claims are read by handlers through `Extension<UserClaims>`
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
