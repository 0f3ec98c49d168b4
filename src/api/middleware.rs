//! API Middleware
//!
//! Bearer token authentication and request logging middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;

use super::AppState;

const AUTHORIZATION_TYPE_BEARER: &str = "bearer";

// =========================================================================
// Bearer Token Authentication Middleware
// =========================================================================

/// Verify the `authorization: Bearer <token>` header.
///
/// On success the verified [`TokenPayload`](crate::token::TokenPayload) is
/// stored in the request extensions for handlers to authorize against.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?;

    let payload = state.token_maker.verify_token(token)?;
    request.extensions_mut().insert(payload);

    Ok(next.run(request).await)
}

/// Extract the token from the authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let authorization = headers
        .get(AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default())
        .unwrap_or_default();

    if authorization.is_empty() {
        return Err(AppError::Unauthorized(
            "authorization header is not provided".to_string(),
        ));
    }

    let mut fields = authorization.split_whitespace();
    let (Some(kind), Some(token)) = (fields.next(), fields.next()) else {
        return Err(AppError::Unauthorized(
            "invalid authorization header format".to_string(),
        ));
    };

    if !kind.eq_ignore_ascii_case(AUTHORIZATION_TYPE_BEARER) {
        return Err(AppError::Unauthorized(format!(
            "unsupported authorization type {}",
            kind
        )));
    }

    Ok(token)
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let masked_value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    let headers = mask_headers_for_logging(request.headers());

    // Set by SetRequestIdLayer further out
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        version = ?version,
        request_id = ?request_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        request_id = ?request_id,
        "Request completed"
    );

    response
}
