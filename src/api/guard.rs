//! Request guard for signed routes.
//!
//! Applied as a `route_layer` on endpoints that only accept signed links.
//! The guard reconstructs the request's URL shape (protocol from the
//! configured app url, host from the Host header, path and query from the
//! request line, query in wire order) and hands it to the verifier.

use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::server::AppState;
use crate::services::parse_query;

pub async fn require_signed_url(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if validate_request(&state, &request)? {
        Ok(next.run(request).await)
    } else {
        tracing::debug!(path = %request.uri().path(), "Refusing expired signed url");
        Err(ApiError::ExpiredUrl)
    }
}

fn validate_request(state: &AppState, request: &Request) -> Result<bool, ApiError> {
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::MissingHeader("host"))?;

    let path = request.uri().path();
    let query = parse_query(request.uri().query().unwrap_or(""));

    state
        .generator
        .is_signature_valid(state.generator.protocol(), host, path, &query)
        .map_err(ApiError::from)
}
