//! Demo endpoints: issue unsigned/signed links to the echo routes.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::server::AppState;
use crate::services::{ParamMap, QueryMap};

/// Query accepted by the link-issuing endpoints.
#[derive(Debug, Deserialize, IntoParams)]
pub struct MakeUrlParams {
    /// Email address carried in the link's query data
    pub email: Option<String>,

    /// User id substituted into the route template
    pub user_id: Option<String>,

    /// Link lifetime in seconds (signed links only). Negative values
    /// produce an already expired link, which is handy for testing.
    pub expires_in: Option<i64>,
}

/// A freshly issued link.
#[derive(Debug, Serialize, ToSchema)]
pub struct MakeUrlResponse {
    /// The generated URL
    pub url: String,
}

/// What the echo routes saw in the verified request.
#[derive(Debug, Serialize, ToSchema)]
pub struct EchoResponse {
    pub version: String,
    pub user_id: String,
    pub query: HashMap<String, String>,
}

fn link_inputs(params: &MakeUrlParams) -> (QueryMap, ParamMap) {
    let mut query = QueryMap::new();
    query.insert(
        "email",
        params.email.clone().unwrap_or_else(|| "user@example.com".to_string()),
    );

    let mut route_params = ParamMap::new();
    route_params.insert("version".to_string(), "1.0".to_string());
    route_params.insert(
        "user_id".to_string(),
        params.user_id.clone().unwrap_or_else(|| "42".to_string()),
    );

    (query, route_params)
}

/// Issue an unsigned URL to the open echo route
#[utoipa::path(
    get,
    path = "/make-url",
    params(MakeUrlParams),
    responses(
        (status = 200, description = "URL generated", body = MakeUrlResponse),
    ),
    tag = "Links"
)]
pub async fn handle_make_url(
    State(state): State<AppState>,
    Query(params): Query<MakeUrlParams>,
) -> Result<Json<MakeUrlResponse>, ApiError> {
    let (query, route_params) = link_inputs(&params);
    let url = state
        .generator
        .generate_url_from_route("email.target", &query, &route_params)?;
    Ok(Json(MakeUrlResponse { url }))
}

/// Issue a signed, expiring URL to the guarded echo route
#[utoipa::path(
    get,
    path = "/make-signed-url",
    params(MakeUrlParams),
    responses(
        (status = 200, description = "Signed URL generated", body = MakeUrlResponse),
    ),
    tag = "Links"
)]
pub async fn handle_make_signed_url(
    State(state): State<AppState>,
    Query(params): Query<MakeUrlParams>,
) -> Result<Json<MakeUrlResponse>, ApiError> {
    let expires_in = params.expires_in.unwrap_or(86_400);
    let expiration_date = Utc::now() + Duration::seconds(expires_in);

    let (query, route_params) = link_inputs(&params);
    let url = state.generator.signed_route_url(
        "email.verify",
        Some(expiration_date),
        &query,
        &route_params,
    )?;
    Ok(Json(MakeUrlResponse { url }))
}

/// Open echo route, reachable without a signature
#[utoipa::path(
    get,
    path = "/target/{version}/{user_id}",
    params(
        ("version" = String, Path, description = "API version from the route template"),
        ("user_id" = String, Path, description = "Target user id"),
    ),
    responses(
        (status = 200, description = "Echoed request data", body = EchoResponse),
    ),
    tag = "Echo"
)]
pub async fn handle_target(
    Path((version, user_id)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<EchoResponse> {
    Json(EchoResponse {
        version,
        user_id,
        query,
    })
}

/// Guarded echo route; the signed-url guard runs before this handler
#[utoipa::path(
    get,
    path = "/verify/{version}/{user_id}",
    params(
        ("version" = String, Path, description = "API version from the route template"),
        ("user_id" = String, Path, description = "Target user id"),
        ("signed" = String, Query, description = "Hex HMAC digest of the reconstructed URL"),
        ("expirationDate" = Option<String>, Query, description = "ISO-8601 expiry instant"),
    ),
    responses(
        (status = 200, description = "Signature verified, echoed request data", body = EchoResponse),
        (status = 400, description = "Structurally invalid request"),
        (status = 403, description = "Signature mismatch or expired link"),
    ),
    tag = "Echo"
)]
pub async fn handle_verify(
    Path((version, user_id)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<EchoResponse> {
    Json(EchoResponse {
        version,
        user_id,
        query,
    })
}
