use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors produced while generating or verifying signed URLs.
#[derive(Debug, Error)]
pub enum SignedUrlError {
    #[error("The secret key must not be empty")]
    MissingSigningKey,

    #[error("No placeholder `:{0}` in the route template")]
    ParamMismatch(String),

    #[error("Query already contains the reserved key `{0}`")]
    ReservedKeyConflict(String),

    #[error("No route registered under `{0}`")]
    UnknownRoute(String),

    #[error("No route resolver configured")]
    MissingResolver,

    #[error("Route `{0}` is not protected by signed url verification")]
    UnguardedRoute(String),

    #[error("Request is missing {0}")]
    MalformedRequest(&'static str),

    #[error("Malformed expiration date `{0}`")]
    MalformedExpiration(String),

    #[error("Signature does not match the url")]
    SignatureMismatch,
}

/// Startup configuration errors. All of these are fatal: the process
/// must not serve traffic with a missing secret or a relative app url.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("The secret key must not be empty")]
    MissingSecret,

    #[error("The app url must not be empty")]
    MissingAppUrl,

    #[error("The app url must be absolute, including its scheme: `{0}`")]
    SchemelessAppUrl(String),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid url: {0}")]
    InvalidUrl(#[from] SignedUrlError),

    #[error("Signed url has expired")]
    ExpiredUrl,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidUrl(err) => match err {
                // Structural defects in the request are the caller's fault.
                SignedUrlError::MalformedRequest(_)
                | SignedUrlError::MalformedExpiration(_)
                | SignedUrlError::ParamMismatch(_) => StatusCode::BAD_REQUEST,
                SignedUrlError::ReservedKeyConflict(_) => StatusCode::CONFLICT,
                SignedUrlError::SignatureMismatch => StatusCode::FORBIDDEN,
                // The rest only arise from broken wiring.
                SignedUrlError::MissingSigningKey
                | SignedUrlError::UnknownRoute(_)
                | SignedUrlError::MissingResolver
                | SignedUrlError::UnguardedRoute(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::ExpiredUrl => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "status": status.as_u16(),
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_url_error_messages() {
        assert_eq!(
            SignedUrlError::ParamMismatch("userId".to_string()).to_string(),
            "No placeholder `:userId` in the route template"
        );
        assert_eq!(
            SignedUrlError::ReservedKeyConflict("signed".to_string()).to_string(),
            "Query already contains the reserved key `signed`"
        );
        assert_eq!(
            SignedUrlError::MalformedRequest("host").to_string(),
            "Request is missing host"
        );
        assert_eq!(
            SignedUrlError::SignatureMismatch.to_string(),
            "Signature does not match the url"
        );
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::MissingSecret.to_string(),
            "The secret key must not be empty"
        );
        assert_eq!(
            ConfigError::SchemelessAppUrl("example.com".to_string()).to_string(),
            "The app url must be absolute, including its scheme: `example.com`"
        );
    }

    #[test]
    fn test_api_error_into_response_status_codes() {
        // MissingHeader -> BAD_REQUEST
        let response = ApiError::MissingHeader("host").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Structural verification failures -> BAD_REQUEST
        let response =
            ApiError::InvalidUrl(SignedUrlError::MalformedRequest("signature")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Signature mismatch -> FORBIDDEN
        let response = ApiError::InvalidUrl(SignedUrlError::SignatureMismatch).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Reserved-key conflict -> CONFLICT
        let response =
            ApiError::InvalidUrl(SignedUrlError::ReservedKeyConflict("signed".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Wiring mistakes -> INTERNAL_SERVER_ERROR
        let response =
            ApiError::InvalidUrl(SignedUrlError::UnknownRoute("x".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // Expired link -> FORBIDDEN
        let response = ApiError::ExpiredUrl.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Internal -> INTERNAL_SERVER_ERROR
        let response = ApiError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_api_error_from_signed_url_error() {
        let err: ApiError = SignedUrlError::SignatureMismatch.into();
        match err {
            ApiError::InvalidUrl(SignedUrlError::SignatureMismatch) => {}
            _ => panic!("Expected InvalidUrl variant"),
        }
    }
}
