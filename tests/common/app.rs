//! Test application factory for integration tests.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use linkseal::models::AppConfig;
use linkseal::server::{build_router, create_app_state};

pub const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const TEST_APP_URL: &str = "http://test.local";
pub const TEST_HOST: &str = "test.local";

/// Test application wrapping the real router
pub struct TestApp {
    router: axum::Router,
}

impl TestApp {
    /// Create a test application with a fixed secret and app url
    pub fn new() -> Self {
        let config = Arc::new(AppConfig {
            secret: TEST_SECRET.to_string(),
            app_url: TEST_APP_URL.to_string(),
            global_prefix: "api".to_string(),
        });

        let state = create_app_state(config).expect("Failed to create app state");

        Self {
            router: build_router(state),
        }
    }

    /// Make a GET request with the test host header
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(
            Request::get(path)
                .header("host", TEST_HOST)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a GET request with a custom Host header
    pub async fn request_from_host(&self, path: &str, host: &str) -> TestResponse {
        self.request(
            Request::get(path)
                .header("host", host)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a GET request without a Host header
    pub async fn get_without_host(&self, path: &str) -> TestResponse {
        self.request(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    /// Send a request to the router
    async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse { status, body }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Test response with convenience methods
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Parse body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Get body as string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}
