//! Request helpers for handler tests: a service wired like `main` over an
//! in-memory studio.

use std::sync::Arc;

use salvo::http::header::HeaderName;
use salvo::http::{Method, StatusCode};
use salvo::prelude::*;
use salvo::test::{RequestBuilder, ResponseExt};
use serde_json::Value;

use darkroom_core::config::Settings;
use darkroom_service::Studio;
use darkroom_service::cloud::memory::MemoryCloud;
use darkroom_service::testing::memory_studio_with;

use crate::config::SettingsHandler;
use crate::studio_handler::StudioHandler;

pub async fn test_service() -> (Service, Studio, Arc<MemoryCloud>) {
    test_service_with(|_| {}).await
}

pub async fn test_service_with(
    configure: impl FnOnce(&mut Settings),
) -> (Service, Studio, Arc<MemoryCloud>) {
    let (studio, cloud) = memory_studio_with(configure).await.expect("studio");
    let router = Router::new()
        .hoop(SettingsHandler::new(studio.settings().clone()))
        .hoop(StudioHandler {
            studio: studio.clone(),
        })
        .push(super::routes());
    (Service::new(router), studio, cloud)
}

/// Test request builder for constructing HTTP requests.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
}

impl TestRequest {
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub async fn send(self, service: &Service) -> TestResponse {
        let url = format!("http://127.0.0.1:5800{}", self.path);
        let mut client = RequestBuilder::new(&url, self.method);
        for (name, value) in self.headers {
            if let Ok(header_name) = HeaderName::try_from(name.as_str()) {
                client = client.add_header(header_name, value, true);
            }
        }

        let mut response = client.send(service).await;
        let status = response
            .status_code
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Vec<u8> = response.take_bytes(None).await.unwrap_or_default().to_vec();
        TestResponse { status, body }
    }
}

/// Represents an HTTP test response for assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TestResponse {
    #[must_use]
    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {expected} but got {}: {}",
            self.status,
            self.body_string()
        );
        self
    }

    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }
}
