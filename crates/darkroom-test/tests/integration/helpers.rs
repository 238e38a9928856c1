#![allow(clippy::expect_used, dead_code)]
//! Test helpers for integration tests.
//!
//! Each test gets its own in-memory local store and memory cloud, so tests
//! run in parallel without sharing state.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use salvo::http::header::HeaderName;
use salvo::http::{Method, StatusCode};
use salvo::prelude::*;
use salvo::test::{RequestBuilder, ResponseExt};
use serde_json::Value;

use darkroom_test::Studio;
use darkroom_test::app::api::routes;
use darkroom_test::app::config::SettingsHandler;
use darkroom_test::app::studio_handler::StudioHandler;
use darkroom_test::component::config::Settings;
use darkroom_test::component::cloud::memory::MemoryCloud;
use darkroom_test::component::testing::memory_studio_with;

pub use darkroom_test::component::testing::{manager, photographer, reception};

/// An isolated studio plus the cloud double behind it.
pub struct TestStudio {
    pub studio: Studio,
    pub cloud: Arc<MemoryCloud>,
}

impl TestStudio {
    pub async fn new() -> Self {
        Self::with(|_| {}).await
    }

    pub async fn with(configure: impl FnOnce(&mut Settings)) -> Self {
        let (studio, cloud) = memory_studio_with(configure)
            .await
            .expect("Failed to create test studio");
        Self { studio, cloud }
    }

    /// Cuts the studio off from the cloud on both sides.
    pub fn go_offline(&self) {
        self.cloud.set_online(false);
        self.studio.connectivity.set_online(false);
    }

    /// Makes the cloud reachable again; the studio notices on its next probe.
    pub fn restore_network(&self) {
        self.cloud.set_online(true);
    }

    /// Mutating cloud calls that touched `id`, as `(op, table)` pairs.
    pub fn calls_for(&self, id: &str) -> Vec<(&'static str, String)> {
        self.cloud
            .calls()
            .into_iter()
            .filter(|call| call.id == id)
            .map(|call| (call.op, call.table))
            .collect()
    }

    /// The full application router over this studio.
    pub fn service(&self) -> Service {
        let router = Router::new()
            .hoop(SettingsHandler::new(self.studio.settings().clone()))
            .hoop(StudioHandler {
                studio: self.studio.clone(),
            })
            .push(routes());
        Service::new(router)
    }
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).expect("valid date")
}

pub fn hour(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).expect("valid time")
}

/// Test request builder for constructing HTTP requests.
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
}

impl TestRequest {
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sets the proxy identity headers.
    pub fn acting_as(self, id: &str, role: &str) -> Self {
        self.header("x-actor-id", id).header("x-actor-role", role)
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
        let body = response.take_bytes(None).await.unwrap_or_default().to_vec();
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
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("Response body is not JSON")
    }
}
