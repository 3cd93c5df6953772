//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per insights endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Insights Endpoints
    // ========================================================================

    /// POST /api/insights/scan
    pub async fn start_scan(&self, user_id: i64, target_url: &str) -> Response {
        self.start_scan_with_body(user_id, json!({ "targetUrl": target_url }))
            .await
    }

    /// POST /api/insights/scan with an arbitrary JSON body
    pub async fn start_scan_with_body(&self, user_id: i64, body: Value) -> Response {
        self.client
            .post(format!(
                "{}/api/insights/scan?userId={}",
                self.base_url, user_id
            ))
            .json(&body)
            .send()
            .await
            .expect("Start scan request failed")
    }

    /// Starts a scan and returns the created job id, panicking on failure.
    pub async fn start_scan_ok(&self, user_id: i64, target_url: &str) -> i64 {
        let response = self.start_scan(user_id, target_url).await;
        assert!(
            response.status().is_success(),
            "start_scan failed with {}",
            response.status()
        );
        let body: Value = response.json().await.expect("Invalid JSON");
        body["data"]["id"].as_i64().expect("Missing job id")
    }

    /// GET /api/insights/dashboard/{job_id}
    pub async fn get_dashboard(&self, job_id: i64) -> Response {
        self.client
            .get(format!("{}/api/insights/dashboard/{}", self.base_url, job_id))
            .send()
            .await
            .expect("Get dashboard request failed")
    }

    /// GET /api/insights/jobs?userId=
    pub async fn get_user_jobs(&self, user_id: i64) -> Response {
        self.client
            .get(format!(
                "{}/api/insights/jobs?userId={}",
                self.base_url, user_id
            ))
            .send()
            .await
            .expect("Get user jobs request failed")
    }
}
