//! Common test utilities for meter-billing integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};

use meter_billing_core::MeterReading;
use meter_billing_service::{create_router, AppState, ServiceConfig};
use meter_billing_store::MemoryStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The store behind the server, for direct inspection.
    pub store: Arc<MemoryStore>,
}

impl TestHarness {
    /// Create a new test harness with an empty in-memory store.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            ..ServiceConfig::default()
        };

        let state = AppState::new(store.clone(), store.clone(), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, store }
    }

    /// Create the reference reading: 100 -> 150 at 20 per unit.
    pub async fn create_reading(&self) -> MeterReading {
        self.create_reading_with(reading_body("A-101", 100, 150, 20, "2024-05-01"))
            .await
    }

    /// Create a reading from a raw body, asserting success.
    pub async fn create_reading_with(&self, body: Value) -> MeterReading {
        let response = self.server.post("/api/readings").json(&body).await;
        response.assert_status_ok();
        response.json()
    }

    /// Record a payment, returning the raw response.
    pub async fn pay(&self, reading: &MeterReading, amount: i64, date: &str) -> TestResponse {
        self.server
            .post("/api/payments")
            .json(&json!({
                "meterReadingId": reading.id.to_string(),
                "amount": amount,
                "paymentDate": date,
                "method": "cash",
                "notes": "",
            }))
            .await
    }

    /// Fetch a reading by id, asserting it exists.
    pub async fn reading(&self, reading: &MeterReading) -> MeterReading {
        let response = self
            .server
            .get(&format!("/api/readings/{}", reading.id))
            .await;
        response.assert_status_ok();
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of a `POST /api/readings` request.
pub fn reading_body(unit: &str, previous: i64, current: i64, price: i64, date: &str) -> Value {
    json!({
        "unitNumber": unit,
        "previousReading": previous,
        "currentReading": current,
        "pricePerUnit": price,
        "readingDate": date,
        "dueDate": "2024-05-31",
    })
}

/// Assert the error envelope of a failed request.
pub fn assert_error_code(response: &TestResponse, code: &str) {
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], code);
    assert!(body["error"]["message"].is_string());
}
