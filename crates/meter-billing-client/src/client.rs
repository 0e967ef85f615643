//! Meter billing HTTP client implementation.

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use meter_billing_core::{
    MeterReading, PaymentInput, PaymentRecord, ReadingDraft, ReadingId, ReadingUpdate,
    StatusChange,
};

use crate::error::ClientError;
use crate::types::{ApiErrorResponse, DeleteResponse, HealthStatus};

/// Meter billing API client.
///
/// Covers readings, payments and forced payment status. Every method maps the
/// service's machine-readable error kinds onto [`ClientError`] variants.
#[derive(Debug, Clone)]
pub struct MeterBillingClient {
    client: Client,
    base_url: String,
}

impl MeterBillingClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"http://meter-billing:3001"`)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Check service health.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.send(self.request(Method::GET, "/health")).await
    }

    /// List all readings, newest reading date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_readings(&self) -> Result<Vec<MeterReading>, ClientError> {
        self.send(self.request(Method::GET, "/api/readings")).await
    }

    /// Get one reading.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the reading does not exist.
    pub async fn get_reading(&self, id: ReadingId) -> Result<MeterReading, ClientError> {
        self.send(self.request(Method::GET, &format!("/api/readings/{id}")))
            .await
    }

    /// Create a reading. The service computes consumption and amount owed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the draft is rejected.
    pub async fn create_reading(&self, draft: &ReadingDraft) -> Result<MeterReading, ClientError> {
        self.send_json(Method::POST, "/api/readings", draft).await
    }

    /// Edit a reading. Absent fields keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` or `ClientError::Validation`.
    pub async fn update_reading(
        &self,
        id: ReadingId,
        update: &ReadingUpdate,
    ) -> Result<MeterReading, ClientError> {
        self.send_json(Method::PUT, &format!("/api/readings/{id}"), update)
            .await
    }

    /// Delete a reading that has no payment history.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Conflict` if the reading has payments.
    pub async fn delete_reading(&self, id: ReadingId) -> Result<(), ClientError> {
        let _: DeleteResponse = self
            .send(self.request(Method::DELETE, &format!("/api/readings/{id}")))
            .await?;
        Ok(())
    }

    /// Force the payment status of a reading.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an out-of-range partial amount.
    pub async fn set_payment_status(
        &self,
        id: ReadingId,
        change: &StatusChange,
    ) -> Result<MeterReading, ClientError> {
        self.send_json(
            Method::PUT,
            &format!("/api/readings/{id}/payment-status"),
            change,
        )
        .await
    }

    /// Record a payment against a reading.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the reading does not exist.
    pub async fn record_payment(&self, input: &PaymentInput) -> Result<PaymentRecord, ClientError> {
        self.send_json(Method::POST, "/api/payments", input).await
    }

    /// List the payment records of a reading, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the reading does not exist.
    pub async fn list_payments(&self, id: ReadingId) -> Result<Vec<PaymentRecord>, ClientError> {
        self.send(self.request(Method::GET, &format!("/api/payments/{id}")))
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.request(method, path).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let message = api_error.error.message;
                tracing::debug!(
                    status = status.as_u16(),
                    code = %api_error.error.code,
                    message = %message,
                    "Meter billing API returned an error"
                );

                match api_error.error.code.as_str() {
                    "validation_error" => Err(ClientError::Validation { message }),
                    "not_found" => Err(ClientError::NotFound { message }),
                    "conflict" => Err(ClientError::Conflict { message }),
                    code => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}
