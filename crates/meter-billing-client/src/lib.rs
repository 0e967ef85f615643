//! Client SDK for the meter billing service.
//!
//! # Example
//!
//! ```no_run
//! use meter_billing_client::MeterBillingClient;
//! use meter_billing_core::PaymentStatus;
//!
//! # async fn example() -> Result<(), meter_billing_client::ClientError> {
//! let client = MeterBillingClient::new("http://localhost:3001")?;
//!
//! for reading in client.list_readings().await? {
//!     if reading.payment_status != PaymentStatus::Paid {
//!         println!("{} owes {}", reading.unit_number, reading.outstanding());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, MeterBillingClient};
pub use error::ClientError;
pub use types::{ApiErrorBody, ApiErrorResponse, DeleteResponse, HealthStatus};

// Re-export core types for convenience
pub use meter_billing_core::{
    MeterReading, PaymentInput, PaymentRecord, PaymentStatus, ReadingDraft, ReadingId,
    ReadingUpdate, StatusChange,
};
