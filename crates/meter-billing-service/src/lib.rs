//! Meter billing HTTP API service.
//!
//! This crate hosts the reconciliation service and the HTTP shell around it:
//!
//! - Meter readings: create, edit, delete, list
//! - Payments: record, list
//! - Forced payment status (operator override)
//!
//! The reconciliation service ([`ReconciliationService`]) owns every rule
//! that spans the two stores; handlers only decode requests and map errors.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result

pub mod config;
pub mod error;
pub mod handlers;
pub mod reconcile;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use reconcile::{ReconciliationService, ServiceError, ServiceResult};
pub use routes::create_router;
pub use state::AppState;
