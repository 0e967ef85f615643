//! Payment handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;

use meter_billing_core::{PaymentInput, PaymentRecord, ReadingId};

use crate::error::ApiError;
use crate::state::AppState;

/// Record a payment against a reading.
pub async fn record_payment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PaymentInput>, JsonRejection>,
) -> Result<Json<PaymentRecord>, ApiError> {
    let Json(input) = payload?;
    Ok(Json(state.billing.record_payment(&input).await?))
}

/// List the payment records of a reading, newest first.
pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    path: Result<Path<ReadingId>, PathRejection>,
) -> Result<Json<Vec<PaymentRecord>>, ApiError> {
    let Path(reading_id) = path?;
    Ok(Json(state.billing.list_payments(reading_id).await?))
}
