//! Meter reading handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use meter_billing_core::{MeterReading, ReadingDraft, ReadingId, ReadingUpdate, StatusChange};

use crate::error::ApiError;
use crate::state::AppState;

/// Body of a successful delete.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
}

/// List all readings, newest reading date first.
pub async fn list_readings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<MeterReading>>, ApiError> {
    Ok(Json(state.billing.list_readings().await?))
}

/// Get one reading.
pub async fn get_reading(
    State(state): State<Arc<AppState>>,
    path: Result<Path<ReadingId>, PathRejection>,
) -> Result<Json<MeterReading>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.billing.get_reading(id).await?))
}

/// Create a reading. The amount owed is computed here, never taken from the
/// request.
pub async fn create_reading(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReadingDraft>, JsonRejection>,
) -> Result<Json<MeterReading>, ApiError> {
    let Json(draft) = payload?;
    Ok(Json(state.billing.create_reading(&draft).await?))
}

/// Edit a reading. Absent fields keep their stored value.
pub async fn update_reading(
    State(state): State<Arc<AppState>>,
    path: Result<Path<ReadingId>, PathRejection>,
    payload: Result<Json<ReadingUpdate>, JsonRejection>,
) -> Result<Json<MeterReading>, ApiError> {
    let Path(id) = path?;
    let Json(update) = payload?;
    Ok(Json(state.billing.edit_reading(id, &update).await?))
}

/// Delete a reading without payment history.
pub async fn delete_reading(
    State(state): State<Arc<AppState>>,
    path: Result<Path<ReadingId>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let Path(id) = path?;
    state.billing.delete_reading(id).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// Force the payment status of a reading.
pub async fn set_payment_status(
    State(state): State<Arc<AppState>>,
    path: Result<Path<ReadingId>, PathRejection>,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<MeterReading>, ApiError> {
    let Path(id) = path?;
    let Json(change) = payload?;
    Ok(Json(state.billing.set_payment_status(id, &change).await?))
}
