//! Application state.

use std::sync::Arc;

use meter_billing_store::{PaymentStore, ReadingStore};

use crate::config::ServiceConfig;
use crate::reconcile::ReconciliationService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Billing and payment operations over the configured stores.
    pub billing: ReconciliationService,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        readings: Arc<dyn ReadingStore>,
        payments: Arc<dyn PaymentStore>,
        config: ServiceConfig,
    ) -> Self {
        let billing = ReconciliationService::new(readings, payments)
            .with_max_settlement_retries(config.settlement_max_retries);

        Self { billing, config }
    }
}
