//! In-memory storage implementation.
//!
//! Backs both store traits with process-local maps behind a single lock, so
//! every call is atomic on its own, like a row-level statement in the
//! database. Nothing survives a restart.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use meter_billing_core::{
    MeterReading, PaymentId, PaymentRecord, ReadingId, Settlement,
};

use crate::error::{Result, StoreError};
use crate::{BilledReading, NewPayment, PaymentStore, ReadingStore};

#[derive(Default)]
struct Tables {
    readings: HashMap<ReadingId, MeterReading>,
    payments: Vec<PaymentRecord>,
}

impl Tables {
    /// Append a record for an existing reading, like the foreign key does.
    fn append_payment(&mut self, payment: &NewPayment) -> Result<PaymentRecord> {
        if !self.readings.contains_key(&payment.meter_reading_id) {
            return Err(StoreError::reading_not_found(payment.meter_reading_id));
        }

        let record = PaymentRecord {
            id: PaymentId::generate(),
            meter_reading_id: payment.meter_reading_id,
            amount: payment.amount,
            payment_date: payment.payment_date,
            payment_method: payment.payment_method.clone(),
            notes: payment.notes.clone(),
            created_at: Utc::now(),
        };
        self.payments.push(record.clone());
        Ok(record)
    }

    fn current_row(
        &mut self,
        id: ReadingId,
        expected_version: i64,
    ) -> Result<Option<&mut MeterReading>> {
        let row = self
            .readings
            .get_mut(&id)
            .ok_or_else(|| StoreError::reading_not_found(id))?;
        Ok((row.version == expected_version).then_some(row))
    }
}

fn write_settlement(row: &mut MeterReading, settlement: Settlement) -> MeterReading {
    row.paid_amount = settlement.paid_amount;
    row.payment_status = settlement.payment_status;
    row.version += 1;
    row.updated_at = Utc::now();
    row.clone()
}

/// Memory-backed storage implementation.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn list_readings(&self) -> Result<Vec<MeterReading>> {
        let tables = self.tables.read().await;
        let mut readings: Vec<_> = tables.readings.values().cloned().collect();
        readings.sort_by_key(|r| Reverse((r.reading_date, r.created_at, r.id)));
        Ok(readings)
    }

    async fn get_reading(&self, id: ReadingId) -> Result<Option<MeterReading>> {
        Ok(self.tables.read().await.readings.get(&id).cloned())
    }

    async fn insert_reading(&self, reading: &BilledReading) -> Result<MeterReading> {
        let now = Utc::now();
        let row = MeterReading {
            id: ReadingId::generate(),
            unit_number: reading.unit_number.clone(),
            previous_reading: reading.previous_reading,
            current_reading: reading.current_reading,
            units_consumed: reading.units_consumed,
            price_per_unit: reading.price_per_unit,
            total_amount: reading.total_amount,
            reading_date: reading.reading_date,
            due_date: reading.due_date,
            paid_amount: Settlement::UNPAID.paid_amount,
            payment_status: Settlement::UNPAID.payment_status,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.tables
            .write()
            .await
            .readings
            .insert(row.id, row.clone());

        Ok(row)
    }

    async fn update_billing(
        &self,
        id: ReadingId,
        reading: &BilledReading,
    ) -> Result<MeterReading> {
        let mut tables = self.tables.write().await;
        let row = tables
            .readings
            .get_mut(&id)
            .ok_or_else(|| StoreError::reading_not_found(id))?;

        row.unit_number.clone_from(&reading.unit_number);
        row.previous_reading = reading.previous_reading;
        row.current_reading = reading.current_reading;
        row.units_consumed = reading.units_consumed;
        row.price_per_unit = reading.price_per_unit;
        row.total_amount = reading.total_amount;
        row.reading_date = reading.reading_date;
        row.due_date = reading.due_date;
        row.version += 1;
        row.updated_at = Utc::now();

        Ok(row.clone())
    }

    async fn update_settlement(
        &self,
        id: ReadingId,
        expected_version: i64,
        settlement: Settlement,
    ) -> Result<Option<MeterReading>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .current_row(id, expected_version)?
            .map(|row| write_settlement(row, settlement)))
    }

    async fn settle_with_payment(
        &self,
        id: ReadingId,
        expected_version: i64,
        settlement: Settlement,
        payment: &NewPayment,
    ) -> Result<Option<(MeterReading, PaymentRecord)>> {
        let mut tables = self.tables.write().await;
        if tables.current_row(id, expected_version)?.is_none() {
            return Ok(None);
        }

        let record = tables.append_payment(payment)?;
        let reading = tables
            .current_row(id, expected_version)?
            .map(|row| write_settlement(row, settlement))
            .ok_or_else(|| StoreError::reading_not_found(id))?;

        Ok(Some((reading, record)))
    }

    async fn delete_reading(&self, id: ReadingId) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.payments.iter().any(|p| p.meter_reading_id == id) {
            return Err(StoreError::payments_exist(id));
        }

        tables
            .readings
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::reading_not_found(id))
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn insert_payment(&self, payment: &NewPayment) -> Result<PaymentRecord> {
        self.tables.write().await.append_payment(payment)
    }

    async fn list_payments(&self, reading_id: ReadingId) -> Result<Vec<PaymentRecord>> {
        let tables = self.tables.read().await;
        let mut payments: Vec<_> = tables
            .payments
            .iter()
            .filter(|p| p.meter_reading_id == reading_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| Reverse((p.payment_date, p.created_at, p.id)));
        Ok(payments)
    }

    async fn has_payments(&self, reading_id: ReadingId) -> Result<bool> {
        Ok(self
            .tables
            .read()
            .await
            .payments
            .iter()
            .any(|p| p.meter_reading_id == reading_id))
    }
}
