//! Relational schema for the PostgreSQL backend.
//!
//! Two tables, related by `payment_records.meter_reading_id -> meter_readings.id`.
//! The foreign key has no cascade: a reading with payment history cannot be
//! deleted.

/// Table names.
pub mod table {
    /// One row per meter reading, with its cached settlement.
    pub const METER_READINGS: &str = "meter_readings";

    /// Append-only payment records.
    pub const PAYMENT_RECORDS: &str = "payment_records";
}

/// Column list selected for a meter reading row.
pub const READING_COLUMNS: &str = "id, unit_number, previous_reading, current_reading, \
     units_consumed, price_per_unit, total_amount, reading_date, due_date, paid_amount, \
     payment_status, version, created_at, updated_at";

/// Column list selected for a payment record row.
pub const PAYMENT_COLUMNS: &str =
    "id, meter_reading_id, amount, payment_date, payment_method, notes, created_at";

/// Statements creating the schema if it does not exist, in order.
#[must_use]
pub fn bootstrap_statements() -> Vec<&'static str> {
    vec![
        "CREATE TABLE IF NOT EXISTS meter_readings (
            id               UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            unit_number      TEXT NOT NULL,
            previous_reading NUMERIC NOT NULL CHECK (previous_reading >= 0),
            current_reading  NUMERIC NOT NULL CHECK (current_reading >= 0),
            units_consumed   NUMERIC NOT NULL,
            price_per_unit   NUMERIC NOT NULL CHECK (price_per_unit > 0),
            total_amount     NUMERIC(14, 2) NOT NULL,
            reading_date     DATE NOT NULL,
            due_date         DATE NOT NULL,
            paid_amount      NUMERIC(14, 2) NOT NULL DEFAULT 0 CHECK (paid_amount >= 0),
            payment_status   TEXT NOT NULL DEFAULT 'unpaid'
                             CHECK (payment_status IN ('unpaid', 'partial', 'paid')),
            version          BIGINT NOT NULL DEFAULT 0,
            created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at       TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        "CREATE TABLE IF NOT EXISTS payment_records (
            id               UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            meter_reading_id UUID NOT NULL REFERENCES meter_readings (id),
            amount           NUMERIC(14, 2) NOT NULL CHECK (amount >= 0),
            payment_date     DATE NOT NULL,
            payment_method   TEXT NOT NULL,
            notes            TEXT NOT NULL DEFAULT '',
            created_at       TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        "CREATE INDEX IF NOT EXISTS payment_records_meter_reading_id_idx
            ON payment_records (meter_reading_id)",
    ]
}
