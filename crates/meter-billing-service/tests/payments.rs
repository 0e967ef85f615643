//! Payment and forced-status integration tests.

mod common;

use common::{assert_error_code, TestHarness};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use meter_billing_core::{MeterReading, PaymentRecord, PaymentStatus, ReadingId};

async fn payments_of(harness: &TestHarness, reading: &MeterReading) -> Vec<PaymentRecord> {
    let response = harness
        .server
        .get(&format!("/api/payments/{}", reading.id))
        .await;
    response.assert_status_ok();
    response.json()
}

// ============================================================================
// Record Payment
// ============================================================================

#[tokio::test]
async fn record_payment_returns_record() {
    let harness = TestHarness::new();
    let reading = harness.create_reading().await;

    let response = harness.pay(&reading, 400, "2024-05-10").await;

    response.assert_status_ok();
    let record: PaymentRecord = response.json();
    assert_eq!(record.meter_reading_id, reading.id);
    assert_eq!(record.amount, dec!(400));
    assert_eq!(record.payment_method, "cash");
    assert_eq!(record.payment_date.to_string(), "2024-05-10");
}

#[tokio::test]
async fn incremental_payments_settle_reading() {
    let harness = TestHarness::new();
    let reading = harness.create_reading().await;

    harness.pay(&reading, 400, "2024-05-10").await.assert_status_ok();
    let partial = harness.reading(&reading).await;
    assert_eq!(partial.paid_amount, dec!(400));
    assert_eq!(partial.payment_status, PaymentStatus::Partial);

    harness.pay(&reading, 600, "2024-05-20").await.assert_status_ok();
    let paid = harness.reading(&reading).await;
    assert_eq!(paid.paid_amount, dec!(1000));
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn payments_are_listed_newest_first() {
    let harness = TestHarness::new();
    let reading = harness.create_reading().await;
    harness.pay(&reading, 100, "2024-05-03").await.assert_status_ok();
    harness.pay(&reading, 300, "2024-05-12").await.assert_status_ok();
    harness.pay(&reading, 200, "2024-05-07").await.assert_status_ok();

    let amounts: Vec<_> = payments_of(&harness, &reading)
        .await
        .into_iter()
        .map(|p| p.amount)
        .collect();

    assert_eq!(amounts, [dec!(300), dec!(200), dec!(100)]);
}

#[tokio::test]
async fn payment_for_unknown_reading_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/api/payments")
        .json(&json!({
            "meterReadingId": ReadingId::generate().to_string(),
            "amount": 100,
            "paymentDate": "2024-05-10",
            "method": "cash",
        }))
        .await;

    response.assert_status_not_found();
    assert_error_code(&response, "not_found");
}

#[tokio::test]
async fn negative_payment_is_rejected() {
    let harness = TestHarness::new();
    let reading = harness.create_reading().await;

    let response = harness.pay(&reading, -50, "2024-05-10").await;

    response.assert_status_bad_request();
    assert_error_code(&response, "validation_error");
    assert!(payments_of(&harness, &reading).await.is_empty());
}

#[tokio::test]
async fn list_payments_of_unknown_reading_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/api/payments/{}", ReadingId::generate()))
        .await;

    response.assert_status_not_found();
}

// ============================================================================
// Forced Payment Status
// ============================================================================

#[tokio::test]
async fn forced_paid_books_synthetic_payment_once() {
    let harness = TestHarness::new();
    let reading = harness.create_reading().await;
    let path = format!("/api/readings/{}/payment-status", reading.id);

    for _ in 0..2 {
        let response = harness
            .server
            .put(&path)
            .json(&json!({ "payment_status": "paid" }))
            .await;
        response.assert_status_ok();
        let updated: MeterReading = response.json();
        assert_eq!(updated.paid_amount, dec!(1000));
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
    }

    let payments = payments_of(&harness, &reading).await;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].amount, dec!(1000));
    assert_eq!(payments[0].payment_method, "other");
    assert_eq!(payments[0].notes, "Status updated to paid by landlord");
}

#[tokio::test]
async fn forced_partial_corrects_downward_without_record() {
    let harness = TestHarness::new();
    let reading = harness.create_reading().await;
    harness.pay(&reading, 400, "2024-05-10").await.assert_status_ok();

    let response = harness
        .server
        .put(&format!("/api/readings/{}/payment-status", reading.id))
        .json(&json!({ "payment_status": "partial", "paid_amount": 250 }))
        .await;

    response.assert_status_ok();
    let updated: MeterReading = response.json();
    assert_eq!(updated.paid_amount, dec!(250));
    assert_eq!(updated.payment_status, PaymentStatus::Partial);

    let payments = payments_of(&harness, &reading).await;
    assert_eq!(payments.len(), 1);
    assert!(payments.iter().all(|p| p.amount >= Decimal::ZERO));
}

#[tokio::test]
async fn forced_partial_upward_books_difference() {
    let harness = TestHarness::new();
    let reading = harness.create_reading().await;
    harness.pay(&reading, 400, "2024-05-10").await.assert_status_ok();

    let response = harness
        .server
        .put(&format!("/api/readings/{}/payment-status", reading.id))
        .json(&json!({
            "payment_status": "partial",
            "paid_amount": 700,
            "payment_date": "2024-05-15",
            "notes": "cash handed over at the door",
        }))
        .await;

    response.assert_status_ok();

    let payments = payments_of(&harness, &reading).await;
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[0].amount, dec!(300));
    assert_eq!(payments[0].payment_date.to_string(), "2024-05-15");
    assert_eq!(payments[0].notes, "cash handed over at the door");
}

#[tokio::test]
async fn forced_unpaid_keeps_paid_amount() {
    let harness = TestHarness::new();
    let reading = harness.create_reading().await;
    harness.pay(&reading, 400, "2024-05-10").await.assert_status_ok();

    let updated: MeterReading = harness
        .server
        .put(&format!("/api/readings/{}/payment-status", reading.id))
        .json(&json!({ "payment_status": "unpaid" }))
        .await
        .json();

    assert_eq!(updated.payment_status, PaymentStatus::Unpaid);
    assert_eq!(updated.paid_amount, dec!(400));
}

#[tokio::test]
async fn forced_partial_out_of_range_is_rejected() {
    let harness = TestHarness::new();
    let reading = harness.create_reading().await;

    let response = harness
        .server
        .put(&format!("/api/readings/{}/payment-status", reading.id))
        .json(&json!({ "payment_status": "partial", "paid_amount": 1000 }))
        .await;

    response.assert_status_bad_request();
    assert_error_code(&response, "validation_error");
    assert_eq!(harness.reading(&reading).await, reading);
}

#[tokio::test]
async fn unknown_status_is_rejected() {
    let harness = TestHarness::new();
    let reading = harness.create_reading().await;

    let response = harness
        .server
        .put(&format!("/api/readings/{}/payment-status", reading.id))
        .json(&json!({ "payment_status": "refunded" }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn forced_status_on_unknown_reading_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .put(&format!("/api/readings/{}/payment-status", ReadingId::generate()))
        .json(&json!({ "payment_status": "paid" }))
        .await;

    response.assert_status_not_found();
}
