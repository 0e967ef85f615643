//! Client tests against a mock meter billing service.

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meter_billing_client::{
    ClientError, MeterBillingClient, MeterReading, PaymentInput, PaymentStatus, ReadingId,
    StatusChange,
};

fn reading(id: ReadingId) -> MeterReading {
    let now = Utc::now();
    MeterReading {
        id,
        unit_number: "C-3".into(),
        previous_reading: dec!(100),
        current_reading: dec!(150),
        units_consumed: dec!(50),
        price_per_unit: dec!(20),
        total_amount: dec!(1000),
        reading_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        due_date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        paid_amount: dec!(0),
        payment_status: PaymentStatus::Unpaid,
        version: 0,
        created_at: now,
        updated_at: now,
    }
}

fn error_body(code: &str, message: &str) -> serde_json::Value {
    json!({ "success": false, "error": { "code": code, "message": message } })
}

#[tokio::test]
async fn get_reading_decodes_row() {
    let server = MockServer::start().await;
    let id = ReadingId::generate();
    let expected = reading(id);

    Mock::given(method("GET"))
        .and(path(format!("/api/readings/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(&expected))
        .expect(1)
        .mount(&server)
        .await;

    let client = MeterBillingClient::new(server.uri()).unwrap();
    let fetched = client.get_reading(id).await.unwrap();

    assert_eq!(fetched.id, id);
    assert_eq!(fetched.total_amount, dec!(1000));
    assert_eq!(fetched.payment_status, PaymentStatus::Unpaid);
}

#[tokio::test]
async fn record_payment_sends_camel_case_body() {
    let server = MockServer::start().await;
    let id = ReadingId::generate();

    Mock::given(method("POST"))
        .and(path("/api/payments"))
        .and(body_json(json!({
            "meterReadingId": id.to_string(),
            "amount": 400.0,
            "paymentDate": "2024-05-10",
            "method": "cash",
            "notes": "",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": ReadingId::generate().to_string(),
            "meter_reading_id": id.to_string(),
            "amount": 400.0,
            "payment_date": "2024-05-10",
            "payment_method": "cash",
            "notes": "",
            "created_at": "2024-05-10T08:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = MeterBillingClient::new(server.uri()).unwrap();
    let record = client
        .record_payment(&PaymentInput {
            meter_reading_id: id,
            amount: dec!(400),
            payment_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            method: "cash".into(),
            notes: String::new(),
        })
        .await
        .unwrap();

    assert_eq!(record.amount, dec!(400));
    assert_eq!(record.meter_reading_id, id);
}

#[tokio::test]
async fn set_payment_status_uses_snake_case_fields() {
    let server = MockServer::start().await;
    let id = ReadingId::generate();
    let mut updated = reading(id);
    updated.paid_amount = dec!(250);
    updated.payment_status = PaymentStatus::Partial;

    Mock::given(method("PUT"))
        .and(path(format!("/api/readings/{id}/payment-status")))
        .and(body_json(json!({ "payment_status": "partial", "paid_amount": 250.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&updated))
        .expect(1)
        .mount(&server)
        .await;

    let client = MeterBillingClient::new(server.uri()).unwrap();
    let change = StatusChange::to(PaymentStatus::Partial).with_partial_amount(dec!(250));
    let result = client.set_payment_status(id, &change).await.unwrap();

    assert_eq!(result.paid_amount, dec!(250));
}

#[tokio::test]
async fn error_kinds_map_to_typed_errors() {
    let server = MockServer::start().await;
    let missing = ReadingId::generate();
    let busy = ReadingId::generate();

    Mock::given(method("GET"))
        .and(path(format!("/api/readings/{missing}")))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(error_body("not_found", "meter reading not found")),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/readings/{busy}")))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(error_body("conflict", "meter reading has payment records")),
        )
        .mount(&server)
        .await;

    let client = MeterBillingClient::new(server.uri()).unwrap();

    let err = client.get_reading(missing).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }));
    assert!(!err.is_retryable());

    let err = client.delete_reading(busy).await.unwrap_err();
    assert!(matches!(err, ClientError::Conflict { .. }));
}

#[tokio::test]
async fn unparsable_error_body_is_generic_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/readings"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = MeterBillingClient::new(server.uri()).unwrap();
    let err = client.list_readings().await.unwrap_err();

    match err {
        ClientError::Api { code, status, .. } => {
            assert_eq!(code, "unknown");
            assert_eq!(status, 502);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn delete_reading_accepts_success_body() {
    let server = MockServer::start().await;
    let id = ReadingId::generate();

    Mock::given(method("DELETE"))
        .and(path(format!("/api/readings/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = MeterBillingClient::new(server.uri()).unwrap();
    client.delete_reading(id).await.unwrap();
}

#[tokio::test]
async fn health_reports_service() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "service": "meter-billing",
            "version": "0.1.0",
        })))
        .mount(&server)
        .await;

    let client = MeterBillingClient::new(server.uri()).unwrap();
    let health = client.health().await.unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.service, "meter-billing");
}
