use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::json;
use tiffin_common::{Money, Secret};
use tiffin_order_engine::{
    db_types::{Order, OrderNumber, OrderStatus, Payment, PaymentStatus},
    helpers::signatures::hmac_sha256_hex,
    payment_objects::GatewayConfig,
    traits::GatewayError,
    PaymentFlowApi,
};

use crate::endpoint_tests::{
    helpers::{get_request, post_json, post_raw},
    mocks::{MockBackend, MockGateway},
};
use crate::helpers::WEBHOOK_SIGNATURE_HEADER;
use crate::routes::{CreatePaymentIntentRoute, PaymentForOrderRoute, PaymentWebhookRoute, VerifyPaymentRoute};

const WEBHOOK_SECRET: &str = "test-hook-secret";

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        key_id: "key_test_tiffin".to_string(),
        key_secret: Secret::new("test-key-secret".to_string()),
        webhook_secret: Secret::new(WEBHOOK_SECRET.to_string()),
    }
}

fn sample_order() -> Order {
    Order {
        id: 1,
        order_number: OrderNumber("ORD-1720612800000-0042".into()),
        customer_id: 7,
        restaurant_id: 3,
        delivery_address_id: 11,
        delivery_instructions: None,
        status: OrderStatus::Placed,
        subtotal: Money::from_rupees(598),
        tax: "29.90".parse().unwrap(),
        delivery_fee: Money::from_rupees(30),
        total: "657.90".parse().unwrap(),
        delivery_agent_id: None,
        estimated_delivery_at: Utc.with_ymd_and_hms(2024, 7, 10, 12, 45, 0).unwrap(),
        actual_delivery_at: None,
        created_at: Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap(),
    }
}

fn sample_payment(status: PaymentStatus) -> Payment {
    Payment {
        id: 1,
        order_id: 1,
        intent_id: "intent_1".to_string(),
        gateway_payment_id: None,
        amount: "657.90".parse().unwrap(),
        currency: "INR".to_string(),
        status,
        failure_reason: None,
        created_at: Utc.with_ymd_and_hms(2024, 7, 10, 12, 1, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 7, 10, 12, 1, 0).unwrap(),
    }
}

fn configure_payments(backend: MockBackend, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = PaymentFlowApi::new(backend, gateway, gateway_config());
        cfg.service(CreatePaymentIntentRoute::<MockBackend, MockGateway>::new())
            .service(VerifyPaymentRoute::<MockBackend, MockGateway>::new())
            .service(PaymentForOrderRoute::<MockBackend, MockGateway>::new())
            .service(PaymentWebhookRoute::<MockBackend, MockGateway>::new())
            .app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn unknown_intents_and_forged_signatures_are_indistinguishable() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "intent_id": "intent_1", "gateway_payment_id": "pay_1", "signature": "deadbeef" });

    // Case 1: the intent id does not exist at all.
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_intent_id().returning(|_| Ok(None));
    let (unknown_status, unknown_body) =
        post_json("/payments/verify", None, body.clone(), configure_payments(backend, MockGateway::new())).await;

    // Case 2: the intent exists but the proof is forged.
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_intent_id().returning(|_| Ok(Some(sample_payment(PaymentStatus::Created))));
    backend.expect_record_payment_failure().returning(|_, reason| {
        let mut payment = sample_payment(PaymentStatus::Failed);
        payment.failure_reason = Some(reason.to_string());
        Ok((payment, true))
    });
    let (forged_status, forged_body) =
        post_json("/payments/verify", None, body, configure_payments(backend, MockGateway::new())).await;

    assert_eq!(unknown_status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(forged_status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(unknown_body, forged_body, "the endpoint must not reveal which check failed");
}

#[actix_web::test]
async fn webhooks_with_bad_signatures_are_forbidden() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_1", "order_id": "intent_1" } } }
    })
    .to_string();

    let (status, _) = post_raw(
        "/payments/webhook",
        vec![(WEBHOOK_SIGNATURE_HEADER, "0000".to_string())],
        body.clone(),
        configure_payments(MockBackend::new(), MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A missing header answers the same way.
    let (status, _) =
        post_raw("/payments/webhook", vec![], body, configure_payments(MockBackend::new(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn webhooks_for_unknown_intents_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": "pay_1", "order_id": "some_other_system" } } }
    })
    .to_string();
    let signature = hmac_sha256_hex(WEBHOOK_SECRET, body.as_bytes());

    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_intent_id().returning(|_| Ok(None));
    let (status, body) = post_raw(
        "/payments/webhook",
        vec![(WEBHOOK_SIGNATURE_HEADER, signature)],
        body,
        configure_payments(backend, MockGateway::new()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Webhook processed"), "got {body}");
}

#[actix_web::test]
async fn intent_creation_for_a_missing_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(None));

    let (status, _) =
        post_json("/payments/create/42", None, json!({}), configure_payments(backend, MockGateway::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn a_second_charge_attempt_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(sample_order())));
    backend.expect_success_payment_exists().returning(|_| Ok(true));

    let (status, body) =
        post_json("/payments/create/1", None, json!({}), configure_payments(backend, MockGateway::new())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already completed"), "got {body}");
}

#[actix_web::test]
async fn a_gateway_outage_is_service_unavailable() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(sample_order())));
    backend.expect_success_payment_exists().returning(|_| Ok(false));
    backend.expect_fetch_user().returning(|id| {
        Ok(Some(tiffin_order_engine::db_types::User {
            id,
            name: "Asha Rao".to_string(),
            email: "asha@example.in".to_string(),
            phone: None,
            role: tiffin_order_engine::db_types::Role::Customer,
        }))
    });
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_order_intent()
        .returning(|_| Err(GatewayError::Transport("connection refused".to_string())));

    let (status, _) = post_json("/payments/create/1", None, json!({}), configure_payments(backend, gateway)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn the_payment_for_an_order_can_be_fetched() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_for_order().returning(|_| Ok(Some(sample_payment(PaymentStatus::Success))));

    let (status, body) =
        get_request("/payments/order/1", None, configure_payments(backend, MockGateway::new())).await;
    assert_eq!(status, StatusCode::OK);
    let view: serde_json::Value = serde_json::from_str(&body).expect("Body was not JSON");
    assert_eq!(view["intent_id"], "intent_1");
    assert_eq!(view["status"], "Success");
}
