mod support;

use std::str::FromStr;

use tiffin_common::{Money, Secret};
use tiffin_order_engine::{
    db_types::{OrderStatus, PaymentStatus},
    helpers::signatures::hmac_sha256_hex,
    order_objects::{NewLineRequest, NewOrderRequest, OrderView},
    payment_objects::GatewayConfig,
    traits::{GatewayError, GatewayIntent, NewIntentRequest, OrderManagement, PaymentProviderClient},
    OrderFlowApi,
    OrderFlowError,
    PaymentFlowApi,
    SqliteDatabase,
};

use crate::support::{payment_count, prepare_test_env, random_db_url, seed_catalog, Catalog};

const KEY_ID: &str = "key_test_tiffin";
const KEY_SECRET: &str = "tiffin-key-secret";
const WEBHOOK_SECRET: &str = "tiffin-hook-secret";

/// A gateway stub that hands out a fixed intent id, or fails like a dead upstream.
#[derive(Clone)]
struct StaticGateway {
    intent_id: String,
    fail: bool,
}

impl StaticGateway {
    fn returning(intent_id: &str) -> Self {
        Self { intent_id: intent_id.to_string(), fail: false }
    }

    fn broken() -> Self {
        Self { intent_id: String::new(), fail: true }
    }
}

impl PaymentProviderClient for StaticGateway {
    async fn create_order_intent(&self, _request: NewIntentRequest) -> Result<GatewayIntent, GatewayError> {
        if self.fail {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        Ok(GatewayIntent { intent_id: self.intent_id.clone() })
    }
}

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        key_id: KEY_ID.to_string(),
        key_secret: Secret::new(KEY_SECRET.to_string()),
        webhook_secret: Secret::new(WEBHOOK_SECRET.to_string()),
    }
}

async fn setup(
    prefix: &str,
    gateway: StaticGateway,
) -> (OrderFlowApi<SqliteDatabase>, PaymentFlowApi<SqliteDatabase, StaticGateway>, SqliteDatabase, Catalog) {
    let url = random_db_url(prefix);
    let db = prepare_test_env(&url).await;
    let catalog = seed_catalog(&db).await;
    let orders = OrderFlowApi::new(db.clone());
    let payments = PaymentFlowApi::new(db.clone(), gateway, gateway_config());
    (orders, payments, db, catalog)
}

async fn place_order(api: &OrderFlowApi<SqliteDatabase>, catalog: &Catalog) -> OrderView {
    let request = NewOrderRequest {
        restaurant_id: catalog.restaurant_id,
        delivery_address_id: catalog.address_id,
        delivery_instructions: None,
        items: vec![NewLineRequest { menu_item_id: catalog.thali_id, quantity: 2, note: None }],
    };
    api.create_order(catalog.customer_id, request).await.expect("Error placing order")
}

fn proof_signature(intent_id: &str, gateway_payment_id: &str) -> String {
    hmac_sha256_hex(KEY_SECRET, format!("{intent_id}|{gateway_payment_id}").as_bytes())
}

fn captured_event(intent_id: &str, gateway_payment_id: &str) -> (String, String) {
    let body = serde_json::json!({
        "event": "payment.captured",
        "payload": { "payment": { "entity": { "id": gateway_payment_id, "order_id": intent_id } } }
    })
    .to_string();
    let signature = hmac_sha256_hex(WEBHOOK_SECRET, body.as_bytes());
    (body, signature)
}

fn failed_event(intent_id: &str, reason: &str) -> (String, String) {
    let body = serde_json::json!({
        "event": "payment.failed",
        "payload": { "payment": { "entity": { "id": "pay_na", "order_id": intent_id, "error_description": reason } } }
    })
    .to_string();
    let signature = hmac_sha256_hex(WEBHOOK_SECRET, body.as_bytes());
    (body, signature)
}

#[tokio::test]
async fn intent_creation_returns_the_public_view_only() {
    let (orders, payments, _db, catalog) = setup("intent_view", StaticGateway::returning("intent_1")).await;
    let order = place_order(&orders, &catalog).await;

    let view = payments.create_payment_intent(order.id).await.expect("Error creating intent");
    assert_eq!(view.intent_id, "intent_1");
    assert_eq!(view.order_number, order.order_number);
    assert_eq!(view.amount, Money::from_str("657.90").unwrap());
    assert_eq!(view.currency, "INR");
    assert_eq!(view.status, PaymentStatus::Created);
    assert_eq!(view.key_id, KEY_ID, "the public key id is part of the view");
    assert_eq!(view.customer_name, "Asha Rao");
}

#[tokio::test]
async fn a_gateway_failure_persists_no_payment() {
    let (orders, payments, db, catalog) = setup("gateway_down", StaticGateway::broken()).await;
    let order = place_order(&orders, &catalog).await;

    let err = payments.create_payment_intent(order.id).await.expect_err("Expected a gateway error");
    assert!(matches!(err, OrderFlowError::Gateway(_)), "got {err}");
    assert_eq!(payment_count(&db).await, 0, "no partial payment state after a gateway failure");
}

#[tokio::test]
async fn a_valid_proof_settles_the_payment_and_confirms_the_order() {
    let (orders, payments, db, catalog) = setup("verify_ok", StaticGateway::returning("intent_2")).await;
    let order = place_order(&orders, &catalog).await;
    payments.create_payment_intent(order.id).await.expect("Error creating intent");

    let verified = payments
        .verify_payment("intent_2", "pay_77", &proof_signature("intent_2", "pay_77"))
        .await
        .expect("Verification should succeed");
    assert_eq!(verified.status, PaymentStatus::Success);
    assert_eq!(verified.gateway_payment_id.as_deref(), Some("pay_77"));

    let order = orders.order_by_id(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);

    // The payment amount is untouched by verification.
    let stored = db.fetch_payment_by_intent_id("intent_2").await.unwrap().unwrap();
    assert_eq!(stored.amount, Money::from_str("657.90").unwrap());
    assert_eq!(stored.currency, "INR");
}

#[tokio::test]
async fn a_forged_proof_is_recorded_and_never_confirms_the_order() {
    let (orders, payments, db, catalog) = setup("verify_forged", StaticGateway::returning("intent_3")).await;
    let order = place_order(&orders, &catalog).await;
    payments.create_payment_intent(order.id).await.expect("Error creating intent");

    let err = payments
        .verify_payment("intent_3", "pay_88", "deadbeef")
        .await
        .expect_err("A forged signature must fail verification");
    assert!(matches!(err, OrderFlowError::VerificationFailed), "got {err}");

    let stored = db.fetch_payment_by_intent_id("intent_3").await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some("signature verification failed"));
    assert!(stored.gateway_payment_id.is_none());

    let order = orders.order_by_id(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Placed, "a forged proof must never advance the order");
}

#[tokio::test]
async fn verify_then_webhook_confirms_exactly_once() {
    let (orders, payments, db, catalog) = setup("verify_then_hook", StaticGateway::returning("intent_4")).await;
    let order = place_order(&orders, &catalog).await;
    payments.create_payment_intent(order.id).await.expect("Error creating intent");

    payments
        .verify_payment("intent_4", "pay_4", &proof_signature("intent_4", "pay_4"))
        .await
        .expect("Verification should succeed");

    let (body, signature) = captured_event("intent_4", "pay_4");
    payments.handle_webhook(body.as_bytes(), &signature).await.expect("Webhook replay should be accepted");

    let stored = db.fetch_payment_by_intent_id("intent_4").await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Success);
    let order = orders.order_by_id(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn webhook_then_verify_confirms_exactly_once() {
    let (orders, payments, db, catalog) = setup("hook_then_verify", StaticGateway::returning("intent_5")).await;
    let order = place_order(&orders, &catalog).await;
    payments.create_payment_intent(order.id).await.expect("Error creating intent");

    let (body, signature) = captured_event("intent_5", "pay_5");
    payments.handle_webhook(body.as_bytes(), &signature).await.expect("Webhook should be accepted");
    let confirmed = orders.order_by_id(order.id).await.unwrap();
    assert_eq!(confirmed.status, OrderStatus::Confirmed);

    // The synchronous path arriving second is a benign race, not a failure.
    let verified = payments
        .verify_payment("intent_5", "pay_5", &proof_signature("intent_5", "pay_5"))
        .await
        .expect("Late verification should still succeed");
    assert_eq!(verified.status, PaymentStatus::Success);

    // Replaying the webhook once more changes nothing either.
    payments.handle_webhook(body.as_bytes(), &signature).await.expect("Replay should be accepted");
    let stored = db.fetch_payment_by_intent_id("intent_5").await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Success);
    assert_eq!(stored.gateway_payment_id.as_deref(), Some("pay_5"));
    assert_eq!(orders.order_by_id(order.id).await.unwrap().status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn webhook_signature_is_checked_against_the_raw_body() {
    let (orders, payments, db, catalog) = setup("hook_forged", StaticGateway::returning("intent_6")).await;
    let order = place_order(&orders, &catalog).await;
    payments.create_payment_intent(order.id).await.expect("Error creating intent");

    let (body, _) = captured_event("intent_6", "pay_6");
    let err = payments
        .handle_webhook(body.as_bytes(), "0000000000000000")
        .await
        .expect_err("A bad webhook signature must be rejected");
    assert!(matches!(err, OrderFlowError::InvalidWebhookSignature), "got {err}");

    let stored = db.fetch_payment_by_intent_id("intent_6").await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Created, "a rejected webhook must not touch the payment");
    assert_eq!(orders.order_by_id(order.id).await.unwrap().status, OrderStatus::Placed);
}

#[tokio::test]
async fn webhooks_for_unknown_intents_are_acknowledged_and_ignored() {
    let (_orders, payments, db, _catalog) = setup("hook_unknown", StaticGateway::returning("intent_7")).await;
    let (body, signature) = captured_event("intent_from_some_other_system", "pay_x");
    payments.handle_webhook(body.as_bytes(), &signature).await.expect("Unknown intents are a no-op");
    assert_eq!(payment_count(&db).await, 0);
}

#[tokio::test]
async fn failure_events_record_the_gateway_reason_idempotently() {
    let (orders, payments, db, catalog) = setup("hook_failed", StaticGateway::returning("intent_8")).await;
    let order = place_order(&orders, &catalog).await;
    payments.create_payment_intent(order.id).await.expect("Error creating intent");

    let (body, signature) = failed_event("intent_8", "card declined");
    payments.handle_webhook(body.as_bytes(), &signature).await.expect("Failure event should be accepted");
    let stored = db.fetch_payment_by_intent_id("intent_8").await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some("card declined"));

    // Redelivery does not overwrite the recorded reason.
    let (body, signature) = failed_event("intent_8", "a different reason");
    payments.handle_webhook(body.as_bytes(), &signature).await.expect("Replay should be accepted");
    let stored = db.fetch_payment_by_intent_id("intent_8").await.unwrap().unwrap();
    assert_eq!(stored.failure_reason.as_deref(), Some("card declined"));
    assert_eq!(orders.order_by_id(order.id).await.unwrap().status, OrderStatus::Placed);
}

#[tokio::test]
async fn unrecognised_event_types_are_accepted_and_ignored() {
    let (orders, payments, db, catalog) = setup("hook_other", StaticGateway::returning("intent_9")).await;
    let order = place_order(&orders, &catalog).await;
    payments.create_payment_intent(order.id).await.expect("Error creating intent");

    let body = serde_json::json!({
        "event": "payment.authorized",
        "payload": { "payment": { "entity": { "id": "pay_9", "order_id": "intent_9" } } }
    })
    .to_string();
    let signature = hmac_sha256_hex(WEBHOOK_SECRET, body.as_bytes());
    payments.handle_webhook(body.as_bytes(), &signature).await.expect("Other events are accepted");

    let stored = db.fetch_payment_by_intent_id("intent_9").await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Created);
    assert_eq!(orders.order_by_id(order.id).await.unwrap().status, OrderStatus::Placed);
}

#[tokio::test]
async fn a_settled_order_cannot_be_charged_again() {
    let (orders, payments, db, catalog) = setup("already_paid", StaticGateway::returning("intent_10")).await;
    let order = place_order(&orders, &catalog).await;
    payments.create_payment_intent(order.id).await.expect("Error creating intent");
    payments
        .verify_payment("intent_10", "pay_10", &proof_signature("intent_10", "pay_10"))
        .await
        .expect("Verification should succeed");

    let err = payments.create_payment_intent(order.id).await.expect_err("Expected the double-charge guard");
    assert!(matches!(err, OrderFlowError::AlreadyPaid(_)), "got {err}");
    assert_eq!(payment_count(&db).await, 1, "no second payment row may appear");
}

#[tokio::test]
async fn a_failed_payment_is_superseded_by_a_fresh_intent() {
    let (orders, mut payments, db, catalog) = setup("supersede", StaticGateway::returning("intent_11")).await;
    let order = place_order(&orders, &catalog).await;
    payments.create_payment_intent(order.id).await.expect("Error creating intent");
    let err = payments.verify_payment("intent_11", "pay_11", "forged").await.expect_err("Forged proof must fail");
    assert!(matches!(err, OrderFlowError::VerificationFailed));

    // The customer retries; the failed row is superseded in place by the new intent.
    payments = PaymentFlowApi::new(db.clone(), StaticGateway::returning("intent_12"), gateway_config());
    let retried = payments.create_payment_intent(order.id).await.expect("Retry should be allowed");
    assert_eq!(retried.intent_id, "intent_12");
    assert_eq!(retried.status, PaymentStatus::Created);
    assert_eq!(payment_count(&db).await, 1, "one payment governs the order at any time");

    let stored = db.fetch_payment_for_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.intent_id, "intent_12");
    assert!(stored.failure_reason.is_none(), "the superseding intent starts clean");
}
