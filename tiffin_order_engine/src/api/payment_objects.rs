use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiffin_common::{Money, Secret};

use crate::db_types::{OrderNumber, PaymentStatus};

//--------------------------------------    GatewayConfig     ---------------------------------------------------------
/// The gateway credentials the settlement flows need.
///
/// The key id is public (clients embed it to open the gateway's checkout); the key secret signs the synchronous
/// proof of payment and the webhook secret signs webhook deliveries. Neither secret ever appears in a view or a log.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub webhook_secret: Secret<String>,
}

//--------------------------------------  PaymentIntentView   ---------------------------------------------------------
/// What the caller gets back after an intent is created: everything a client needs to complete payment out of band,
/// and nothing it must not have.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentView {
    pub payment_id: i64,
    pub order_id: i64,
    pub order_number: OrderNumber,
    pub intent_id: String,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    /// The gateway's public key id. The secret never leaves the server.
    pub key_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
}

//--------------------------------------     PaymentView      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentView {
    pub id: i64,
    pub order_id: i64,
    pub intent_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::db_types::Payment> for PaymentView {
    fn from(p: crate::db_types::Payment) -> Self {
        Self {
            id: p.id,
            order_id: p.order_id,
            intent_id: p.intent_id,
            gateway_payment_id: p.gateway_payment_id,
            amount: p.amount,
            currency: p.currency,
            status: p.status,
            failure_reason: p.failure_reason,
            created_at: p.created_at,
        }
    }
}

//--------------------------------------    Webhook events    ---------------------------------------------------------
// The shape the gateway posts. Only the fields the reconciler depends on are modelled; everything else in the
// delivery is ignored by serde.

pub const EVENT_PAYMENT_CAPTURED: &str = "payment.captured";
pub const EVENT_PAYMENT_FAILED: &str = "payment.failed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub payload: WebhookEventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventPayload {
    pub payment: WebhookPaymentWrapper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPaymentWrapper {
    pub entity: WebhookPaymentEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPaymentEntity {
    /// The gateway's payment id.
    pub id: String,
    /// The gateway's order-level intent id — the key the reconciler looks payments up by.
    pub order_id: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
