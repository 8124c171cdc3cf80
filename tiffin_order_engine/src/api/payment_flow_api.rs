use std::fmt::Debug;

use log::*;
use tiffin_common::CURRENCY_CODE;

use crate::{
    api::{
        errors::OrderFlowError,
        payment_objects::{
            GatewayConfig,
            PaymentIntentView,
            PaymentView,
            WebhookEvent,
            EVENT_PAYMENT_CAPTURED,
            EVENT_PAYMENT_FAILED,
        },
    },
    db_types::NewPayment,
    helpers::signatures,
    traits::{NewIntentRequest, OrderFlowDatabase, PaymentProviderClient},
};

/// `PaymentFlowApi` owns payment settlement: creating intents with the remote gateway, verifying the proof of
/// payment the customer's client submits, and reconciling the webhook events the gateway delivers independently.
///
/// The two reconciliation paths (synchronous verification and webhooks) converge on one invariant: a payment moves
/// to `Success` at most once, and that move drives the owning order `Placed` → `Confirmed` at most once. Each path
/// is idempotent on its own, so whichever arrives first wins and the other is a safe no-op.
pub struct PaymentFlowApi<B, G> {
    db: B,
    gateway: G,
    config: GatewayConfig,
}

impl<B, G> Debug for PaymentFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B, G> PaymentFlowApi<B, G> {
    pub fn new(db: B, gateway: G, config: GatewayConfig) -> Self {
        Self { db, gateway, config }
    }
}

impl<B, G> PaymentFlowApi<B, G>
where
    B: OrderFlowDatabase,
    G: PaymentProviderClient,
{
    /// Creates a payment intent for the order with the remote gateway and records the pending payment locally.
    ///
    /// The gateway call happens first; if it fails (or times out), no local state is written. Only after the
    /// gateway hands back an intent id is the payment row written, superseding any earlier `Created`/`Failed`
    /// attempt for the order. An order that already has a `Success` payment is refused up front — and the write
    /// itself re-checks, so two concurrent intent requests cannot double-charge.
    pub async fn create_payment_intent(&self, order_id: i64) -> Result<PaymentIntentView, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if self.db.success_payment_exists(order.id).await? {
            return Err(OrderFlowError::AlreadyPaid(order.id));
        }
        let customer =
            self.db.fetch_user(order.customer_id).await?.ok_or(OrderFlowError::UserNotFound(order.customer_id))?;
        let amount_minor = order.total.to_minor_units()?;
        let request = NewIntentRequest {
            amount_minor,
            currency: CURRENCY_CODE.to_string(),
            receipt: order.order_number.as_str().to_string(),
            order_ref: order.id,
        };
        let intent = self.gateway.create_order_intent(request).await?;
        let payment = self
            .db
            .supersede_payment(NewPayment {
                order_id: order.id,
                intent_id: intent.intent_id,
                amount: order.total,
                currency: CURRENCY_CODE.to_string(),
            })
            .await?;
        info!("💳️ Intent {} created for order {} ({})", payment.intent_id, order.order_number, payment.amount);
        Ok(PaymentIntentView {
            payment_id: payment.id,
            order_id: order.id,
            order_number: order.order_number,
            intent_id: payment.intent_id,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            key_id: self.config.key_id.clone(),
            customer_name: customer.name,
            customer_email: customer.email,
            customer_phone: customer.phone,
        })
    }

    /// Verifies a client-submitted proof of payment.
    ///
    /// A valid signature settles the payment and confirms the order (if it is still `Placed` — the webhook may have
    /// beaten us to it, which is fine). An invalid signature is not silently dropped: the payment is marked
    /// `Failed` with the reason recorded, so forged or garbled proofs leave an audit trail, and the caller gets an
    /// opaque verification error.
    pub async fn verify_payment(
        &self,
        intent_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<PaymentView, OrderFlowError> {
        let payment = self
            .db
            .fetch_payment_by_intent_id(intent_id)
            .await?
            .ok_or_else(|| OrderFlowError::PaymentNotFound(intent_id.to_string()))?;
        let valid =
            signatures::verify_payment_signature(self.config.key_secret.reveal(), intent_id, gateway_payment_id, signature);
        if !valid {
            let (failed, recorded) = self.db.record_payment_failure(intent_id, "signature verification failed").await?;
            if recorded {
                warn!("💳️ Signature check failed for intent {intent_id}; payment #{} recorded as failed", failed.id);
            } else {
                warn!(
                    "💳️ Signature check failed for intent {intent_id}; payment #{} is already {} and was left alone",
                    failed.id, failed.status
                );
            }
            return Err(OrderFlowError::VerificationFailed);
        }
        let outcome = self.db.settle_payment_success(intent_id, gateway_payment_id).await?;
        if outcome.payment_updated {
            info!(
                "💳️ Payment #{} verified for intent {intent_id}; order {} is {}",
                outcome.payment.id, outcome.order.order_number, outcome.order.status
            );
        } else {
            debug!("💳️ Intent {intent_id} was already settled ({}); verification is a no-op", payment.status);
        }
        Ok(outcome.payment.into())
    }

    /// Applies a webhook delivery from the gateway.
    ///
    /// The signature covers the raw body and is checked before anything is parsed. Deliveries for intents this
    /// system does not know are acknowledged as no-ops rather than errors (the gateway multiplexes events from
    /// other consumers onto the same endpoint). The gateway delivers at least once, so both event applications are
    /// conditional updates that replay to nothing.
    pub async fn handle_webhook(&self, raw_body: &[u8], signature_header: &str) -> Result<(), OrderFlowError> {
        if !signatures::verify_webhook_signature(self.config.webhook_secret.reveal(), raw_body, signature_header) {
            warn!("🔔️ Webhook delivery rejected: signature mismatch");
            return Err(OrderFlowError::InvalidWebhookSignature);
        }
        let event: WebhookEvent =
            serde_json::from_slice(raw_body).map_err(|e| OrderFlowError::WebhookPayload(e.to_string()))?;
        let entity = &event.payload.payment.entity;
        if self.db.fetch_payment_by_intent_id(&entity.order_id).await?.is_none() {
            debug!("🔔️ Webhook for unknown intent {}; not ours, ignoring", entity.order_id);
            return Ok(());
        }
        match event.event.as_str() {
            EVENT_PAYMENT_CAPTURED => {
                let outcome = self.db.settle_payment_success(&entity.order_id, &entity.id).await?;
                if outcome.payment_updated {
                    info!(
                        "🔔️ Intent {} captured; payment #{} settled, order {} is {}",
                        entity.order_id, outcome.payment.id, outcome.order.order_number, outcome.order.status
                    );
                } else {
                    debug!("🔔️ Intent {} already settled; replay ignored", entity.order_id);
                }
            },
            EVENT_PAYMENT_FAILED => {
                let reason = entity.error_description.as_deref().unwrap_or("payment failed");
                let (payment, updated) = self.db.record_payment_failure(&entity.order_id, reason).await?;
                if updated {
                    info!("🔔️ Intent {} failed at the gateway: {reason}", entity.order_id);
                } else {
                    debug!("🔔️ Failure event for intent {} ignored; payment #{} is already {}",
                        entity.order_id, payment.id, payment.status);
                }
            },
            other => {
                debug!("🔔️ Ignoring webhook event type {other}");
            },
        }
        Ok(())
    }

    /// Read-side payment lookup for an order.
    pub async fn payment_for_order(&self, order_id: i64) -> Result<PaymentView, OrderFlowError> {
        let payment = self
            .db
            .fetch_payment_for_order(order_id)
            .await?
            .ok_or(OrderFlowError::PaymentNotFoundForOrder(order_id))?;
        Ok(payment.into())
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
