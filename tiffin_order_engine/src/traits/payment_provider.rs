use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A client for the remote payment gateway.
///
/// Only one call is needed by the engine: creating an order-level payment intent. The customer completes the
/// payment out of band, and the results come back through the verification and webhook flows, so no other gateway
/// calls exist here. Implementations are expected to bound the request with a timeout and surface it as
/// [`GatewayError::Timeout`].
#[allow(async_fn_in_trait)]
pub trait PaymentProviderClient: Clone {
    async fn create_order_intent(&self, request: NewIntentRequest) -> Result<GatewayIntent, GatewayError>;
}

/// The data the gateway needs to create an intent. The amount is in minor units (paise) — the conversion happens
/// before this struct is built, and is exact-or-reject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIntentRequest {
    pub amount_minor: i64,
    pub currency: String,
    /// The order number, passed through as the gateway-side receipt reference.
    pub receipt: String,
    /// The internal order id, attached to the intent as an opaque note.
    pub order_ref: i64,
}

/// The gateway's answer: an opaque intent id the customer's client uses to complete payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayIntent {
    pub intent_id: String,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Payment gateway request failed: {0}")]
    Transport(String),
    #[error("Payment gateway request timed out")]
    Timeout,
    #[error("Payment gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}
