use thiserror::Error;
use tiffin_common::MoneyConversionError;

use crate::{
    db_types::{OrderNumber, OrderStatus, Role},
    pricing::PricingError,
    traits::GatewayError,
};

/// The error taxonomy of the order engine.
///
/// One enum spans storage, the order lifecycle and payment settlement, so that every public operation has a single
/// error channel and the server crate can translate each variant to exactly one HTTP status. Note that
/// [`OrderFlowError::VerificationFailed`] deliberately carries no detail: the caller of the verification endpoint
/// must not be able to distinguish a bad signature from a bad lookup.
#[derive(Debug, Error)]
pub enum OrderFlowError {
    #[error("Internal database error. {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderNumberNotFound(OrderNumber),
    #[error("The requested restaurant {0} does not exist")]
    RestaurantNotFound(i64),
    #[error("The requested menu item {0} does not exist")]
    MenuItemNotFound(i64),
    #[error("The requested address {0} does not exist")]
    AddressNotFound(i64),
    #[error("The requested user {0} does not exist")]
    UserNotFound(i64),
    #[error("No payment exists for intent {0}")]
    PaymentNotFound(String),
    #[error("No payment exists for order {0}")]
    PaymentNotFoundForOrder(i64),
    #[error("{0} is currently closed and not accepting orders")]
    RestaurantClosed(String),
    #[error("Item is not available: {0}")]
    ItemUnavailable(String),
    #[error("Item {item} does not belong to the selected restaurant")]
    CrossRestaurant { item: String, restaurant_id: i64 },
    #[error(transparent)]
    Validation(#[from] PricingError),
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order cannot be cancelled at this stage ({0})")]
    NonCancellable(OrderStatus),
    #[error("User {user_id} holds the {actual} role, not {expected}")]
    RoleMismatch { user_id: i64, expected: Role, actual: Role },
    #[error("Order is already {0}; a delivery agent can no longer be assigned")]
    OrderClosed(OrderStatus),
    #[error("Payment already completed for order {0}")]
    AlreadyPaid(i64),
    #[error("Order total cannot be settled through the gateway. {0}")]
    AmountNotRepresentable(#[from] MoneyConversionError),
    #[error("Payment verification failed")]
    VerificationFailed,
    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,
    #[error("Could not parse webhook payload. {0}")]
    WebhookPayload(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}
