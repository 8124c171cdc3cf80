use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use tiffin_common::Money;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------     OrderNumber      ---------------------------------------------------------
/// The human-facing order reference, e.g. `ORD-1722437100123-4821`. Unique across all orders, and the receipt value
/// handed to the payment gateway when an intent is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     OrderStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
pub enum OrderStatus {
    /// The order has been created and priced, but no payment has been confirmed.
    Placed,
    /// Payment has been confirmed and the restaurant can start on the order.
    Confirmed,
    /// The restaurant is preparing the order.
    Preparing,
    /// A delivery agent has picked the order up.
    OutForDelivery,
    /// The order reached the customer. Terminal.
    Delivered,
    /// The order was cancelled by the customer or an admin. Terminal.
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Placed,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// The transition table. Anything not listed here is an illegal transition.
    pub fn allowed_transitions(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Placed => &[Confirmed, Cancelled],
            Confirmed => &[Preparing, Cancelled],
            Preparing => &[OutForDelivery],
            OutForDelivery => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Cancellation is only reachable while the kitchen has not started, i.e. from `Placed` or `Confirmed`.
    pub fn is_cancellable(self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Placed => write!(f, "Placed"),
            OrderStatus::Confirmed => write!(f, "Confirmed"),
            OrderStatus::Preparing => write!(f, "Preparing"),
            OrderStatus::OutForDelivery => write!(f, "OutForDelivery"),
            OrderStatus::Delivered => write!(f, "Delivered"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Placed" => Ok(Self::Placed),
            "Confirmed" => Ok(Self::Confirmed),
            "Preparing" => Ok(Self::Preparing),
            "OutForDelivery" => Ok(Self::OutForDelivery),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
pub enum PaymentStatus {
    /// An intent has been created with the gateway, but no proof of payment has arrived yet.
    Created,
    /// The payment was verified, either synchronously or via webhook.
    Success,
    /// The payment failed, or a submitted proof did not verify.
    Failed,
    /// The payment was refunded after success. No transition logic targets this state; it exists for bookkeeping.
    Refunded,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Created)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Created => write!(f, "Created"),
            PaymentStatus::Success => write!(f, "Success"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "Success" => Ok(Self::Success),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------        Order         ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub delivery_address_id: i64,
    pub delivery_instructions: Option<String>,
    pub status: OrderStatus,
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub delivery_agent_id: Option<i64>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub actual_delivery_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder       ---------------------------------------------------------
/// A fully priced order, ready to be persisted in `Placed` status together with its lines.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub delivery_address_id: i64,
    pub delivery_instructions: Option<String>,
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub estimated_delivery_at: DateTime<Utc>,
    pub lines: Vec<NewOrderLine>,
}

//--------------------------------------      OrderLine       ---------------------------------------------------------
/// One catalogue item within an order. The name and unit price are snapshots taken at order time; later catalogue
/// edits never touch persisted lines.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub menu_item_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub menu_item_id: i64,
    pub menu_item_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    pub note: Option<String>,
}

//--------------------------------------       Payment        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    /// The order-level intent id assigned by the gateway. Unique.
    pub intent_id: String,
    /// The gateway's payment id. Only set once a proof of payment has been accepted.
    pub gateway_payment_id: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i64,
    pub intent_id: String,
    pub amount: Money,
    pub currency: String,
}

//--------------------------------------        Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
pub enum Role {
    Admin,
    Customer,
    RestaurantOwner,
    DeliveryAgent,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "Admin"),
            Role::Customer => write!(f, "Customer"),
            Role::RestaurantOwner => write!(f, "RestaurantOwner"),
            Role::DeliveryAgent => write!(f, "DeliveryAgent"),
        }
    }
}

//--------------------------------------  Catalogue snapshots ---------------------------------------------------------
// The catalogue (restaurants, menu items, addresses, users) is maintained elsewhere. The engine only ever reads
// immutable snapshots of it through the `CatalogManagement` trait.

#[derive(Debug, Clone, FromRow)]
pub struct Restaurant {
    pub id: i64,
    pub name: String,
    pub is_open: bool,
    pub minimum_order: Money,
    pub delivery_fee: Money,
}

#[derive(Debug, Clone, FromRow)]
pub struct MenuItem {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
    pub price: Money,
    pub is_available: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct Address {
    pub id: i64,
    pub customer_id: i64,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl Address {
    /// The single-line rendering stored on order views, so an order keeps displaying the address it was delivered
    /// to even if the customer edits the address book later.
    pub fn formatted(&self) -> String {
        format!("{}, {}, {} - {}", self.street, self.city, self.state, self.pincode)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transition_table_matches_the_lifecycle() {
        use OrderStatus::*;
        let expected: &[(OrderStatus, &[OrderStatus])] = &[
            (Placed, &[Confirmed, Cancelled]),
            (Confirmed, &[Preparing, Cancelled]),
            (Preparing, &[OutForDelivery]),
            (OutForDelivery, &[Delivered]),
            (Delivered, &[]),
            (Cancelled, &[]),
        ];
        for (current, allowed) in expected {
            assert_eq!(current.allowed_transitions(), *allowed, "transitions from {current}");
        }
    }

    #[test]
    fn every_pair_outside_the_table_is_rejected() {
        for current in OrderStatus::ALL {
            for next in OrderStatus::ALL {
                let allowed = current.allowed_transitions().contains(&next);
                assert_eq!(current.can_transition_to(next), allowed, "{current} -> {next}");
            }
        }
        // Spot checks on the pairs that tend to regress.
        assert!(!OrderStatus::Preparing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Placed));
        assert!(!OrderStatus::Placed.can_transition_to(OrderStatus::Placed));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::OutForDelivery.is_terminal());
    }

    #[test]
    fn only_placed_and_confirmed_are_cancellable() {
        let cancellable: Vec<_> = OrderStatus::ALL.into_iter().filter(|s| s.is_cancellable()).collect();
        assert_eq!(cancellable, vec![OrderStatus::Placed, OrderStatus::Confirmed]);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("NoSuchStatus".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn formatted_address_matches_the_postal_layout() {
        let address = Address {
            id: 1,
            customer_id: 7,
            street: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
        };
        assert_eq!(address.formatted(), "12 MG Road, Bengaluru, Karnataka - 560001");
    }
}
