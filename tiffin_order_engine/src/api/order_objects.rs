use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiffin_common::Money;

use crate::db_types::{OrderLine, OrderNumber, OrderStatus, PaymentStatus};

//--------------------------------------   NewOrderRequest    ---------------------------------------------------------
/// A cart, as submitted by the (already authenticated) customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub restaurant_id: i64,
    pub delivery_address_id: i64,
    #[serde(default)]
    pub delivery_instructions: Option<String>,
    pub items: Vec<NewLineRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineRequest {
    pub menu_item_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub note: Option<String>,
}

//--------------------------------------      OrderView       ---------------------------------------------------------
/// The caller-facing rendering of an order: the aggregate plus the snapshots a client needs to display it, with the
/// delivery address flattened to a single string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: i64,
    pub order_number: OrderNumber,
    pub customer_id: i64,
    pub customer_name: String,
    pub restaurant_id: i64,
    pub restaurant_name: String,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub delivery_instructions: Option<String>,
    pub delivery_agent_id: Option<i64>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub actual_delivery_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub payment: Option<PaymentSummary>,
}

/// The slice of the payment worth showing on an order view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub id: i64,
    pub intent_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount: Money,
    pub status: PaymentStatus,
}

//--------------------------------------   OrderQueryFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub customer_id: Option<i64>,
    pub restaurant_id: Option<i64>,
    pub delivery_agent_id: Option<i64>,
    pub status: Option<Vec<OrderStatus>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_restaurant_id(mut self, restaurant_id: i64) -> Self {
        self.restaurant_id = Some(restaurant_id);
        self
    }

    pub fn with_delivery_agent_id(mut self, agent_id: i64) -> Self {
        self.delivery_agent_id = Some(agent_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() &&
            self.restaurant_id.is_none() &&
            self.delivery_agent_id.is_none() &&
            self.status.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(customer_id) = &self.customer_id {
            write!(f, "customer_id: {customer_id}. ")?;
        }
        if let Some(restaurant_id) = &self.restaurant_id {
            write!(f, "restaurant_id: {restaurant_id}. ")?;
        }
        if let Some(agent_id) = &self.delivery_agent_id {
            write!(f, "delivery_agent_id: {agent_id}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        Ok(())
    }
}
