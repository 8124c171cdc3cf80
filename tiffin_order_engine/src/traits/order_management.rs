use crate::{
    api::{errors::OrderFlowError, order_objects::OrderQueryFilter},
    db_types::{Order, OrderLine, OrderNumber, Payment},
};

/// The read side of order and payment storage.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError>;

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderFlowError>;

    async fn fetch_lines_for_order(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderFlowError>;

    /// Fetches the lines of several orders in one round trip, so that mapping a page of orders to views does not
    /// degenerate into a query per order.
    async fn fetch_lines_for_orders(&self, order_ids: &[i64]) -> Result<Vec<OrderLine>, OrderFlowError>;

    /// Fetches orders according to the criteria in the [`OrderQueryFilter`], newest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    async fn fetch_payment_for_order(&self, order_id: i64) -> Result<Option<Payment>, OrderFlowError>;

    async fn fetch_payment_by_intent_id(&self, intent_id: &str) -> Result<Option<Payment>, OrderFlowError>;
}
