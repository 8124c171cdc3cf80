use crate::{
    api::errors::OrderFlowError,
    db_types::{NewOrder, NewPayment, Order, OrderStatus, Payment},
    traits::{data_objects::SettlementOutcome, CatalogManagement, OrderManagement},
};

/// The mutation side of order and payment storage.
///
/// Every method is a single atomic unit of work: multi-row mutations run inside one database transaction, and every
/// status write is conditioned on the status the caller last read. There is no global lock anywhere — the
/// compare-and-swap discipline here, combined with the idempotent reconciliation flows built on top, is what keeps
/// the "`Placed` → `Confirmed` happens at most once" invariant under concurrent verification and webhook delivery.
#[allow(async_fn_in_trait)]
pub trait OrderFlowDatabase: Clone + OrderManagement + CatalogManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Persists a priced order and its lines in a single transaction, in `Placed` status.
    ///
    /// Nothing is written unless everything is: a failure on any line leaves no partial order behind.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;

    /// Compare-and-swap on the order status: the update only applies while the stored status still equals
    /// `expected`. Returns the updated order, or `None` when the row has moved on — the caller decides whether that
    /// is an error (an explicit status update) or a benign race (payment reconciliation).
    ///
    /// A transition into `Delivered` stamps the actual delivery time in the same statement.
    async fn update_order_status_checked(
        &self,
        order_id: i64,
        expected: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<Option<Order>, OrderFlowError>;

    /// Records the delivery agent on the order. Role checks live in the flow API; this is a plain column update.
    async fn set_delivery_agent(&self, order_id: i64, agent_id: i64) -> Result<Order, OrderFlowError>;

    /// Whether a `Success` payment already governs this order.
    async fn success_payment_exists(&self, order_id: i64) -> Result<bool, OrderFlowError>;

    /// Inserts the payment row for the order, or supersedes an existing `Created`/`Failed` row in place with the
    /// fresh intent. A `Success` row is never overwritten; attempting to do so fails with
    /// [`OrderFlowError::AlreadyPaid`].
    async fn supersede_payment(&self, payment: NewPayment) -> Result<Payment, OrderFlowError>;

    /// Settles a payment as successful, in one transaction:
    /// * the payment is marked `Success` and the gateway payment id recorded, unless it is `Success` already
    ///   (a replay, reported via [`SettlementOutcome::payment_updated`]);
    /// * the owning order is moved `Placed` → `Confirmed` under compare-and-swap. Losing that race to the other
    ///   reconciliation path is not an error; the order is returned in whatever state it is in.
    async fn settle_payment_success(
        &self,
        intent_id: &str,
        gateway_payment_id: &str,
    ) -> Result<SettlementOutcome, OrderFlowError>;

    /// Marks a payment `Failed` with the given reason. Only a `Created` payment is touched; a payment that has
    /// already settled (either way) is left alone, and the second tuple element reports whether anything changed.
    async fn record_payment_failure(
        &self,
        intent_id: &str,
        reason: &str,
    ) -> Result<(Payment, bool), OrderFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}
