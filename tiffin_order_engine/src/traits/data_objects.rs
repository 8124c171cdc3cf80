use crate::db_types::{Order, Payment};

/// The result of [`crate::traits::OrderFlowDatabase::settle_payment_success`].
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    /// The payment after settlement. Always `Success`.
    pub payment: Payment,
    /// False when the payment was already `Success` and this settlement was a replay.
    pub payment_updated: bool,
    /// The owning order after settlement. `Confirmed` if this call (or an earlier reconciliation) won the
    /// `Placed` → `Confirmed` race; otherwise whatever state the order had advanced to.
    pub order: Order,
}
