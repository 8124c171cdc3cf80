pub mod signatures;

use chrono::Utc;
use rand::Rng;

use crate::db_types::OrderNumber;

/// Generates a fresh order number, e.g. `ORD-1722437100123-4821`.
///
/// The millisecond timestamp keeps numbers roughly sortable; the random suffix covers two orders landing in the
/// same millisecond. Uniqueness is ultimately enforced by the database constraint.
pub fn new_order_number() -> OrderNumber {
    let millis = Utc::now().timestamp_millis();
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    OrderNumber(format!("ORD-{millis}-{suffix:04}"))
}
