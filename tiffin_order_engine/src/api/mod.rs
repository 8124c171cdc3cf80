//! The public API of the order engine.
//!
//! [`order_flow_api::OrderFlowApi`] owns the order lifecycle: creation, queries, status transitions, cancellation
//! and delivery-agent assignment. [`payment_flow_api::PaymentFlowApi`] owns settlement: intent creation against the
//! remote gateway, synchronous proof verification, and idempotent webhook reconciliation.

pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_flow_api;
pub mod payment_objects;
