//! Tiffin Order Engine
//!
//! The order engine owns the core of the food-ordering backend: the order aggregate and its status state machine,
//! the pure pricing engine, and the payment settlement flows that reconcile local orders against an external payment
//! gateway. It is transport-agnostic; the HTTP surface lives in the `tiffin_server` crate.
//!
//! The crate is divided into three main sections:
//! 1. Domain types and storage ([`mod@db_types`], [`mod@sqlite`]). SQLite is the supported backend. You should never
//!    need to access the database directly; use the flow APIs instead. The exception is the data types, which are
//!    defined in `db_types` and are public.
//! 2. The storage and collaborator traits ([`mod@traits`]). Backends implement these to drive the flow APIs, and
//!    tests substitute mocks at the same seams.
//! 3. The public flow APIs ([`mod@api`]): [`OrderFlowApi`] for the order lifecycle and [`PaymentFlowApi`] for
//!    payment intents, synchronous verification and webhook reconciliation.

pub mod api;
pub mod db_types;
pub mod helpers;
pub mod pricing;
pub mod traits;

mod sqlite;

pub use api::{
    errors::OrderFlowError,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_flow_api::PaymentFlowApi,
    payment_objects,
};
pub use sqlite::SqliteDatabase;
