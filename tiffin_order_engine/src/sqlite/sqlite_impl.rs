//! `SqliteDatabase` is the concrete storage backend of the order engine.
//!
//! Unsurprisingly, it uses SQLite, and implements all the storage traits defined in the [`crate::traits`] module.

use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{catalog, db_url, new_pool, orders, payments};
use crate::{
    api::{errors::OrderFlowError, order_objects::OrderQueryFilter},
    db_types::{
        Address,
        MenuItem,
        NewOrder,
        NewPayment,
        Order,
        OrderLine,
        OrderNumber,
        OrderStatus,
        Payment,
        Restaurant,
        User,
    },
    traits::{CatalogManagement, OrderFlowDatabase, OrderManagement, SettlementOutcome},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object against the URL in `TIFFIN_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Run once at startup (or from test setup) before serving requests.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_lines_for_order(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let lines = orders::fetch_lines_for_order(order_id, &mut conn).await?;
        Ok(lines)
    }

    async fn fetch_lines_for_orders(&self, order_ids: &[i64]) -> Result<Vec<OrderLine>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let lines = orders::fetch_lines_for_orders(order_ids, &mut conn).await?;
        Ok(lines)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_payment_for_order(&self, order_id: i64) -> Result<Option<Payment>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_for_order(order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payment_by_intent_id(&self, intent_id: &str) -> Result<Option<Payment>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_intent_id(intent_id, &mut conn).await?;
        Ok(payment)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_restaurant(&self, restaurant_id: i64) -> Result<Option<Restaurant>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let restaurant = catalog::fetch_restaurant(restaurant_id, &mut conn).await?;
        Ok(restaurant)
    }

    async fn fetch_menu_item(&self, menu_item_id: i64) -> Result<Option<MenuItem>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let item = catalog::fetch_menu_item(menu_item_id, &mut conn).await?;
        Ok(item)
    }

    async fn fetch_address(&self, address_id: i64) -> Result<Option<Address>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let address = catalog::fetch_address(address_id, &mut conn).await?;
        Ok(address)
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let user = catalog::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }
}

impl OrderFlowDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let inserted = orders::insert_order(&order, &mut tx).await?;
        orders::insert_order_lines(inserted.id, &order.lines, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} persisted with {} lines", inserted.order_number, order.lines.len());
        Ok(inserted)
    }

    async fn update_order_status_checked(
        &self,
        order_id: i64,
        expected: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_status_checked(order_id, expected, new_status, &mut conn).await
    }

    async fn set_delivery_agent(&self, order_id: i64, agent_id: i64) -> Result<Order, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let updated = orders::set_delivery_agent(order_id, agent_id, &mut conn).await?;
        updated.ok_or(OrderFlowError::OrderNotFound(order_id))
    }

    async fn success_payment_exists(&self, order_id: i64) -> Result<bool, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let exists = payments::success_payment_exists(order_id, &mut conn).await?;
        Ok(exists)
    }

    async fn supersede_payment(&self, payment: NewPayment) -> Result<Payment, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let row = payments::supersede_payment(&payment, &mut conn).await?;
        row.ok_or(OrderFlowError::AlreadyPaid(payment.order_id))
    }

    async fn settle_payment_success(
        &self,
        intent_id: &str,
        gateway_payment_id: &str,
    ) -> Result<SettlementOutcome, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let (payment, payment_updated) =
            match payments::mark_payment_success(intent_id, gateway_payment_id, &mut tx).await? {
                Some(payment) => (payment, true),
                None => {
                    let payment = payments::fetch_payment_by_intent_id(intent_id, &mut tx)
                        .await?
                        .ok_or_else(|| OrderFlowError::PaymentNotFound(intent_id.to_string()))?;
                    (payment, false)
                },
            };
        // Drive the order to Confirmed, but only out of Placed. Losing this race to the other reconciliation path
        // just means the order is already where it needs to be.
        let order = match orders::update_status_checked(
            payment.order_id,
            OrderStatus::Placed,
            OrderStatus::Confirmed,
            &mut tx,
        )
        .await?
        {
            Some(order) => {
                debug!("🗃️ Order {} confirmed on settlement of intent {intent_id}", order.order_number);
                order
            },
            None => orders::fetch_order_by_id(payment.order_id, &mut tx)
                .await?
                .ok_or(OrderFlowError::OrderNotFound(payment.order_id))?,
        };
        tx.commit().await?;
        debug!("🗃️ Intent {intent_id} settled. Payment #{} is {}", payment.id, payment.status);
        Ok(SettlementOutcome { payment, payment_updated, order })
    }

    async fn record_payment_failure(
        &self,
        intent_id: &str,
        reason: &str,
    ) -> Result<(Payment, bool), OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        match payments::mark_payment_failed(intent_id, reason, &mut conn).await? {
            Some(payment) => {
                debug!("🗃️ Payment #{} marked as failed: {reason}", payment.id);
                Ok((payment, true))
            },
            None => {
                let payment = payments::fetch_payment_by_intent_id(intent_id, &mut conn)
                    .await?
                    .ok_or_else(|| OrderFlowError::PaymentNotFound(intent_id.to_string()))?;
                Ok((payment, false))
            },
        }
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}
