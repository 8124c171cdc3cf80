use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    api::{errors::OrderFlowError, order_objects::OrderQueryFilter},
    db_types::{NewOrder, NewOrderLine, Order, OrderLine, OrderNumber, OrderStatus},
};

/// Inserts a new order into the database using the given connection. This is not atomic on its own — the caller
/// wraps this and [`insert_order_lines`] in one transaction and passes `&mut *tx` as the connection argument.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderFlowError> {
    let inserted: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                customer_id,
                restaurant_id,
                delivery_address_id,
                delivery_instructions,
                status,
                subtotal,
                tax,
                delivery_fee,
                total,
                estimated_delivery_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(&order.order_number)
    .bind(order.customer_id)
    .bind(order.restaurant_id)
    .bind(order.delivery_address_id)
    .bind(&order.delivery_instructions)
    .bind(OrderStatus::Placed)
    .bind(order.subtotal)
    .bind(order.tax)
    .bind(order.delivery_fee)
    .bind(order.total)
    .bind(order.estimated_delivery_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order {} saved with id {}", inserted.order_number, inserted.id);
    Ok(inserted)
}

pub async fn insert_order_lines(
    order_id: i64,
    lines: &[NewOrderLine],
    conn: &mut SqliteConnection,
) -> Result<(), OrderFlowError> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, menu_item_id, menu_item_name, quantity, unit_price, line_total, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7);
        "#,
        )
        .bind(order_id)
        .bind(line.menu_item_id)
        .bind(&line.menu_item_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.line_total)
        .bind(&line.note)
        .execute(&mut *conn)
        .await?;
    }
    trace!("🗃️ {} lines saved for order id {order_id}", lines.len());
    Ok(())
}

pub async fn fetch_order_by_id(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_lines_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

/// Fetches the lines of several orders in one query.
pub async fn fetch_lines_for_orders(
    order_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLine>, sqlx::Error> {
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM order_lines WHERE order_id IN (");
    let mut ids = builder.separated(", ");
    for id in order_ids {
        ids.push_bind(*id);
    }
    builder.push(") ORDER BY order_id ASC, id ASC");
    let lines = builder.build_query_as::<OrderLine>().fetch_all(conn).await?;
    Ok(lines)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at`, newest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(customer_id) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(customer_id);
    }
    if let Some(restaurant_id) = query.restaurant_id {
        where_clause.push("restaurant_id = ");
        where_clause.push_bind_unseparated(restaurant_id);
    }
    if let Some(agent_id) = query.delivery_agent_id {
        where_clause.push("delivery_agent_id = ");
        where_clause.push_bind_unseparated(agent_id);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            query.status.as_ref().unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ search_orders returned {} rows", orders.len());
    Ok(orders)
}

/// The compare-and-swap status write. The row is only touched while its status still equals `expected`; `None`
/// means another writer got there first and the caller must re-read rather than overwrite. Moving into `Delivered`
/// stamps the actual delivery time in the same statement.
pub async fn update_status_checked(
    order_id: i64,
    expected: OrderStatus,
    new_status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let updated: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                actual_delivery_at = CASE WHEN $1 = 'Delivered' THEN CURRENT_TIMESTAMP ELSE actual_delivery_at END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(new_status)
    .bind(order_id)
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    if updated.is_none() {
        debug!("🗃️ Order id {order_id} is no longer '{expected}'; status update to '{new_status}' skipped");
    }
    Ok(updated)
}

pub async fn set_delivery_agent(
    order_id: i64,
    agent_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderFlowError> {
    let updated = sqlx::query_as(
        "UPDATE orders SET delivery_agent_id = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(agent_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(updated)
}
