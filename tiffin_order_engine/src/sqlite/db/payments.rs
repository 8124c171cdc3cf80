use log::debug;
use sqlx::SqliteConnection;

use crate::{
    api::errors::OrderFlowError,
    db_types::{NewPayment, Payment},
};

pub async fn fetch_payment_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_by_intent_id(
    intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE intent_id = $1").bind(intent_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn success_payment_exists(order_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_id = $1 AND status = 'Success'")
        .bind(order_id)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

/// Inserts the payment row for the order, or supersedes a prior attempt in place.
///
/// The upsert's WHERE clause is the double-charge guard: a `Success` row is never overwritten, in which case no row
/// comes back and `None` is returned. A `Created` or `Failed` row is refreshed with the new intent, cleared of any
/// earlier failure, and reset to `Created`.
pub async fn supersede_payment(
    payment: &NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, OrderFlowError> {
    let row: Option<Payment> = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, intent_id, amount, currency, status)
            VALUES ($1, $2, $3, $4, 'Created')
            ON CONFLICT (order_id) DO UPDATE SET
                intent_id = excluded.intent_id,
                gateway_payment_id = NULL,
                amount = excluded.amount,
                currency = excluded.currency,
                status = 'Created',
                failure_reason = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE payments.status != 'Success'
            RETURNING *;
        "#,
    )
    .bind(payment.order_id)
    .bind(&payment.intent_id)
    .bind(payment.amount)
    .bind(&payment.currency)
    .fetch_optional(conn)
    .await?;
    match &row {
        Some(p) => debug!("🗃️ Payment #{} ({}) now governs order id {}", p.id, p.intent_id, p.order_id),
        None => debug!("🗃️ Order id {} already has a successful payment; intent not recorded", payment.order_id),
    }
    Ok(row)
}

/// Marks the payment `Success` and records the gateway payment id, unless it is `Success` already. `None` means
/// the payment was already settled (or does not exist — the caller distinguishes via a follow-up fetch).
pub async fn mark_payment_success(
    intent_id: &str,
    gateway_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, OrderFlowError> {
    let updated: Option<Payment> = sqlx::query_as(
        r#"
            UPDATE payments SET
                status = 'Success',
                gateway_payment_id = $2,
                failure_reason = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE intent_id = $1 AND status != 'Success'
            RETURNING *;
        "#,
    )
    .bind(intent_id)
    .bind(gateway_payment_id)
    .fetch_optional(conn)
    .await?;
    Ok(updated)
}

/// Marks the payment `Failed` with the given reason. Only a still-`Created` payment is touched; settled payments
/// are left as they are and `None` is returned.
pub async fn mark_payment_failed(
    intent_id: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, OrderFlowError> {
    let updated: Option<Payment> = sqlx::query_as(
        r#"
            UPDATE payments SET
                status = 'Failed',
                failure_reason = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE intent_id = $1 AND status = 'Created'
            RETURNING *;
        "#,
    )
    .bind(intent_id)
    .bind(reason)
    .fetch_optional(conn)
    .await?;
    Ok(updated)
}
