//! Point lookups into the catalogue tables.
//!
//! The catalogue is owned by other services; the engine only reads it, so this module is lookups only — no inserts
//! or updates exist on purpose.

use sqlx::SqliteConnection;

use crate::db_types::{Address, MenuItem, Restaurant, User};

pub async fn fetch_restaurant(
    restaurant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Restaurant>, sqlx::Error> {
    let restaurant = sqlx::query_as("SELECT id, name, is_open, minimum_order, delivery_fee FROM restaurants WHERE id = $1")
        .bind(restaurant_id)
        .fetch_optional(conn)
        .await?;
    Ok(restaurant)
}

pub async fn fetch_menu_item(
    menu_item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<MenuItem>, sqlx::Error> {
    let item =
        sqlx::query_as("SELECT id, restaurant_id, name, price, is_available FROM menu_items WHERE id = $1")
            .bind(menu_item_id)
            .fetch_optional(conn)
            .await?;
    Ok(item)
}

pub async fn fetch_address(address_id: i64, conn: &mut SqliteConnection) -> Result<Option<Address>, sqlx::Error> {
    let address =
        sqlx::query_as("SELECT id, customer_id, street, city, state, pincode FROM addresses WHERE id = $1")
            .bind(address_id)
            .fetch_optional(conn)
            .await?;
    Ok(address)
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT id, name, email, phone, role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}
