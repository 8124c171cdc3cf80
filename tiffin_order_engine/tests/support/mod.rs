//! Shared scaffolding for the engine integration tests: a throwaway SQLite database per test, plus seeders for the
//! catalogue tables the engine treats as read-only collaborators.
#![allow(dead_code)] // each test binary uses its own subset of these helpers

use std::{fs, path::Path};

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tiffin_order_engine::SqliteDatabase;

pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    create_database(url).await;
    // A single-connection pool for the throwaway test database: this sandbox's filesystem does not provide working
    // WAL shared-memory across connections, so writes on one pooled connection are invisible to reads on another.
    // Keeping the whole test on one connection sidesteps that without touching engine behaviour.
    let db = SqliteDatabase::new_with_url(url, 1).await.expect("Error creating database");
    db.run_migrations().await.expect("Error running DB migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

pub fn random_db_url(prefix: &str) -> String {
    format!("sqlite://../data/test_{prefix}_{}.db", rand::random::<u64>())
}

async fn create_database(url: &str) {
    let path = url.trim_start_matches("sqlite://");
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent).ok();
    }
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
}

/// A small seeded world: one customer with an address, one open restaurant with a ₹200 minimum order and ₹30
/// delivery fee, and a ₹299 thali on the menu.
pub struct Catalog {
    pub customer_id: i64,
    pub restaurant_id: i64,
    pub address_id: i64,
    pub thali_id: i64,
}

pub async fn seed_catalog(db: &SqliteDatabase) -> Catalog {
    let customer_id = seed_user(db, "Asha Rao", "Customer").await;
    let restaurant_id = seed_restaurant(db, "Saffron House", true, "200", "30").await;
    let address_id = seed_address(db, customer_id).await;
    let thali_id = seed_menu_item(db, restaurant_id, "Paneer Thali", "299", true).await;
    Catalog { customer_id, restaurant_id, address_id, thali_id }
}

pub async fn seed_user(db: &SqliteDatabase, name: &str, role: &str) -> i64 {
    let email = format!("{}_{}@example.in", name.to_lowercase().replace(' ', "."), rand::random::<u32>());
    sqlx::query_scalar("INSERT INTO users (name, email, phone, role) VALUES ($1, $2, '9800000000', $3) RETURNING id")
        .bind(name)
        .bind(email)
        .bind(role)
        .fetch_one(db.pool())
        .await
        .expect("Error seeding user")
}

pub async fn seed_restaurant(db: &SqliteDatabase, name: &str, is_open: bool, minimum: &str, fee: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO restaurants (name, is_open, minimum_order, delivery_fee) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(is_open)
    .bind(minimum)
    .bind(fee)
    .fetch_one(db.pool())
    .await
    .expect("Error seeding restaurant")
}

pub async fn seed_menu_item(db: &SqliteDatabase, restaurant_id: i64, name: &str, price: &str, available: bool) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO menu_items (restaurant_id, name, price, is_available) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(restaurant_id)
    .bind(name)
    .bind(price)
    .bind(available)
    .fetch_one(db.pool())
    .await
    .expect("Error seeding menu item")
}

pub async fn seed_address(db: &SqliteDatabase, customer_id: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO addresses (customer_id, street, city, state, pincode) VALUES ($1, '12 MG Road', 'Bengaluru', \
         'Karnataka', '560001') RETURNING id",
    )
    .bind(customer_id)
    .fetch_one(db.pool())
    .await
    .expect("Error seeding address")
}

/// Puts an order directly into the given status, bypassing the state machine, so tests can start transitions from
/// anywhere.
pub async fn force_status(db: &SqliteDatabase, order_id: i64, status: &str) {
    sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(order_id)
        .execute(db.pool())
        .await
        .expect("Error forcing order status");
}

pub async fn order_count(db: &SqliteDatabase) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.expect("Error counting orders")
}

pub async fn payment_count(db: &SqliteDatabase) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM payments").fetch_one(db.pool()).await.expect("Error counting payments")
}
