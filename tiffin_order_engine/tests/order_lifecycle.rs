mod support;

use std::str::FromStr;

use chrono::{Duration, Utc};
use tiffin_common::Money;
use tiffin_order_engine::{
    db_types::OrderStatus,
    order_objects::{NewLineRequest, NewOrderRequest, OrderView},
    OrderFlowApi,
    OrderFlowError,
    SqliteDatabase,
};

use crate::support::{force_status, order_count, prepare_test_env, random_db_url, seed_catalog, seed_user, Catalog};

async fn setup(prefix: &str) -> (OrderFlowApi<SqliteDatabase>, SqliteDatabase, Catalog) {
    let url = random_db_url(prefix);
    let db = prepare_test_env(&url).await;
    let catalog = seed_catalog(&db).await;
    (OrderFlowApi::new(db.clone()), db, catalog)
}

fn thali_cart(catalog: &Catalog, quantity: i64) -> NewOrderRequest {
    NewOrderRequest {
        restaurant_id: catalog.restaurant_id,
        delivery_address_id: catalog.address_id,
        delivery_instructions: Some("Ring the bell twice".to_string()),
        items: vec![NewLineRequest { menu_item_id: catalog.thali_id, quantity, note: None }],
    }
}

async fn place_order(api: &OrderFlowApi<SqliteDatabase>, catalog: &Catalog) -> OrderView {
    api.create_order(catalog.customer_id, thali_cart(catalog, 2)).await.expect("Error placing order")
}

#[tokio::test]
async fn create_order_prices_the_cart_and_places_it() {
    let (api, _db, catalog) = setup("create_order").await;
    let before = Utc::now();
    let order = place_order(&api, &catalog).await;

    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.subtotal, Money::from_rupees(598));
    assert_eq!(order.tax, Money::from_str("29.90").unwrap());
    assert_eq!(order.delivery_fee, Money::from_rupees(30));
    assert_eq!(order.total, Money::from_str("657.90").unwrap());
    assert_eq!(order.total, order.subtotal + order.tax + order.delivery_fee);
    assert_eq!(order.delivery_address, "12 MG Road, Bengaluru, Karnataka - 560001");
    assert!(order.order_number.as_str().starts_with("ORD-"));
    assert!(order.payment.is_none());

    assert_eq!(order.lines.len(), 1);
    let line = &order.lines[0];
    assert_eq!(line.quantity, 2);
    assert_eq!(line.unit_price, Money::from_rupees(299));
    assert_eq!(line.line_total, Money::from_rupees(598));
    assert_eq!(line.menu_item_name, "Paneer Thali");

    let eta = order.estimated_delivery_at - before;
    assert!(eta >= Duration::minutes(44) && eta <= Duration::minutes(46), "estimated delivery should be ~45 min out");
}

#[tokio::test]
async fn orders_can_be_fetched_by_id_and_number() {
    let (api, _db, catalog) = setup("fetch_order").await;
    let order = place_order(&api, &catalog).await;

    let by_id = api.order_by_id(order.id).await.expect("Error fetching by id");
    assert_eq!(by_id.order_number, order.order_number);
    let by_number = api.order_by_number(&order.order_number).await.expect("Error fetching by number");
    assert_eq!(by_number.id, order.id);

    let mine = api.orders_for_customer(catalog.customer_id).await.expect("Error listing customer orders");
    assert_eq!(mine.len(), 1);
    let theirs = api.orders_for_restaurant(catalog.restaurant_id).await.expect("Error listing restaurant orders");
    assert_eq!(theirs.len(), 1);
}

#[tokio::test]
async fn below_minimum_cart_fails_validation_and_persists_nothing() {
    let (api, db, catalog) = setup("below_minimum").await;
    // One ₹150 snack against a ₹200 minimum order.
    let snack_id = support::seed_menu_item(&db, catalog.restaurant_id, "Samosa Plate", "150", true).await;
    let request = NewOrderRequest {
        restaurant_id: catalog.restaurant_id,
        delivery_address_id: catalog.address_id,
        delivery_instructions: None,
        items: vec![NewLineRequest { menu_item_id: snack_id, quantity: 1, note: None }],
    };
    let err = api.create_order(catalog.customer_id, request).await.expect_err("Expected a validation error");
    assert!(matches!(err, OrderFlowError::Validation(_)), "got {err}");
    assert_eq!(order_count(&db).await, 0, "no partial order may be persisted");
}

#[tokio::test]
async fn non_positive_quantities_fail_validation() {
    let (api, db, catalog) = setup("bad_quantity").await;
    let err = api
        .create_order(catalog.customer_id, thali_cart(&catalog, 0))
        .await
        .expect_err("Expected a validation error");
    assert!(matches!(err, OrderFlowError::Validation(_)), "got {err}");
    assert_eq!(order_count(&db).await, 0);
}

#[tokio::test]
async fn carts_are_validated_against_the_catalogue() {
    let (api, db, catalog) = setup("catalogue_checks").await;

    let closed_id = support::seed_restaurant(&db, "Shut Shack", false, "0", "20").await;
    let request = NewOrderRequest { restaurant_id: closed_id, ..thali_cart(&catalog, 1) };
    let err = api.create_order(catalog.customer_id, request).await.expect_err("Expected closed-restaurant error");
    assert!(matches!(err, OrderFlowError::RestaurantClosed(_)), "got {err}");

    let err = api
        .create_order(catalog.customer_id, NewOrderRequest {
            items: vec![NewLineRequest { menu_item_id: 9_999, quantity: 1, note: None }],
            ..thali_cart(&catalog, 1)
        })
        .await
        .expect_err("Expected missing-item error");
    assert!(matches!(err, OrderFlowError::MenuItemNotFound(9_999)), "got {err}");

    let off_menu = support::seed_menu_item(&db, catalog.restaurant_id, "Seasonal Special", "250", false).await;
    let err = api
        .create_order(catalog.customer_id, NewOrderRequest {
            items: vec![NewLineRequest { menu_item_id: off_menu, quantity: 1, note: None }],
            ..thali_cart(&catalog, 1)
        })
        .await
        .expect_err("Expected unavailable-item error");
    assert!(matches!(err, OrderFlowError::ItemUnavailable(_)), "got {err}");

    let other_restaurant = support::seed_restaurant(&db, "Rival Kitchen", true, "0", "25").await;
    let foreign_item = support::seed_menu_item(&db, other_restaurant, "Rival Biryani", "320", true).await;
    let err = api
        .create_order(catalog.customer_id, NewOrderRequest {
            items: vec![NewLineRequest { menu_item_id: foreign_item, quantity: 1, note: None }],
            ..thali_cart(&catalog, 1)
        })
        .await
        .expect_err("Expected cross-restaurant error");
    assert!(matches!(err, OrderFlowError::CrossRestaurant { .. }), "got {err}");

    assert_eq!(order_count(&db).await, 0);
}

#[tokio::test]
async fn the_happy_path_walks_to_delivered() {
    let (api, _db, catalog) = setup("happy_path").await;
    let order = place_order(&api, &catalog).await;

    let order_id = order.id;
    for next in [OrderStatus::Confirmed, OrderStatus::Preparing, OrderStatus::OutForDelivery] {
        let view = api.update_status(order_id, next).await.expect("Legal transition failed");
        assert_eq!(view.status, next);
        assert!(view.actual_delivery_at.is_none());
    }
    let delivered = api.update_status(order_id, OrderStatus::Delivered).await.expect("Delivery failed");
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.actual_delivery_at.is_some(), "delivery must stamp the actual delivery time");
}

#[tokio::test]
async fn every_pair_outside_the_transition_table_is_rejected() {
    let (api, db, catalog) = setup("illegal_transitions").await;
    let order = place_order(&api, &catalog).await;

    for current in OrderStatus::ALL {
        for requested in OrderStatus::ALL {
            if current.can_transition_to(requested) {
                continue;
            }
            force_status(&db, order.id, &current.to_string()).await;
            let err = api
                .update_status(order.id, requested)
                .await
                .expect_err(&format!("{current} -> {requested} should be rejected"));
            assert!(matches!(err, OrderFlowError::InvalidTransition { .. }), "{current} -> {requested}: got {err}");
            let stored = api.order_by_id(order.id).await.expect("Error re-reading order");
            assert_eq!(stored.status, current, "a rejected transition must not change the stored status");
        }
    }
}

#[tokio::test]
async fn cancel_is_limited_to_placed_and_confirmed() {
    let (api, db, catalog) = setup("cancel").await;
    let order = place_order(&api, &catalog).await;

    for blocked in [OrderStatus::Preparing, OrderStatus::OutForDelivery, OrderStatus::Delivered, OrderStatus::Cancelled]
    {
        force_status(&db, order.id, &blocked.to_string()).await;
        let err = api.cancel(order.id).await.expect_err(&format!("cancel from {blocked} should fail"));
        assert!(matches!(err, OrderFlowError::NonCancellable(_)), "got {err}");
        assert_eq!(api.order_by_id(order.id).await.unwrap().status, blocked);
    }

    force_status(&db, order.id, "Confirmed").await;
    let cancelled = api.cancel(order.id).await.expect("cancel from Confirmed should succeed");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let second = place_order(&api, &catalog).await;
    let cancelled = api.cancel(second.id).await.expect("cancel from Placed should succeed");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
}

#[tokio::test]
async fn delivery_agent_assignment_checks_the_role() {
    let (api, db, catalog) = setup("assign_agent").await;
    let order = place_order(&api, &catalog).await;

    let imposter = seed_user(&db, "Vikram Shah", "Customer").await;
    let err = api.assign_delivery_agent(order.id, imposter).await.expect_err("Expected role mismatch");
    assert!(matches!(err, OrderFlowError::RoleMismatch { .. }), "got {err}");

    let agent = seed_user(&db, "Ravi Kumar", "DeliveryAgent").await;
    let view = api.assign_delivery_agent(order.id, agent).await.expect("Error assigning agent");
    assert_eq!(view.delivery_agent_id, Some(agent));

    force_status(&db, order.id, "Delivered").await;
    let err = api.assign_delivery_agent(order.id, agent).await.expect_err("Expected terminal-order rejection");
    assert!(matches!(err, OrderFlowError::OrderClosed(_)), "got {err}");
}
