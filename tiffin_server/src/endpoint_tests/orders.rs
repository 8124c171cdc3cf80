use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::json;
use tiffin_common::Money;
use tiffin_order_engine::{
    db_types::{Address, Order, OrderLine, OrderNumber, OrderStatus, Restaurant, Role, User},
    OrderFlowApi,
};

use crate::endpoint_tests::{
    helpers::{get_request, patch_json, post_json},
    mocks::MockBackend,
};
use crate::routes::{
    AssignDeliveryAgentRoute,
    CancelOrderRoute,
    CreateOrderRoute,
    MyOrdersRoute,
    OrderByIdRoute,
    UpdateOrderStatusRoute,
};

fn sample_order(status: OrderStatus) -> Order {
    Order {
        id: 1,
        order_number: OrderNumber("ORD-1720612800000-0042".into()),
        customer_id: 7,
        restaurant_id: 3,
        delivery_address_id: 11,
        delivery_instructions: None,
        status,
        subtotal: Money::from_rupees(598),
        tax: "29.90".parse().unwrap(),
        delivery_fee: Money::from_rupees(30),
        total: "657.90".parse().unwrap(),
        delivery_agent_id: None,
        estimated_delivery_at: Utc.with_ymd_and_hms(2024, 7, 10, 12, 45, 0).unwrap(),
        actual_delivery_at: None,
        created_at: Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap(),
    }
}

fn sample_line() -> OrderLine {
    OrderLine {
        id: 1,
        order_id: 1,
        menu_item_id: 21,
        menu_item_name: "Paneer Thali".to_string(),
        quantity: 2,
        unit_price: Money::from_rupees(299),
        line_total: Money::from_rupees(598),
        note: None,
    }
}

/// Wires up the mocks a successful view assembly needs on top of the per-test expectations.
fn expect_view_assembly(backend: &mut MockBackend) {
    backend.expect_fetch_lines_for_orders().returning(|_| Ok(vec![sample_line()]));
    backend.expect_fetch_restaurant().returning(|_| {
        Ok(Some(Restaurant {
            id: 3,
            name: "Saffron House".to_string(),
            is_open: true,
            minimum_order: Money::from_rupees(200),
            delivery_fee: Money::from_rupees(30),
        }))
    });
    backend.expect_fetch_user().returning(|id| {
        Ok(Some(User {
            id,
            name: "Asha Rao".to_string(),
            email: "asha@example.in".to_string(),
            phone: Some("9800000000".to_string()),
            role: Role::Customer,
        }))
    });
    backend.expect_fetch_address().returning(|id| {
        Ok(Some(Address {
            id,
            customer_id: 7,
            street: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
        }))
    });
    backend.expect_fetch_payment_for_order().returning(|_| Ok(None));
}

fn configure_orders(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = OrderFlowApi::new(backend);
        cfg.service(CreateOrderRoute::<MockBackend>::new())
            .service(MyOrdersRoute::<MockBackend>::new())
            .service(UpdateOrderStatusRoute::<MockBackend>::new())
            .service(CancelOrderRoute::<MockBackend>::new())
            .service(AssignDeliveryAgentRoute::<MockBackend>::new())
            .service(OrderByIdRoute::<MockBackend>::new())
            .app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn fetching_an_order_renders_the_view() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(sample_order(OrderStatus::Placed))));
    expect_view_assembly(&mut backend);

    let (status, body) = get_request("/orders/1", None, configure_orders(backend)).await;
    assert_eq!(status, StatusCode::OK);
    let view: serde_json::Value = serde_json::from_str(&body).expect("Body was not JSON");
    assert_eq!(view["order_number"], "ORD-1720612800000-0042");
    assert_eq!(view["restaurant_name"], "Saffron House");
    assert_eq!(view["delivery_address"], "12 MG Road, Bengaluru, Karnataka - 560001");
    assert_eq!(view["status"], "Placed");
    assert_eq!(view["lines"][0]["menu_item_name"], "Paneer Thali");
}

#[actix_web::test]
async fn a_missing_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(None));

    let (status, body) = get_request("/orders/99", None, configure_orders(backend)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("does not exist"), "got {body}");
}

#[actix_web::test]
async fn creating_an_order_requires_the_caller_identity_header() {
    let _ = env_logger::try_init().ok();
    let backend = MockBackend::new();
    let body = json!({ "restaurant_id": 3, "delivery_address_id": 11, "items": [] });

    let (status, _) = post_json("/orders", None, body, configure_orders(backend)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn an_illegal_transition_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(sample_order(OrderStatus::Placed))));

    let (status, body) =
        patch_json("/orders/1/status", json!({ "status": "Delivered" }), configure_orders(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Invalid status transition"), "got {body}");
}

#[actix_web::test]
async fn cancelling_an_order_out_for_delivery_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(sample_order(OrderStatus::OutForDelivery))));

    let (status, body) = post_json("/orders/1/cancel", None, json!({}), configure_orders(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("cannot be cancelled"), "got {body}");
}

#[actix_web::test]
async fn assigning_a_non_agent_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(sample_order(OrderStatus::Confirmed))));
    backend.expect_fetch_user().returning(|id| {
        Ok(Some(User {
            id,
            name: "Vikram Shah".to_string(),
            email: "vikram@example.in".to_string(),
            phone: None,
            role: Role::Customer,
        }))
    });

    let (status, body) =
        post_json("/orders/1/assign", None, json!({ "agent_id": 9 }), configure_orders(backend)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("role"), "got {body}");
}
