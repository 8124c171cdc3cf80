use std::{collections::HashMap, fmt::Debug};

use chrono::{Duration, Utc};
use log::*;

use crate::{
    api::{
        errors::OrderFlowError,
        order_objects::{NewOrderRequest, OrderQueryFilter, OrderView, PaymentSummary},
    },
    db_types::{MenuItem, NewOrder, NewOrderLine, Order, OrderNumber, OrderStatus, Role},
    helpers,
    pricing::{self, DELIVERY_LEAD_TIME_MINUTES},
    traits::OrderFlowDatabase,
};

/// `OrderFlowApi` is the primary API for the order lifecycle: creating orders, querying them, and driving them
/// through the status state machine.
///
/// Caller identity is always an explicit argument. The upstream HTTP layer authenticates the caller and passes the
/// customer id in; nothing in the engine reads ambient state.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderFlowApi<B>
where B: OrderFlowDatabase
{
    /// Creates a new order for `customer_id`.
    ///
    /// The cart is validated against the catalogue (restaurant open, items available and belonging to the selected
    /// restaurant), unit prices are snapshotted, and the cart is priced before anything is persisted — a validation
    /// or pricing failure leaves no partial order behind. The order lands in `Placed` status with an estimated
    /// delivery time 45 minutes out.
    pub async fn create_order(
        &self,
        customer_id: i64,
        request: NewOrderRequest,
    ) -> Result<OrderView, OrderFlowError> {
        let restaurant = self
            .db
            .fetch_restaurant(request.restaurant_id)
            .await?
            .ok_or(OrderFlowError::RestaurantNotFound(request.restaurant_id))?;
        if !restaurant.is_open {
            return Err(OrderFlowError::RestaurantClosed(restaurant.name));
        }
        let address = self
            .db
            .fetch_address(request.delivery_address_id)
            .await?
            .ok_or(OrderFlowError::AddressNotFound(request.delivery_address_id))?;
        let mut cart: Vec<(MenuItem, i64, Option<String>)> = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let item = self
                .db
                .fetch_menu_item(line.menu_item_id)
                .await?
                .ok_or(OrderFlowError::MenuItemNotFound(line.menu_item_id))?;
            if !item.is_available {
                return Err(OrderFlowError::ItemUnavailable(item.name));
            }
            if item.restaurant_id != restaurant.id {
                return Err(OrderFlowError::CrossRestaurant { item: item.name, restaurant_id: restaurant.id });
            }
            cart.push((item, line.quantity, line.note.clone()));
        }
        let priced_items: Vec<(&MenuItem, i64)> = cart.iter().map(|(item, quantity, _)| (item, *quantity)).collect();
        let breakdown = pricing::price_order(&priced_items, &restaurant)?;
        let lines = cart
            .into_iter()
            .map(|(item, quantity, note)| NewOrderLine {
                menu_item_id: item.id,
                menu_item_name: item.name,
                quantity,
                unit_price: item.price,
                line_total: item.price * quantity,
                note,
            })
            .collect();
        let new_order = NewOrder {
            order_number: helpers::new_order_number(),
            customer_id,
            restaurant_id: restaurant.id,
            delivery_address_id: address.id,
            delivery_instructions: request.delivery_instructions,
            subtotal: breakdown.subtotal,
            tax: breakdown.tax,
            delivery_fee: breakdown.delivery_fee,
            total: breakdown.total,
            estimated_delivery_at: Utc::now() + Duration::minutes(DELIVERY_LEAD_TIME_MINUTES),
            lines,
        };
        let order = self.db.insert_order(new_order).await?;
        info!(
            "📦️ Order {} placed by customer #{customer_id} at {}: {} ({} lines)",
            order.order_number,
            restaurant.name,
            order.total,
            request.items.len()
        );
        self.order_view(order).await
    }

    pub async fn order_by_id(&self, order_id: i64) -> Result<OrderView, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        self.order_view(order).await
    }

    pub async fn order_by_number(&self, order_number: &OrderNumber) -> Result<OrderView, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_number(order_number)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNumberNotFound(order_number.clone()))?;
        self.order_view(order).await
    }

    pub async fn orders_for_customer(&self, customer_id: i64) -> Result<Vec<OrderView>, OrderFlowError> {
        let query = OrderQueryFilter::default().with_customer_id(customer_id);
        let orders = self.db.search_orders(query).await?;
        self.order_views(orders).await
    }

    pub async fn orders_for_restaurant(&self, restaurant_id: i64) -> Result<Vec<OrderView>, OrderFlowError> {
        let query = OrderQueryFilter::default().with_restaurant_id(restaurant_id);
        let orders = self.db.search_orders(query).await?;
        self.order_views(orders).await
    }

    /// Moves an order to `new_status`, if the transition table allows it from the order's current status.
    ///
    /// The write is a compare-and-swap on the status that was just read; if another caller moved the order in
    /// between, the fresh status is reported in the [`OrderFlowError::InvalidTransition`] instead of being silently
    /// overwritten.
    pub async fn update_status(&self, order_id: i64, new_status: OrderStatus) -> Result<OrderView, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if !order.status.can_transition_to(new_status) {
            return Err(OrderFlowError::InvalidTransition { from: order.status, to: new_status });
        }
        match self.db.update_order_status_checked(order_id, order.status, new_status).await? {
            Some(updated) => {
                info!("📦️ Order {} moved {} → {new_status}", updated.order_number, order.status);
                self.order_view(updated).await
            },
            None => {
                let fresh = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
                debug!(
                    "📦️ Status of order {} changed underneath the update ({} → {}); rejecting the transition",
                    fresh.order_number, order.status, fresh.status
                );
                Err(OrderFlowError::InvalidTransition { from: fresh.status, to: new_status })
            },
        }
    }

    /// Cancels an order. Only `Placed` and `Confirmed` orders can be cancelled.
    pub async fn cancel(&self, order_id: i64) -> Result<OrderView, OrderFlowError> {
        // Two attempts cover the one benign race: the order being confirmed (still cancellable) while we cancel it.
        for _ in 0..2 {
            let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
            if !order.status.is_cancellable() {
                return Err(OrderFlowError::NonCancellable(order.status));
            }
            if let Some(updated) =
                self.db.update_order_status_checked(order_id, order.status, OrderStatus::Cancelled).await?
            {
                info!("📦️ Order {} cancelled (was {})", updated.order_number, order.status);
                return self.order_view(updated).await;
            }
        }
        let fresh = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        Err(OrderFlowError::NonCancellable(fresh.status))
    }

    /// Assigns a delivery agent to the order. The target user must actually hold the delivery-agent role, and the
    /// order must still be live.
    pub async fn assign_delivery_agent(&self, order_id: i64, agent_id: i64) -> Result<OrderView, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.status.is_terminal() {
            return Err(OrderFlowError::OrderClosed(order.status));
        }
        let agent = self.db.fetch_user(agent_id).await?.ok_or(OrderFlowError::UserNotFound(agent_id))?;
        if agent.role != Role::DeliveryAgent {
            return Err(OrderFlowError::RoleMismatch {
                user_id: agent_id,
                expected: Role::DeliveryAgent,
                actual: agent.role,
            });
        }
        let updated = self.db.set_delivery_agent(order_id, agent_id).await?;
        info!("📦️ Order {} assigned to delivery agent #{agent_id}", updated.order_number);
        self.order_view(updated).await
    }

    pub async fn order_view(&self, order: Order) -> Result<OrderView, OrderFlowError> {
        let id = order.id;
        let mut views = self.order_views(vec![order]).await?;
        views.pop().ok_or(OrderFlowError::OrderNotFound(id))
    }

    /// Maps orders to views. Lines are fetched with a single batched query, and the catalogue lookups (restaurant,
    /// customer, address) are memoised per distinct id so a page of orders does not turn into a query storm.
    pub async fn order_views(&self, orders: Vec<Order>) -> Result<Vec<OrderView>, OrderFlowError> {
        let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let mut lines_by_order: HashMap<i64, Vec<_>> = HashMap::new();
        for line in self.db.fetch_lines_for_orders(&order_ids).await? {
            lines_by_order.entry(line.order_id).or_default().push(line);
        }
        let mut restaurants = HashMap::new();
        let mut customers = HashMap::new();
        let mut addresses = HashMap::new();
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            if !restaurants.contains_key(&order.restaurant_id) {
                let restaurant = self
                    .db
                    .fetch_restaurant(order.restaurant_id)
                    .await?
                    .ok_or(OrderFlowError::RestaurantNotFound(order.restaurant_id))?;
                restaurants.insert(order.restaurant_id, restaurant);
            }
            if !customers.contains_key(&order.customer_id) {
                let customer =
                    self.db.fetch_user(order.customer_id).await?.ok_or(OrderFlowError::UserNotFound(order.customer_id))?;
                customers.insert(order.customer_id, customer);
            }
            if !addresses.contains_key(&order.delivery_address_id) {
                let address = self
                    .db
                    .fetch_address(order.delivery_address_id)
                    .await?
                    .ok_or(OrderFlowError::AddressNotFound(order.delivery_address_id))?;
                addresses.insert(order.delivery_address_id, address);
            }
            let payment = self.db.fetch_payment_for_order(order.id).await?.map(|p| PaymentSummary {
                id: p.id,
                intent_id: p.intent_id,
                gateway_payment_id: p.gateway_payment_id,
                amount: p.amount,
                status: p.status,
            });
            let restaurant = &restaurants[&order.restaurant_id];
            let customer = &customers[&order.customer_id];
            let address = &addresses[&order.delivery_address_id];
            views.push(OrderView {
                id: order.id,
                order_number: order.order_number,
                customer_id: order.customer_id,
                customer_name: customer.name.clone(),
                restaurant_id: order.restaurant_id,
                restaurant_name: restaurant.name.clone(),
                lines: lines_by_order.remove(&order.id).unwrap_or_default(),
                subtotal: order.subtotal,
                tax: order.tax,
                delivery_fee: order.delivery_fee,
                total: order.total,
                status: order.status,
                delivery_address: address.formatted(),
                delivery_instructions: order.delivery_instructions,
                delivery_agent_id: order.delivery_agent_id,
                estimated_delivery_at: order.estimated_delivery_at,
                actual_delivery_at: order.actual_delivery_at,
                created_at: order.created_at,
                payment,
            });
        }
        Ok(views)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
