use mockall::mock;
use tiffin_order_engine::{
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
    order_objects::OrderQueryFilter,
    traits::{
        CatalogManagement,
        GatewayError,
        GatewayIntent,
        NewIntentRequest,
        OrderFlowDatabase,
        OrderManagement,
        PaymentProviderClient,
        SettlementOutcome,
    },
    OrderFlowError,
};

mock! {
    pub Backend {}

    impl Clone for Backend {
        fn clone(&self) -> Self;
    }

    impl OrderManagement for Backend {
        async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_lines_for_order(&self, order_id: i64) -> Result<Vec<OrderLine>, OrderFlowError>;
        async fn fetch_lines_for_orders(&self, order_ids: &[i64]) -> Result<Vec<OrderLine>, OrderFlowError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
        async fn fetch_payment_for_order(&self, order_id: i64) -> Result<Option<Payment>, OrderFlowError>;
        async fn fetch_payment_by_intent_id(&self, intent_id: &str) -> Result<Option<Payment>, OrderFlowError>;
    }

    impl CatalogManagement for Backend {
        async fn fetch_restaurant(&self, restaurant_id: i64) -> Result<Option<Restaurant>, OrderFlowError>;
        async fn fetch_menu_item(&self, menu_item_id: i64) -> Result<Option<MenuItem>, OrderFlowError>;
        async fn fetch_address(&self, address_id: i64) -> Result<Option<Address>, OrderFlowError>;
        async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, OrderFlowError>;
    }

    impl OrderFlowDatabase for Backend {
        fn url(&self) -> &str;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderFlowError>;
        async fn update_order_status_checked(
            &self,
            order_id: i64,
            expected: OrderStatus,
            new_status: OrderStatus,
        ) -> Result<Option<Order>, OrderFlowError>;
        async fn set_delivery_agent(&self, order_id: i64, agent_id: i64) -> Result<Order, OrderFlowError>;
        async fn success_payment_exists(&self, order_id: i64) -> Result<bool, OrderFlowError>;
        async fn supersede_payment(&self, payment: NewPayment) -> Result<Payment, OrderFlowError>;
        async fn settle_payment_success(
            &self,
            intent_id: &str,
            gateway_payment_id: &str,
        ) -> Result<SettlementOutcome, OrderFlowError>;
        async fn record_payment_failure(
            &self,
            intent_id: &str,
            reason: &str,
        ) -> Result<(Payment, bool), OrderFlowError>;
    }
}

mock! {
    pub Gateway {}

    impl Clone for Gateway {
        fn clone(&self) -> Self;
    }

    impl PaymentProviderClient for Gateway {
        async fn create_order_intent(&self, request: NewIntentRequest) -> Result<GatewayIntent, GatewayError>;
    }
}
