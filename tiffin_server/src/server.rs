use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use tiffin_order_engine::{OrderFlowApi, PaymentFlowApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::gateway::RestGatewayClient,
    routes::{
        health,
        AssignDeliveryAgentRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        CreatePaymentIntentRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        OrderByNumberRoute,
        PaymentForOrderRoute,
        PaymentWebhookRoute,
        RestaurantOrdersRoute,
        UpdateOrderStatusRoute,
        VerifyPaymentRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = RestGatewayClient::new(&config.gateway)?;
    let srv = create_server_instance(config, db, gateway)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: RestGatewayClient,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone());
        let payments_api = PaymentFlowApi::new(db.clone(), gateway.clone(), config.gateway.engine_config());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("tiffin::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .service(health)
            // `/orders/number/{n}` must register ahead of `/orders/{id}` so the literal segment wins.
            .service(OrderByNumberRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(AssignDeliveryAgentRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(RestaurantOrdersRoute::<SqliteDatabase>::new())
            .service(CreatePaymentIntentRoute::<SqliteDatabase, RestGatewayClient>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase, RestGatewayClient>::new())
            .service(PaymentForOrderRoute::<SqliteDatabase, RestGatewayClient>::new())
            .service(PaymentWebhookRoute::<SqliteDatabase, RestGatewayClient>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
