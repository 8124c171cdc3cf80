//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate
//! module. Keep this module neat and tidy 🙏
//!
//! Handlers stay generic over the storage and gateway traits so the endpoint tests can register them against
//! mocks; actix cannot register generic handlers through its attribute macros, hence the `route!` macro below,
//! which pairs each handler with a unit struct implementing `HttpServiceFactory`.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use tiffin_order_engine::{
    db_types::OrderNumber,
    order_objects::NewOrderRequest,
    traits::{OrderFlowDatabase, PaymentProviderClient},
    OrderFlowApi,
    OrderFlowError,
    PaymentFlowApi,
};

use crate::{
    data_objects::{AssignAgentRequest, JsonResponse, UpdateStatusRequest, VerifyPaymentRequest},
    errors::ServerError,
    helpers::{caller_id, WEBHOOK_SIGNATURE_HEADER},
};

// Actix cannot handle generics in attribute-macro handlers, so registration is implemented manually using the
// `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health   ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Orders   ----------------------------------------------------

route!(create_order => Post "/orders" impl OrderFlowDatabase);
pub async fn create_order<B: OrderFlowDatabase>(
    req: HttpRequest,
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = caller_id(&req)?;
    debug!("💻️ POST /orders for customer #{customer_id}");
    let view = api.create_order(customer_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(view))
}

route!(my_orders => Get "/orders" impl OrderFlowDatabase);
pub async fn my_orders<B: OrderFlowDatabase>(
    req: HttpRequest,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let customer_id = caller_id(&req)?;
    let views = api.orders_for_customer(customer_id).await?;
    Ok(HttpResponse::Ok().json(views))
}

route!(order_by_number => Get "/orders/number/{number}" impl OrderFlowDatabase);
pub async fn order_by_number<B: OrderFlowDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let number = OrderNumber(path.into_inner());
    let view = api.order_by_number(&number).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(order_by_id => Get "/orders/{id}" impl OrderFlowDatabase);
pub async fn order_by_id<B: OrderFlowDatabase>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let view = api.order_by_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(restaurant_orders => Get "/restaurants/{restaurant_id}/orders" impl OrderFlowDatabase);
pub async fn restaurant_orders<B: OrderFlowDatabase>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let views = api.orders_for_restaurant(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(views))
}

route!(update_order_status => Patch "/orders/{id}/status" impl OrderFlowDatabase);
pub async fn update_order_status<B: OrderFlowDatabase>(
    path: web::Path<i64>,
    body: web::Json<UpdateStatusRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let requested = body.into_inner().status;
    debug!("💻️ PATCH /orders/{order_id}/status -> {requested}");
    let view = api.update_status(order_id, requested).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(cancel_order => Post "/orders/{id}/cancel" impl OrderFlowDatabase);
pub async fn cancel_order<B: OrderFlowDatabase>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let view = api.cancel(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(assign_delivery_agent => Post "/orders/{id}/assign" impl OrderFlowDatabase);
pub async fn assign_delivery_agent<B: OrderFlowDatabase>(
    path: web::Path<i64>,
    body: web::Json<AssignAgentRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let view = api.assign_delivery_agent(path.into_inner(), body.into_inner().agent_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

// ---------------------------------------------   Payments   ---------------------------------------------------

route!(create_payment_intent => Post "/payments/create/{order_id}" impl OrderFlowDatabase, PaymentProviderClient);
pub async fn create_payment_intent<BDb, GPay>(
    path: web::Path<i64>,
    api: web::Data<PaymentFlowApi<BDb, GPay>>,
) -> Result<HttpResponse, ServerError>
where
    BDb: OrderFlowDatabase,
    GPay: PaymentProviderClient,
{
    let order_id = path.into_inner();
    debug!("💻️ POST /payments/create/{order_id}");
    let view = api.create_payment_intent(order_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(verify_payment => Post "/payments/verify" impl OrderFlowDatabase, PaymentProviderClient);
pub async fn verify_payment<BDb, GPay>(
    body: web::Json<VerifyPaymentRequest>,
    api: web::Data<PaymentFlowApi<BDb, GPay>>,
) -> Result<HttpResponse, ServerError>
where
    BDb: OrderFlowDatabase,
    GPay: PaymentProviderClient,
{
    let request = body.into_inner();
    match api.verify_payment(&request.intent_id, &request.gateway_payment_id, &request.signature).await {
        Ok(view) => Ok(HttpResponse::Ok().json(view)),
        // An unknown intent answers exactly like a bad signature, so this endpoint cannot be used as an oracle to
        // probe which intent ids exist.
        Err(OrderFlowError::PaymentNotFound(_)) => Err(OrderFlowError::VerificationFailed.into()),
        Err(e) => Err(e.into()),
    }
}

route!(payment_for_order => Get "/payments/order/{order_id}" impl OrderFlowDatabase, PaymentProviderClient);
pub async fn payment_for_order<BDb, GPay>(
    path: web::Path<i64>,
    api: web::Data<PaymentFlowApi<BDb, GPay>>,
) -> Result<HttpResponse, ServerError>
where
    BDb: OrderFlowDatabase,
    GPay: PaymentProviderClient,
{
    let view = api.payment_for_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(payment_webhook => Post "/payments/webhook" impl OrderFlowDatabase, PaymentProviderClient);
pub async fn payment_webhook<BDb, GPay>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<PaymentFlowApi<BDb, GPay>>,
) -> Result<HttpResponse, ServerError>
where
    BDb: OrderFlowDatabase,
    GPay: PaymentProviderClient,
{
    trace!("💻️ Received webhook delivery: {}", req.uri());
    // A missing signature header is treated exactly like a bad one.
    let signature = req
        .headers()
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(OrderFlowError::InvalidWebhookSignature)
        .map_err(ServerError::from)?;
    api.handle_webhook(body.as_ref(), signature).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Webhook processed")))
}
