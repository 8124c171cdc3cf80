use actix_web::{http::StatusCode, test, web::ServiceConfig, App};
use serde_json::Value;

use crate::helpers::CALLER_ID_HEADER;

pub async fn get_request<F>(path: &str, caller: Option<i64>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    let mut req = test::TestRequest::get().uri(path);
    if let Some(id) = caller {
        req = req.insert_header((CALLER_ID_HEADER, id.to_string()));
    }
    let response = test::call_service(&app, req.to_request()).await;
    let status = response.status();
    let body = String::from_utf8(test::read_body(response).await.to_vec()).expect("Body was not utf8");
    (status, body)
}

pub async fn post_json<F>(path: &str, caller: Option<i64>, body: Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    let mut req = test::TestRequest::post().uri(path).set_json(&body);
    if let Some(id) = caller {
        req = req.insert_header((CALLER_ID_HEADER, id.to_string()));
    }
    let response = test::call_service(&app, req.to_request()).await;
    let status = response.status();
    let body = String::from_utf8(test::read_body(response).await.to_vec()).expect("Body was not utf8");
    (status, body)
}

pub async fn patch_json<F>(path: &str, body: Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = test::init_service(App::new().configure(configure)).await;
    let req = test::TestRequest::patch().uri(path).set_json(&body);
    let response = test::call_service(&app, req.to_request()).await;
    let status = response.status();
    let body = String::from_utf8(test::read_body(response).await.to_vec()).expect("Body was not utf8");
    (status, body)
}

/// Posts a raw body with arbitrary headers — the webhook route must see the exact bytes the signature covers.
pub async fn post_raw<F>(
    path: &str,
    headers: Vec<(&'static str, String)>,
    body: String,
    configure: F,
) -> (StatusCode, String)
where
    F: FnOnce(&mut ServiceConfig),
{
    let app = test::init_service(App::new().configure(configure)).await;
    let mut req = test::TestRequest::post().uri(path).set_payload(body);
    for (name, value) in headers {
        req = req.insert_header((name, value));
    }
    let response = test::call_service(&app, req.to_request()).await;
    let status = response.status();
    let body = String::from_utf8(test::read_body(response).await.to_vec()).expect("Body was not utf8");
    (status, body)
}
