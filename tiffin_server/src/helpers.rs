use actix_web::HttpRequest;

use crate::errors::ServerError;

/// The fronting proxy authenticates every caller and attaches their user id in this header before the request
/// reaches us. Identity is then passed down to the engine explicitly — nothing below this point reads ambient
/// request state.
pub const CALLER_ID_HEADER: &str = "X-Caller-Id";

/// The gateway delivers its webhook signature in this header, as an HMAC-SHA256 hex digest of the raw body.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Gateway-Signature";

pub fn caller_id(req: &HttpRequest) -> Result<i64, ServerError> {
    req.headers()
        .get(CALLER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(ServerError::UnidentifiedCaller)
}
