use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;
use tiffin_order_engine::{traits::GatewayError, OrderFlowError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("No authenticated caller identity was attached to the request")]
    UnidentifiedCaller,
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::UnidentifiedCaller => StatusCode::UNAUTHORIZED,
            Self::OrderFlow(e) => order_flow_status(e),
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

/// The engine-taxonomy → HTTP-status mapping.
///
/// Verification failures answer 402 with an opaque message, and the verify route folds its not-found case into the
/// same variant before it gets here, so the endpoint leaks nothing about which check failed. Webhook signature
/// mismatches are 403 so the gateway does not mark the delivery processed. Gateway transport failures are 503 —
/// safe for the caller to retry, since nothing was persisted.
fn order_flow_status(e: &OrderFlowError) -> StatusCode {
    use OrderFlowError::*;
    match e {
        OrderNotFound(_) | OrderNumberNotFound(_) | RestaurantNotFound(_) | MenuItemNotFound(_) |
        AddressNotFound(_) | UserNotFound(_) | PaymentNotFound(_) | PaymentNotFoundForOrder(_) => {
            StatusCode::NOT_FOUND
        },
        Validation(_) | WebhookPayload(_) | AmountNotRepresentable(_) => StatusCode::BAD_REQUEST,
        RestaurantClosed(_) | ItemUnavailable(_) | CrossRestaurant { .. } => StatusCode::BAD_REQUEST,
        InvalidTransition { .. } | NonCancellable(_) | RoleMismatch { .. } | OrderClosed(_) | AlreadyPaid(_) => {
            StatusCode::CONFLICT
        },
        VerificationFailed => StatusCode::PAYMENT_REQUIRED,
        InvalidWebhookSignature => StatusCode::FORBIDDEN,
        Gateway(g) => match g {
            GatewayError::Transport(_) | GatewayError::Timeout | GatewayError::Rejected { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            },
        },
        DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
