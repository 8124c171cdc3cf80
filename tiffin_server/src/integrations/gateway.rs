//! The REST client for the remote payment gateway.
//!
//! The engine only ever asks the gateway for one thing: an order-level payment intent. The request is authenticated
//! with basic auth (key id / key secret) and bounded by the configured timeout; a timeout surfaces as
//! [`GatewayError::Timeout`] and, because the engine calls the gateway before writing anything, leaves no local
//! state behind.

use std::sync::Arc;

use log::*;
use reqwest::Client;
use serde::Deserialize;
use tiffin_common::Secret;
use tiffin_order_engine::traits::{GatewayError, GatewayIntent, NewIntentRequest, PaymentProviderClient};

use crate::{config::GatewayClientConfig, errors::ServerError};

#[derive(Clone)]
pub struct RestGatewayClient {
    base_url: String,
    key_id: String,
    key_secret: Secret<String>,
    client: Arc<Client>,
}

impl RestGatewayClient {
    pub fn new(config: &GatewayClientConfig) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            client: Arc::new(client),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl PaymentProviderClient for RestGatewayClient {
    async fn create_order_intent(&self, request: NewIntentRequest) -> Result<GatewayIntent, GatewayError> {
        #[derive(Deserialize)]
        struct IntentResponse {
            id: String,
        }
        let url = self.url("/v1/orders");
        let body = serde_json::json!({
            "amount": request.amount_minor,
            "currency": request.currency,
            "receipt": request.receipt,
            "notes": { "order_ref": request.order_ref.to_string() },
        });
        trace!("Creating payment intent for receipt {}", request.receipt);
        let response = self
            .client
            .post(url)
            .basic_auth(&self.key_id, Some(self.key_secret.reveal()))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;
        if response.status().is_success() {
            let intent =
                response.json::<IntentResponse>().await.map_err(|e| GatewayError::Transport(e.to_string()))?;
            debug!("Gateway created intent {} for receipt {}", intent.id, request.receipt);
            Ok(GatewayIntent { intent_id: intent.id })
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayError::Transport(e.to_string()))?;
            warn!("Gateway rejected intent creation for receipt {} ({status})", request.receipt);
            Err(GatewayError::Rejected { status, message })
        }
    }
}
