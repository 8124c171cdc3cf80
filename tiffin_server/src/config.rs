use std::{env, time::Duration};

use log::*;
use tiffin_common::Secret;
use tiffin_order_engine::payment_objects::GatewayConfig;

const DEFAULT_TIFFIN_HOST: &str = "127.0.0.1";
const DEFAULT_TIFFIN_PORT: u16 = 8460;
const DEFAULT_GATEWAY_URL: &str = "https://api.gateway.test";
const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Everything needed to talk to (and be talked to by) the payment gateway.
    pub gateway: GatewayClientConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TIFFIN_HOST.to_string(),
            port: DEFAULT_TIFFIN_PORT,
            database_url: String::default(),
            gateway: GatewayClientConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TIFFIN_HOST").ok().unwrap_or_else(|| DEFAULT_TIFFIN_HOST.into());
        let port = env::var("TIFFIN_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for TIFFIN_PORT. {e} Using the default, {DEFAULT_TIFFIN_PORT}, \
                         instead."
                    );
                    DEFAULT_TIFFIN_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_TIFFIN_PORT);
        let database_url = env::var("TIFFIN_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TIFFIN_DATABASE_URL is not set. Please set it to the URL for the tiffin database.");
            String::default()
        });
        let gateway = GatewayClientConfig::from_env_or_default();
        Self { host, port, database_url, gateway }
    }
}

//---------------------------------------  GatewayClientConfig  -------------------------------------------------------
#[derive(Clone, Debug, Default)]
pub struct GatewayClientConfig {
    /// Base URL of the gateway's REST API.
    pub base_url: String,
    /// The public API key id. Clients embed this to open the gateway checkout; it is safe to expose.
    pub key_id: String,
    /// The API key secret. Signs the synchronous proof of payment. Never leaves the server.
    pub key_secret: Secret<String>,
    /// The webhook signing secret. Never leaves the server.
    pub webhook_secret: Secret<String>,
    /// Bound on the create-intent call. A timeout is reported as a gateway error and persists nothing locally.
    pub timeout: Duration,
}

impl GatewayClientConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("TIFFIN_GATEWAY_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ TIFFIN_GATEWAY_URL is not set. Using the default, {DEFAULT_GATEWAY_URL}.");
            DEFAULT_GATEWAY_URL.into()
        });
        let key_id = env::var("TIFFIN_GATEWAY_KEY_ID").ok().unwrap_or_else(|| {
            error!("🪛️ TIFFIN_GATEWAY_KEY_ID is not set. Payment intents cannot be created without it.");
            String::default()
        });
        let key_secret = env::var("TIFFIN_GATEWAY_KEY_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ TIFFIN_GATEWAY_KEY_SECRET is not set. Payment verification will reject every proof.");
            String::default()
        });
        let webhook_secret = env::var("TIFFIN_GATEWAY_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!("🪛️ TIFFIN_GATEWAY_WEBHOOK_SECRET is not set. Webhook deliveries will be rejected.");
            String::default()
        });
        let timeout = env::var("TIFFIN_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for TIFFIN_GATEWAY_TIMEOUT_SECS. {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT);
        Self {
            base_url,
            key_id,
            key_secret: Secret::new(key_secret),
            webhook_secret: Secret::new(webhook_secret),
            timeout,
        }
    }

    /// The subset the engine's settlement flows need. Excludes the transport parameters on purpose.
    pub fn engine_config(&self) -> GatewayConfig {
        GatewayConfig {
            key_id: self.key_id.clone(),
            key_secret: self.key_secret.clone(),
            webhook_secret: self.webhook_secret.clone(),
        }
    }
}
