use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use blossom_common::{
    helpers::{env_flag, env_parse},
    Secret,
};
use blossom_order_engine::{
    helpers::DEFAULT_ORDER_ID_PREFIX,
    object_store::{HostedDocumentConfig, DEFAULT_ORDERS_FILE},
    router::{BackendKind, StoreTopology},
    sqlite::{configured_db_url, SQLITE_DB_URL},
    tasks::{RetryPolicy, DEFAULT_QUEUE_BUFFER},
};
use log::*;

const DEFAULT_BOS_HOST: &str = "127.0.0.1";
const DEFAULT_BOS_PORT: u16 = 8480;
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8480";
const DEFAULT_STRIPE_API_URL: &str = "https://api.stripe.com";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
const DEFAULT_READ_RETRIES: u32 = 3;
const DEFAULT_READ_RETRY_DELAY_MS: u64 = 500;
const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 5000;
const DEFAULT_SIDE_EFFECT_MAX_ATTEMPTS: u32 = 5;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// True when `BOS_DATABASE_URL` was set explicitly. Decides the primary store when none is configured.
    pub relational_configured: bool,
    pub primary_store: Option<BackendKind>,
    pub read_fallback: bool,
    pub dual_write: bool,
    pub backend_timeout: Duration,
    pub object_store: ObjectStoreConfig,
    pub side_effect_buffer: usize,
    pub side_effect_max_attempts: u32,
    pub order_id_prefix: String,
    /// Base of the public order links handed to customers, e.g. `https://blossom.example`
    pub public_base_url: String,
    /// A JSON price schedule. The built-in schedule is used when this is not set.
    pub price_schedule_path: Option<PathBuf>,
    pub webhook: WebhookConfig,
    pub stripe: StripeConfig,
    /// Every `/admin` request must carry this value in `X-Admin-Secret`. When empty, admin routes are closed.
    pub admin_secret: Secret<String>,
    /// The email service endpoint. Notifications are only logged when this is not set.
    pub notification_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BOS_HOST.to_string(),
            port: DEFAULT_BOS_PORT,
            database_url: SQLITE_DB_URL.to_string(),
            relational_configured: false,
            primary_store: None,
            read_fallback: true,
            dual_write: true,
            backend_timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            object_store: ObjectStoreConfig::default(),
            side_effect_buffer: DEFAULT_QUEUE_BUFFER,
            side_effect_max_attempts: DEFAULT_SIDE_EFFECT_MAX_ATTEMPTS,
            order_id_prefix: DEFAULT_ORDER_ID_PREFIX.to_string(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            price_schedule_path: None,
            webhook: WebhookConfig::default(),
            stripe: StripeConfig::default(),
            admin_secret: Secret::default(),
            notification_url: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ObjectStoreConfig {
    /// The hosted order document. A local file is used when this is not set.
    pub url: Option<String>,
    pub token: Secret<String>,
    pub orders_file: PathBuf,
    pub read_retries: u32,
    pub retry_delay: Duration,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: Secret::default(),
            orders_file: PathBuf::from(DEFAULT_ORDERS_FILE),
            read_retries: DEFAULT_READ_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_READ_RETRY_DELAY_MS),
        }
    }
}

impl ObjectStoreConfig {
    pub fn hosted_document_config(&self) -> Option<HostedDocumentConfig> {
        self.url.as_ref().map(|url| HostedDocumentConfig {
            url: url.clone(),
            token: self.token.clone(),
            read_retries: self.read_retries,
            retry_delay: self.retry_delay,
        })
    }
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// The signing secret shared with the payment processor.
    pub secret: Secret<String>,
    /// How far a signature's timestamp may be from the server's clock.
    pub tolerance: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { secret: Secret::default(), tolerance: Duration::from_secs(DEFAULT_WEBHOOK_TOLERANCE_SECS) }
    }
}

#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub api_url: String,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self { secret_key: Secret::default(), api_url: DEFAULT_STRIPE_API_URL.to_string() }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BOS_HOST").ok().unwrap_or_else(|| DEFAULT_BOS_HOST.into());
        let port = parse_or_default("BOS_PORT", DEFAULT_BOS_PORT);
        let (database_url, relational_configured) = match configured_db_url() {
            Some(url) => (url, true),
            None => {
                info!("🪛️ BOS_DATABASE_URL is not set. Using {SQLITE_DB_URL} for the payment event ledger.");
                (SQLITE_DB_URL.to_string(), false)
            },
        };
        let primary_store = env::var("BOS_PRIMARY_STORE").ok().and_then(|s| {
            s.parse::<BackendKind>()
                .map_err(|e| warn!("🪛️ Invalid value for BOS_PRIMARY_STORE. {e}. It will be derived."))
                .ok()
        });
        let read_fallback = env_flag("BOS_READ_FALLBACK", true);
        let dual_write = env_flag("BOS_DUAL_WRITE", true);
        let backend_timeout = millis_or_default("BOS_BACKEND_TIMEOUT_MS", DEFAULT_BACKEND_TIMEOUT_MS);
        let object_store = ObjectStoreConfig::from_env_or_default();
        let side_effect_buffer = parse_or_default("BOS_SIDE_EFFECT_BUFFER", DEFAULT_QUEUE_BUFFER);
        let side_effect_max_attempts =
            parse_or_default("BOS_SIDE_EFFECT_MAX_ATTEMPTS", DEFAULT_SIDE_EFFECT_MAX_ATTEMPTS);
        let order_id_prefix = env::var("BOS_ORDER_ID_PREFIX").ok().unwrap_or_else(|| DEFAULT_ORDER_ID_PREFIX.into());
        let public_base_url = env::var("BOS_PUBLIC_BASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ BOS_PUBLIC_BASE_URL is not set. Order links will point at {DEFAULT_PUBLIC_BASE_URL}.");
            DEFAULT_PUBLIC_BASE_URL.into()
        });
        let price_schedule_path = env::var("BOS_PRICE_SCHEDULE_PATH").ok().map(PathBuf::from);
        if price_schedule_path.is_none() {
            info!("🪛️ BOS_PRICE_SCHEDULE_PATH is not set. Using the built-in price schedule.");
        }
        let webhook = WebhookConfig {
            secret: secret_from_env("BOS_WEBHOOK_SECRET", "Payment webhooks"),
            tolerance: Duration::from_secs(parse_or_default(
                "BOS_WEBHOOK_TOLERANCE_SECS",
                DEFAULT_WEBHOOK_TOLERANCE_SECS,
            )),
        };
        let stripe = StripeConfig {
            secret_key: secret_from_env("BOS_STRIPE_SECRET_KEY", "Checkout requests"),
            api_url: env::var("BOS_STRIPE_API_URL").ok().unwrap_or_else(|| DEFAULT_STRIPE_API_URL.into()),
        };
        let admin_secret = secret_from_env("BOS_ADMIN_SECRET", "Admin requests");
        let notification_url = env::var("BOS_NOTIFICATION_URL").ok().filter(|s| !s.trim().is_empty());
        if notification_url.is_none() {
            info!("🪛️ BOS_NOTIFICATION_URL is not set. Order notifications will only be logged.");
        }
        Self {
            host,
            port,
            database_url,
            relational_configured,
            primary_store,
            read_fallback,
            dual_write,
            backend_timeout,
            object_store,
            side_effect_buffer,
            side_effect_max_attempts,
            order_id_prefix,
            public_base_url,
            price_schedule_path,
            webhook,
            stripe,
            admin_secret,
            notification_url,
        }
    }

    /// Decided once at startup and never changed while the server runs.
    pub fn topology(&self) -> StoreTopology {
        StoreTopology::resolve(self.primary_store, self.relational_configured)
            .with_fallback_reads(self.read_fallback)
            .with_dual_write(self.dual_write)
            .with_backend_timeout(self.backend_timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.side_effect_max_attempts)
    }
}

impl ObjectStoreConfig {
    pub fn from_env_or_default() -> Self {
        let url = env::var("BOS_OBJECT_STORE_URL").ok().filter(|s| !s.trim().is_empty());
        let orders_file = env::var("BOS_ORDERS_FILE").map(PathBuf::from).unwrap_or_else(|_| {
            if url.is_none() {
                info!("🪛️ BOS_OBJECT_STORE_URL is not set. Orders will be kept in {DEFAULT_ORDERS_FILE}.");
            }
            PathBuf::from(DEFAULT_ORDERS_FILE)
        });
        let token = match env::var("BOS_OBJECT_STORE_TOKEN") {
            Ok(s) => Secret::new(s),
            Err(_) => {
                if url.is_some() {
                    warn!("🪛️ BOS_OBJECT_STORE_TOKEN is not set. Requests to the object store will be anonymous.");
                }
                Secret::default()
            },
        };
        let read_retries = parse_or_default("BOS_OBJECT_STORE_READ_RETRIES", DEFAULT_READ_RETRIES);
        let retry_delay = millis_or_default("BOS_OBJECT_STORE_RETRY_DELAY_MS", DEFAULT_READ_RETRY_DELAY_MS);
        Self { url, token, orders_file, read_retries, retry_delay }
    }
}

fn parse_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env_parse::<T>(name) {
        None => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default value of {default} instead.");
            default
        },
    }
}

fn millis_or_default(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(parse_or_default(name, default_ms))
}

fn secret_from_env(name: &str, guarded: &str) -> Secret<String> {
    match env::var(name) {
        Ok(s) if !s.trim().is_empty() => Secret::new(s),
        _ => {
            error!("🪛️ {name} is not set. {guarded} will be rejected until it is.");
            Secret::default()
        },
    }
}
