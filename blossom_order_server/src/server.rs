use std::{path::Path, sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use blossom_common::Secret;
use blossom_order_engine::{
    helpers::OrderIdGenerator,
    object_store::ObjectStoreDatabase,
    pricing::PriceSchedule,
    router::{Backends, StoreRouter},
    tasks::{BackendExecutor, SideEffectQueue, SideEffectWorker},
    traits::PaymentEventLedger,
    OrderFlowApi,
    PaymentFlowApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    config::{ServerConfig, WebhookConfig},
    errors::ServerError,
    helpers::PublicLinks,
    integrations::{
        notifications::create_notification_hooks,
        stripe::{CheckoutProvider, StripeCheckout},
    },
    middleware::{AdminSecretFactory, SignatureMiddlewareFactory},
    routes::{
        admin_order,
        admin_orders,
        create_order,
        delete_order,
        health,
        mark_paid,
        public_order,
        update_fulfillment,
        CheckoutRoute,
        PaymentWebhookRoute,
    },
};

const MAX_DB_CONNECTIONS: u32 = 25;
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the request handlers need, built once at startup.
#[derive(Clone)]
pub struct Engine {
    pub orders: OrderFlowApi,
    pub payments: PaymentFlowApi<SqliteDatabase>,
    pub checkout: StripeCheckout,
    pub links: PublicLinks,
    pub side_effects: SideEffectQueue,
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let (engine, worker) = build_engine(&config).await?;
    let side_effects = engine.side_effects.clone();
    tokio::spawn(worker.start());
    let srv = create_server_instance(config, engine)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("📬️ Waiting for {} background tasks to finish", side_effects.in_flight());
    if !side_effects.wait_until_idle(SHUTDOWN_DRAIN_TIMEOUT).await {
        warn!("📬️ {} background tasks were still running at shutdown", side_effects.in_flight());
    }
    result
}

/// Opens both stores, loads the price schedule and wires up the APIs. The side-effect worker is returned unstarted.
pub async fn build_engine(config: &ServerConfig) -> Result<(Engine, SideEffectWorker<BackendExecutor>), ServerError> {
    ensure_database_dir(&config.database_url)?;
    let db = SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let client = reqwest::Client::new();
    let object_store = match config.object_store.hosted_document_config() {
        Some(doc) => ObjectStoreDatabase::hosted(client.clone(), doc),
        None => ObjectStoreDatabase::local(&config.object_store.orders_file),
    };
    info!("🪣️ Object store: {}", object_store.describe());
    let backends = Backends::new(db.clone(), object_store);

    let hooks = create_notification_hooks(client.clone(), config.notification_url.as_deref());
    let executor = BackendExecutor::new(backends.clone(), hooks).with_backend_timeout(config.backend_timeout);
    let worker = SideEffectWorker::new(config.side_effect_buffer, executor, config.retry_policy());

    let topology = config.topology();
    info!("🔀️ Store topology: {topology}");
    let ids = OrderIdGenerator::new(&config.order_id_prefix);
    let router = StoreRouter::new(topology, &backends, ids, worker.queue());

    let schedule = match &config.price_schedule_path {
        Some(path) => PriceSchedule::from_file(path).await.map_err(|e| {
            ServerError::ConfigurationError(format!("Could not load the price schedule at {}. {e}", path.display()))
        })?,
        None => PriceSchedule::default(),
    };
    info!("🪛️ Price schedule has {} bouquets and {} add-ons", schedule.bouquets.len(), schedule.add_ons.len());

    let engine = Engine {
        orders: OrderFlowApi::new(router.clone(), Arc::new(schedule)),
        payments: PaymentFlowApi::new(router, db),
        checkout: StripeCheckout::new(client, config.stripe.clone()),
        links: PublicLinks::new(&config.public_base_url),
        side_effects: worker.queue(),
    };
    Ok((engine, worker))
}

pub fn create_server_instance(config: ServerConfig, engine: Engine) -> Result<Server, ServerError> {
    let webhook = config.webhook.clone();
    let admin_secret = config.admin_secret.clone();
    let srv = HttpServer::new(move || {
        let webhook = webhook.clone();
        let admin_secret = admin_secret.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bos::access_log"))
            .app_data(web::Data::new(engine.orders.clone()))
            .app_data(web::Data::new(engine.payments.clone()))
            .app_data(web::Data::new(engine.checkout.clone()))
            .app_data(web::Data::new(engine.links.clone()))
            .configure(move |cfg| configure_routes::<StripeCheckout, SqliteDatabase>(cfg, webhook, admin_secret))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route. The checkout provider and the payment ledger are generic so that tests can swap them out.
pub fn configure_routes<C, L>(cfg: &mut web::ServiceConfig, webhook: WebhookConfig, admin_secret: Secret<String>)
where
    C: CheckoutProvider + 'static,
    L: PaymentEventLedger + 'static,
{
    let storefront = web::scope("/api")
        .service(create_order)
        .service(CheckoutRoute::<C>::new())
        .service(public_order);
    let webhooks = web::scope("/webhooks")
        .wrap(SignatureMiddlewareFactory::new(webhook.secret, webhook.tolerance))
        .service(PaymentWebhookRoute::<L>::new());
    let admin = web::scope("/admin")
        .wrap(AdminSecretFactory::new(admin_secret))
        .service(admin_orders)
        .service(admin_order)
        .service(update_fulfillment)
        .service(mark_paid)
        .service(delete_order);
    cfg.service(health).service(storefront).service(webhooks).service(admin);
}

/// SQLite creates the database file on demand, but not the directory it lives in.
fn ensure_database_dir(url: &str) -> Result<(), ServerError> {
    let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
        debug!("🗃️ Database directory {} is ready", parent.display());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn database_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested/deeper/orders.db");
        ensure_database_dir(&format!("sqlite://{}", db_path.display())).unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());
        ensure_database_dir("sqlite::memory:").unwrap();
        ensure_database_dir("sqlite://orders.db?mode=rwc").unwrap();
    }

    #[tokio::test]
    async fn the_engine_starts_on_local_storage() {
        let _ = env_logger::try_init();
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.database_url = format!("sqlite://{}", dir.path().join("data/bos.db").display());
        config.object_store.orders_file = dir.path().join("data/orders.json");
        let (engine, worker) = build_engine(&config).await.unwrap();
        assert_eq!(engine.side_effects.in_flight(), 0);
        drop(worker);

        config.price_schedule_path = Some(dir.path().join("missing.json"));
        let err = build_engine(&config).await.err().unwrap();
        assert!(matches!(err, ServerError::ConfigurationError(_)));
    }
}
