use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use fulfillment_engine::{events::EventProducers, ProviderLimiter, ProviderSyncApi, SqliteDatabase};
use log::*;
use provider_tools::{ForwardingFacade, ReqwestTransport};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::event_log::create_event_log_handlers,
    middleware::AdminTokenMiddlewareFactory,
    routes::{health, ManualSyncRoute},
    sync_worker::start_sync_worker,
};

/// Everything a [`ProviderSyncApi`] instance is built from. Every instance made from the same parts shares the
/// provider limiter, so the scheduled worker and manual runs never query a provider concurrently.
#[derive(Clone)]
pub struct SyncParts {
    pub db: SqliteDatabase,
    pub transport: ReqwestTransport,
    pub limiter: ProviderLimiter,
    pub producers: EventProducers,
}

impl SyncParts {
    pub fn sync_api(&self, config: &ServerConfig) -> ProviderSyncApi<SqliteDatabase, ReqwestTransport> {
        ProviderSyncApi::new(self.db.clone(), ForwardingFacade::new(self.transport.clone()))
            .with_config(config.sync.sync_config())
            .with_limiter(self.limiter.clone())
            .with_event_producers(self.producers.clone())
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    let transport = ReqwestTransport::new().map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_event_log_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let parts = SyncParts { db, transport, limiter: ProviderLimiter::new(), producers };
    match config.sync.interval {
        Some(interval) => {
            // The worker runs for as long as the server does
            let _worker = start_sync_worker(parts.sync_api(&config), interval, config.sync.broadcast);
        },
        None => info!("🕰️ Scheduled provider sync is disabled"),
    }
    let srv = create_server_instance(config, parts)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, parts: SyncParts) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let sync_api = parts.sync_api(&config);
        let admin_scope = web::scope("/api")
            .wrap(AdminTokenMiddlewareFactory::new(config.admin_token.clone()))
            .service(ManualSyncRoute::<SqliteDatabase, ReqwestTransport>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("panel::access_log"))
            .app_data(web::Data::new(sync_api))
            .service(health)
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
