use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod config;
mod docs;
mod error;
mod model;
mod notify;
mod policy;
mod routes;
mod service;
mod store;
mod ws;

use std::sync::Arc;
use std::time::Duration;

use config::Config;
use notify::Notifier;
use policy::ShiftSchedule;
use service::DayLocks;
use service::approval::ApprovalService;
use service::permission::PermissionService;
use service::punch::PunchService;
use store::{DocumentStore, MemoryStore, MySqlStore};
use ws::ConnectionRegistry;

use crate::docs::ApiDoc;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendance service up"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store: Arc<dyn DocumentStore> = match config.store_backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        _ => Arc::new(
            MySqlStore::connect(&config.database_url)
                .await
                .expect("Failed to connect to database"),
        ),
    };

    // The registry lives for the whole server process and is handed to every
    // component that broadcasts.
    let registry = Arc::new(ConnectionRegistry::new());
    let notifier = Arc::new(Notifier::new(
        store.clone(),
        registry.clone(),
        Duration::from_secs(config.admin_cache_ttl_secs),
    ));
    // One lock map for every writer of a day aggregate.
    let day_locks = Arc::new(DayLocks::new());
    let approvals = Arc::new(ApprovalService::new(
        store.clone(),
        registry.clone(),
        notifier.clone(),
        day_locks.clone(),
    ));
    let permissions = Arc::new(PermissionService::new(
        store.clone(),
        registry.clone(),
        notifier.clone(),
    ));
    let punches = Arc::new(PunchService::new(
        store,
        registry.clone(),
        notifier.clone(),
        approvals.clone(),
        ShiftSchedule::standard(),
        day_locks,
    ));

    let warmup_notifier = notifier.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_notifier.warmup().await {
            eprintln!("Failed to warm admin cache: {:?}", e);
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::from(registry.clone()))
            .app_data(Data::from(punches.clone()))
            .app_data(Data::from(approvals.clone()))
            .app_data(Data::from(permissions.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
