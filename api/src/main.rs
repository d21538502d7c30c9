use api::middleware::log_request;
use api::routes::routes;
use api::services::token_issuer::TokenIssuer;
use api::state::AppState;
use axum::{
    Router,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    middleware::from_fn,
};
use db::token_store::{MemoryTokenStore, SeaOrmTokenStore, TokenStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_appender::rolling;
use util::clock::{Clock, SystemClock};
use util::config::{self, TokenStoreKind};

#[tokio::main]
async fn main() {
    // Load configuration and initialize logging
    let _log_guard = init_logging(&config::log_file(), &config::log_level());

    // QR targets must be buildable before anything is issued
    let issuer = TokenIssuer::new(config::public_base_url());
    if let Err(reason) = issuer.validate() {
        panic!("Cannot start without a usable public base URL: {reason}");
    }

    let store: Arc<dyn TokenStore> = match config::token_store() {
        TokenStoreKind::Database => Arc::new(SeaOrmTokenStore::new(
            db::connect().await.expect("Failed to connect to database"),
        )),
        TokenStoreKind::Memory => {
            tracing::warn!("Using in-memory token store; tokens are lost on restart");
            Arc::new(MemoryTokenStore::new())
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match store.purge_expired(clock.now()).await {
        Ok(purged) => tracing::info!(purged, "Purged expired attendance tokens"),
        Err(err) => tracing::warn!(error = %err, "Could not purge expired attendance tokens"),
    }

    let app_state = AppState::new(store, clock, issuer);

    // Configure middleware
    let cors = CorsLayer::very_permissive().expose_headers([CONTENT_DISPOSITION, CONTENT_TYPE]);

    // Build app router
    let app = Router::new()
        .nest("/api", routes(app_state))
        .layer(from_fn(log_request))
        .layer(cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config::host(), config::port())
        .parse()
        .expect("Invalid address");

    println!(
        "Starting {} on http://{}:{} (QR codes point at {})",
        config::project_name(),
        config::host(),
        config::port(),
        config::public_base_url()
    );

    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server crashed");
}

fn init_logging(log_file: &str, log_level: &str) -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let file_appender = rolling::daily("logs", log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(true);

    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("api=info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if config::log_to_stdout() {
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    guard
}
