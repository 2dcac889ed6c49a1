// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use exam_backend::config::Config;
use exam_backend::routes;
use exam_backend::seed::{seed_admin_user, seed_exams};
use exam_backend::state::AppState;
use exam_backend::store::{MemoryStore, Repository};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: Arc<dyn Repository> = Arc::new(MemoryStore::new());

    if config.seed_exams {
        seed_exams(store.as_ref()).await?;
    }

    // Seed Admin User
    if let Err(e) = seed_admin_user(store.as_ref(), &config).await {
        tracing::error!("Failed to seed admin user: {}", e);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let state = AppState::new(store, config);

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    // Start the server
    axum::serve(listener, app).await?;
    Ok(())
}
