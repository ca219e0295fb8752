//! Server entry point: configuration, database pool, engine composition,
//! and the HTTP listener.

mod config;
mod db;
mod error;
mod identity;
mod routes;
mod user;

use crate::config::ServerConfig;
use crate::db::{ConversationRepository, MessageRepository};
use crate::routes::AppState;
use crate::user::UserRepository;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use stepwise_ai::OpenAiCompatibleBackend;
use stepwise_conversation::{ContextWindow, ExchangeEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    // Compose the engine: stores and backend are injected here; their
    // lifecycles belong to this composition root.
    let backend =
        OpenAiCompatibleBackend::new(config.llm).expect("invalid LLM backend configuration");
    let engine = ExchangeEngine::new(
        ConversationRepository::new(db_pool.clone()),
        MessageRepository::new(db_pool.clone()),
        backend,
        ContextWindow::new(config.context.max_history),
    );

    let state = AppState {
        engine: Arc::new(engine),
        users: UserRepository::new(db_pool),
    };

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .await
        .expect("server error");
}
