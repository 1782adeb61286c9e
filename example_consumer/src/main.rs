//! Example consumer: serves the resources declared in a JSON contract over PostgreSQL.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Env: `DATABASE_URL`, `MODEL_CONTRACT_CONFIG` (default `example_consumer/resources.json`),
//! `BIND_ADDR` (default `127.0.0.1:3000`).

use model_contract::{app_router, ensure_database_exists, load_from_path, resolve, AppState, PgStore};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("model_contract=info")),
        )
        .init();

    let config_path = std::env::var("MODEL_CONTRACT_CONFIG")
        .unwrap_or_else(|_| "example_consumer/resources.json".into());
    let config = load_from_path(&config_path).await?;
    let contract = resolve(&config)?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/model_contract".into());
    ensure_database_exists(&database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let prefix = contract.settings.route_prefix.clone();
    let state = AppState::new(contract, Arc::new(PgStore::new(pool)));
    let app = app_router(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}/{}", listener.local_addr()?, prefix);
    axum::serve(listener, app).await?;
    Ok(())
}
