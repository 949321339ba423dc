use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

use crate::{
    app_state::AppState,
    domain::{
        clock::SystemClock,
        search::{repository::PgCatalogStore, run_compatibility_worker, CatalogSearchService},
    },
};

mod app_state;
mod config;
mod domain;
mod router;
mod routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("catalog_api=debug,tower_http=info,info")),
        )
        .with_timer(LocalTime::rfc_3339())
        .init();

    let settings = config::read_config().context("Failed to read configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(settings.database.with_db())
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let search_service = CatalogSearchService::new(
        PgCatalogStore::new(pool),
        Arc::new(SystemClock),
        settings.search.search_config(),
    );
    search_service
        .cache()
        .start_sweeper(settings.search.cache_sweep_interval());

    let app_state = AppState::new(search_service);

    if let Some(interval) = settings.search.refresh_interval() {
        tokio::spawn(run_compatibility_worker(
            Arc::clone(&app_state.search_service),
            interval,
        ));
    } else {
        tracing::info!("Periodic compatibility refresh disabled");
    }

    let app = router::create(app_state.clone(), &settings);

    let addr = format!("{}:{}", settings.application.host, settings.application.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    app_state.search_service.cache().dispose();
    tracing::info!("Search cache disposed, shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
