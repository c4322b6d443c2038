use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pawprint::app::counters::CounterSynchronizer;
use pawprint::app::identity::AccessTokens;
use pawprint::config::{AppConfig, AppMode};
use pawprint::infra::{
    db::Db,
    queue::QueueClient,
    storage::{InMemoryMediaStore, MediaStore, ObjectStorage},
    store::{MemoryStore, PgStore, Store},
};
use pawprint::{http, jobs, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let db = Db::connect(&config, database_url).await?;
            db.migrate().await?;
            Arc::new(PgStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let media: Arc<dyn MediaStore> = match &config.s3 {
        Some(s3) => Arc::new(ObjectStorage::new(s3).await?),
        None => {
            tracing::warn!("S3 not configured, media is kept in memory");
            Arc::new(InMemoryMediaStore::new())
        }
    };

    let state = AppState {
        store: store.clone(),
        media,
        tokens: AccessTokens::new(config.paseto_access_key),
        admin_token: config.admin_token.clone(),
        upload_max_bytes: config.upload_max_bytes,
        story_ttl: time::Duration::hours(config.story_ttl_hours),
    };

    match config.app_mode {
        AppMode::Api => {
            let timeout = Duration::from_secs(config.request_timeout_seconds);
            let app = http::router(state, timeout).layer(TraceLayer::new_for_http());
            let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
            tracing::info!("listening on {}", config.http_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        AppMode::Worker => {
            let queue_config = config
                .queue
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("worker mode requires a queue"))?;
            let queue = QueueClient::new(queue_config).await?;
            tracing::info!("starting worker mode");
            tokio::select! {
                result = jobs::payment_events::run(store, queue) => {
                    result?;
                }
                _ = shutdown_signal() => {}
            }
        }
        AppMode::Reconcile => {
            let report = CounterSynchronizer::new(store).reconcile().await?;
            tracing::info!(
                scanned = report.scanned,
                corrected = report.corrected,
                "counter reconciliation finished"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
