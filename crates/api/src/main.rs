use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use helpdesk_db::{PgStore, Store};
use helpdesk_desk::MemoryStore;
use helpdesk_events::{ChangeBus, PgChangeListener};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpdesk_api::config::{ServerConfig, StoreBackend};
use helpdesk_api::router::build_app_router;
use helpdesk_api::state::AppState;
use helpdesk_api::ws;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = ?config.store_backend,
        "Loaded server configuration"
    );

    let cancel = CancellationToken::new();
    let bus = Arc::new(ChangeBus::default());

    // --- Store ---
    let (store, listener_handle): (Arc<dyn Store>, Option<JoinHandle<()>>) =
        match config.store_backend {
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .expect("DATABASE_URL must be set");

                let pool = helpdesk_db::create_pool(database_url)
                    .await
                    .expect("Failed to connect to database");
                tracing::info!("Database connection pool created");

                helpdesk_db::health_check(&pool)
                    .await
                    .expect("Database health check failed");

                helpdesk_db::run_migrations(&pool)
                    .await
                    .expect("Failed to run database migrations");
                tracing::info!("Database migrations applied");

                // Bridge LISTEN/NOTIFY row changes onto the in-process bus.
                let listener = PgChangeListener::new(pool.clone(), Arc::clone(&bus));
                let listener_cancel = cancel.clone();
                let handle = tokio::spawn(async move {
                    if let Err(e) = listener.run(listener_cancel).await {
                        tracing::error!(error = %e, "Change listener stopped");
                    }
                });

                let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
                (store, Some(handle))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on exit");
                let store: Arc<dyn Store> = Arc::new(MemoryStore::new().with_bus(Arc::clone(&bus)));
                (store, None)
            }
        };

    // --- WebSocket manager + heartbeat ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager), cancel.clone());

    // --- App state ---
    let state = AppState {
        store,
        bus: Arc::clone(&bus),
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    cancel.cancel();
    let _ = tokio::time::timeout(grace, heartbeat_handle).await;
    if let Some(handle) = listener_handle {
        let _ = tokio::time::timeout(grace, handle).await;
        tracing::info!("Change listener stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM (on Unix) to start graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
