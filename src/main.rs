//! Aula broker binary entrypoint wiring REST, WebSocket, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aula_broker::{
    config::AppConfig,
    dao::broker_store::memory::MemoryStore,
    games::city::catalog::Catalog,
    routes,
    services::scheduler,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let catalog = load_catalog(&config);
    let app_state = AppState::new(config, catalog);

    install_store(&app_state).await;
    tokio::spawn(scheduler::run(app_state.clone()));

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the storage backend: MongoDB when `MONGO_URI` is set, an in-process
/// store otherwise.
async fn install_store(state: &SharedState) {
    #[cfg(feature = "mongo-store")]
    if env::var("MONGO_URI").is_ok() {
        tokio::spawn(run_mongo_supervisor(state.clone()));
        return;
    }

    warn!("MONGO_URI not set; using the in-process memory store");
    state.install_store(Arc::new(MemoryStore::new())).await;
}

/// Supervises the MongoDB connection by retrying in the background and toggling
/// degraded mode when connectivity changes.
#[cfg(feature = "mongo-store")]
async fn run_mongo_supervisor(state: SharedState) {
    use std::time::Duration;

    use aula_broker::dao::broker_store::mongodb::{MongoBrokerStore, MongoConfig};
    use tokio::time::sleep;
    use tracing::error;

    let initial_delay_ms = 1000;
    let mut delay = Duration::from_millis(initial_delay_ms);
    let max_delay = Duration::from_secs(10);

    loop {
        if let Some(store) = state.store().await {
            match store.health_check().await {
                Ok(()) => {
                    // Healthy connection: reset the retry backoff and avoid
                    // hammering the database with pings.
                    delay = Duration::from_millis(initial_delay_ms);
                    sleep(Duration::from_secs(5)).await;
                }
                Err(ping_err) => {
                    warn!(error = %ping_err, "MongoDB ping failed; attempting reconnect");
                    if let Err(err) = store.try_reconnect().await {
                        // Reconnect failed too: drop the store, flip to
                        // degraded mode, and retry with exponential backoff.
                        warn!(error = %err, "MongoDB reconnect failed; entering degraded mode");
                        state.clear_store().await;
                        sleep(delay).await;
                        delay = (delay * 2).min(max_delay);
                    }
                }
            }
            continue;
        }

        match MongoConfig::from_env().await {
            Ok(config) => match MongoBrokerStore::connect(config).await {
                Ok(store) => {
                    info!("connected to MongoDB; leaving degraded mode");
                    state.install_store(Arc::new(store)).await;
                    delay = Duration::from_millis(initial_delay_ms);
                }
                Err(err) => {
                    warn!(error = %err, "MongoDB connection attempt failed");
                    sleep(delay).await;
                    delay = (delay * 2).min(max_delay);
                }
            },
            Err(err) => {
                // A bad URI never heals on its own, but the supervisor keeps
                // retrying so a corrected environment is picked up on restart.
                error!(%err, "invalid MongoDB configuration");
                sleep(max_delay).await;
            }
        }
    }
}

/// Load the simulation catalog from the configured path, falling back to the
/// built-in one.
fn load_catalog(config: &AppConfig) -> Catalog {
    let Some(path) = config.catalog_path.as_deref() else {
        return Catalog::default();
    };

    match Catalog::from_file(path) {
        Ok(catalog) => {
            info!(path = %path.display(), "loaded simulation catalog");
            catalog
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to load catalog; using the built-in one"
            );
            Catalog::default()
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
