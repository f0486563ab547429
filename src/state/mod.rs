//! Central application state shared across routes and services.

pub mod directory;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{broker_store::BrokerStore, models::GameKind},
    error::ServiceError,
    games::city::catalog::Catalog,
};

pub use directory::{ConnectionId, PeerHandle, SessionDirectory};

pub type SharedState = Arc<AppState>;

/// Central application state storing live connections and database handles.
pub struct AppState {
    store: RwLock<Option<Arc<dyn BrokerStore>>>,
    directory: SessionDirectory,
    catalog: Arc<Catalog>,
    config: AppConfig,
    channel_kinds: DashMap<i64, GameKind>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, catalog: Catalog) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            directory: SessionDirectory::new(),
            catalog: Arc::new(catalog),
            config,
            channel_kinds: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn BrokerStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the store, failing with a degraded-mode error when none is installed.
    pub async fn require_store(&self) -> Result<Arc<dyn BrokerStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a storage backend and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn BrokerStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current storage backend and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Registry of live socket connections.
    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    /// The simulation catalog in use.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.clone()
    }

    /// Immutable application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Which game an activity channel runs, cached after the first lookup.
    ///
    /// Channels without stored configuration default to the case game.
    pub async fn channel_kind(&self, cmid: i64) -> Result<GameKind, ServiceError> {
        if let Some(kind) = self.channel_kinds.get(&cmid) {
            return Ok(*kind);
        }
        let store = self.require_store().await?;
        let kind = store
            .find_channel_config(cmid)
            .await?
            .map(|config| config.game)
            .unwrap_or(GameKind::Cases);
        self.channel_kinds.insert(cmid, kind);
        Ok(kind)
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}
