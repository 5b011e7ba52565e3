//! Process host: wires the store, coordinator, aggregator and notifier
//! together, serves the API and drains the notification bus until shutdown.
//!
//! ```text
//! new_stub / new_postgres → subscribe to bus → serve API → loop { bus | ctrl-c }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use swapmeet_exec::{ExchangeCoordinator, NotificationDispatcher, RatingAggregator};
use swapmeet_store::{DocumentStore, MemoryStore};

use crate::api::{create_router, ApiState};
use crate::config::Config;
use crate::error::{DaemonError, DaemonResult};
use crate::event_bus::{DaemonEvent, EventBus};
use crate::notifier::BusNotifier;

// =============================================================================
// Daemon
// =============================================================================

/// The main Swapmeet daemon.
pub struct Daemon<S: DocumentStore + 'static> {
    /// Configuration
    config: Config,
    /// Lifecycle operations
    coordinator: Arc<ExchangeCoordinator<S, BusNotifier>>,
    /// Review submission
    ratings: Arc<RatingAggregator<S, BusNotifier>>,
    /// Event bus
    event_bus: Arc<EventBus>,
    /// Store
    store: Arc<S>,
}

impl Daemon<MemoryStore> {
    /// Create a new daemon over an in-memory store (for testing/development).
    pub fn new_stub(config: Config) -> Self {
        let store = MemoryStore::new().with_max_attempts(config.transactions.max_attempts);
        Self::new(config, Arc::new(store))
    }
}

#[cfg(feature = "postgres")]
impl Daemon<swapmeet_store::PgDocumentStore> {
    /// Connect to Postgres (`SWAPMEET_DATABASE_URL`) and create the schema.
    pub async fn new_postgres(config: Config) -> DaemonResult<Self> {
        let url = config.database_url.clone().ok_or_else(|| {
            DaemonError::Config("SWAPMEET_DATABASE_URL is required".to_string())
        })?;

        let store = swapmeet_store::PgDocumentStore::connect(&url)
            .await?
            .with_max_attempts(config.transactions.max_attempts);
        store.ensure_schema().await?;

        Ok(Self::new(config, Arc::new(store)))
    }
}

impl<S: DocumentStore + 'static> Daemon<S> {
    /// Create a new daemon over `store`.
    pub fn new(config: Config, store: Arc<S>) -> Self {
        let event_bus = Arc::new(EventBus::new(config.notifications.bus_capacity));
        let notifier = Arc::new(BusNotifier::new(Arc::clone(&event_bus)));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            notifier,
            config.notifications.in_app,
        ));

        Self {
            coordinator: Arc::new(ExchangeCoordinator::new(
                Arc::clone(&store),
                Arc::clone(&dispatcher),
            )),
            ratings: Arc::new(RatingAggregator::new(Arc::clone(&store), dispatcher)),
            config,
            event_bus,
            store,
        }
    }

    /// Get the store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the event bus.
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Run the daemon.
    ///
    /// This method blocks until shutdown is requested (SIGINT or a
    /// [`DaemonEvent::Shutdown`] on the bus).
    pub async fn run(self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            environment = %self.config.environment,
            max_attempts = self.config.transactions.max_attempts,
            "Starting Swapmeet daemon"
        );

        // Subscribe before serving so no committed notification is published
        // into an empty bus
        let mut event_receiver = self.event_bus.subscribe();

        let api_addr = self.start_api_server().await?;
        info!(%api_addr, "API server started");

        info!("Draining notification bus");
        loop {
            tokio::select! {
                event_result = event_receiver.next() => {
                    match event_result {
                        Some(Ok(event)) => {
                            if let Err(DaemonError::Shutdown) = self.handle_event(event) {
                                break;
                            }
                        },
                        Some(Err(lagged)) => {
                            warn!(%lagged, "Notification loop fell behind");
                        },
                        None => {
                            error!("Event bus closed");
                            break;
                        },
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Start the API server on the configured address.
    ///
    /// Returns the bound address (useful with port 0).
    pub async fn start_api_server(&self) -> DaemonResult<SocketAddr> {
        let state = Arc::new(ApiState {
            coordinator: Arc::clone(&self.coordinator),
            ratings: Arc::clone(&self.ratings),
        });

        let router = create_router(state);
        let addr = format!("{}:{}", self.config.api.host, self.config.api.port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| DaemonError::Config(format!("Cannot listen on {}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| DaemonError::Config(format!("Listener has no local address: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "API server stopped");
            }
        });

        Ok(local_addr)
    }

    /// Log one bus event; `Err(Shutdown)` ends the loop.
    ///
    /// Device delivery and the durable in-app inbox are external
    /// subscribers of the bus. The daemon only records what was published.
    fn handle_event(&self, event: DaemonEvent) -> DaemonResult<()> {
        match event {
            DaemonEvent::Push(push) => {
                info!(
                    recipient = %push.recipient,
                    kind = %push.kind,
                    "Push notification published"
                );
                debug!(payload = %push.payload, "Notification payload");
            },

            DaemonEvent::InApp(entry) => {
                info!(
                    recipient = %entry.recipient,
                    related_id = %entry.related_id,
                    title = %entry.title,
                    "In-app notification published"
                );
            },

            DaemonEvent::Shutdown => {
                info!("Shutdown event received");
                return Err(DaemonError::Shutdown);
            },
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
