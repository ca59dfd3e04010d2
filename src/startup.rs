use crate::components::reminder::{notifier_from_config, InMemoryNotifiedSet, Notifier};
use crate::components::{ComponentManager, ReminderPoller};
use crate::config::{Config, StoreBackend};
use crate::error::{AppResult, Error};
use crate::shutdown;
use crate::store::{EventStore, JsonFileStore, MemoryStore, SqliteStore};
use crate::web::{self, AppState};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, RwLock};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// The opened system of record, plus the SQLite handle when it needs stopping
pub struct OpenedStore {
    pub store: Arc<dyn EventStore>,
    pub sqlite: Option<SqliteStore>,
}

/// Open the configured event store
pub async fn open_store(config: &Config) -> AppResult<OpenedStore> {
    match config.store_backend {
        StoreBackend::Sqlite => {
            let sqlite = SqliteStore::spawn(&config.database_path)?;
            Ok(OpenedStore {
                store: Arc::new(sqlite.clone()),
                sqlite: Some(sqlite),
            })
        }
        StoreBackend::Json => {
            let store = JsonFileStore::open(&config.schedule_file).await?;
            Ok(OpenedStore {
                store: Arc::new(store),
                sqlite: None,
            })
        }
        StoreBackend::Memory => {
            info!("Using in-memory schedule store; nothing will be persisted");
            Ok(OpenedStore {
                store: Arc::new(MemoryStore::new()),
                sqlite: None,
            })
        }
    }
}

/// Start the reminder poller and the web server
pub async fn start_service(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    let snapshot = config.read().await.clone();

    let opened = open_store(&snapshot).await?;
    let notifier: Arc<dyn Notifier> = notifier_from_config(&snapshot);
    info!("Using {} notifier", notifier.name());

    // Initialize component manager
    let mut component_manager = ComponentManager::new(Arc::clone(&config));
    if snapshot.is_component_enabled("reminder_poller") {
        component_manager.register(ReminderPoller::new(
            Arc::clone(&notifier),
            Arc::new(InMemoryNotifiedSet::new()),
        ));
    } else {
        info!("Reminder poller disabled in configuration");
    }

    let component_manager = Arc::new(component_manager);
    component_manager.init_all(Arc::clone(&opened.store)).await?;

    // Create shutdown channel
    let (shutdown_send, shutdown_recv) = oneshot::channel();

    // Spawn signal handler task
    let shutdown_components = Arc::clone(&component_manager);
    tokio::spawn(async move {
        shutdown::handle_signals(shutdown_send, shutdown_components).await;
    });

    if !snapshot.is_component_enabled("web_server") {
        info!("Web server disabled in configuration; running poller only");
        let _ = shutdown_recv.await;
        stop_store(opened.sqlite).await;
        return Ok(());
    }

    let state = AppState {
        store: Arc::clone(&opened.store),
        notifier,
        notification_title: snapshot.notification_title.clone(),
    };
    let app = web::router(state);

    let addr = snapshot.listen_address();
    let listener = TcpListener::bind(&addr).await.map_err(Error::from)?;
    info!("Listening on {}", addr);

    serve_until(
        listener,
        app,
        async move {
            let _ = shutdown_recv.await;
        },
        opened.sqlite,
    )
    .await?;

    info!("Web server stopped");
    Ok(())
}

/// Serve `app` until `shutdown` completes and in-flight requests drain,
/// then stop the SQLite actor
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    sqlite: Option<SqliteStore>,
) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    stop_store(sqlite).await;
    served.map_err(Error::from)
}

async fn stop_store(sqlite: Option<SqliteStore>) {
    let Some(store) = sqlite else {
        return;
    };
    if let Err(e) = store.shutdown().await {
        error!("Error shutting down SQLite store: {:?}", e);
    } else {
        info!("SQLite store shut down successfully");
    }
}
