use crate::config::Config;
use crate::error::AppResult;
use crate::store::EventStore;
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

pub mod reminder;

pub use reminder::ReminderPoller;

/// A long-running part of the service started after the store is open
#[async_trait]
pub trait Component: Send + Sync + Any {
    /// Name used in `config/components.toml`
    fn name(&self) -> &'static str;

    async fn init(&self, config: Arc<RwLock<Config>>, store: Arc<dyn EventStore>) -> AppResult<()>;

    /// Shutdown the component
    async fn shutdown(&self) -> AppResult<()>;

    /// Convert to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Owns the registered components and drives their lifecycle
pub struct ComponentManager {
    components: Vec<Box<dyn Component>>,
    config: Arc<RwLock<Config>>,
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("component_count", &self.components.len())
            .field("config", &self.config)
            .finish()
    }
}

impl ComponentManager {
    pub fn new(config: Arc<RwLock<Config>>) -> Self {
        Self {
            components: Vec::new(),
            config,
        }
    }

    /// Register a component; components start in registration order
    pub fn register<T: Component + 'static>(&mut self, component: T) {
        info!("Registering component: {}", component.name());
        self.components.push(Box::new(component));
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Start every component against the shared store
    ///
    /// A component that fails to start is logged and skipped.
    pub async fn init_all(&self, store: Arc<dyn EventStore>) -> AppResult<()> {
        let mut failed = 0usize;
        for component in &self.components {
            debug!("Starting component {}", component.name());
            if let Err(e) = component
                .init(Arc::clone(&self.config), Arc::clone(&store))
                .await
            {
                failed += 1;
                error!("Component {} failed to start: {:?}", component.name(), e);
            }
        }

        info!(
            "Started {} of {} components",
            self.components.len() - failed,
            self.components.len()
        );
        Ok(())
    }

    /// Stop every component, last registered first
    pub async fn shutdown_all(&self) -> AppResult<()> {
        for component in self.components.iter().rev() {
            info!("Stopping component {}", component.name());
            if let Err(e) = component.shutdown().await {
                error!("Component {} failed to stop: {:?}", component.name(), e);
            }
        }
        Ok(())
    }

    pub fn get_component_by_name(&self, name: &str) -> Option<&dyn Component> {
        self.components
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }
}
