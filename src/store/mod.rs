use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::{AppResult, Error};
use crate::models::{sort_events, Event, EventDraft};

pub mod json_file;
pub mod remote;
pub mod sqlite;

pub use json_file::JsonFileStore;
pub use remote::RemoteStore;
pub use sqlite::{SqliteStore, SqliteStoreActor};

/// Storage trait for schedule events
///
/// Every backend hands out events ordered by (date, start_time) from `list`.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Persist a new event and return it with its assigned id
    async fn create(&self, draft: &EventDraft) -> AppResult<Event>;

    /// Get a single event
    async fn get(&self, id: i64) -> AppResult<Option<Event>>;

    /// Replace every field of an existing event
    async fn update(&self, id: i64, draft: &EventDraft) -> AppResult<Event>;

    /// Delete an event
    async fn delete(&self, id: i64) -> AppResult<()>;

    /// List all events in time order
    async fn list(&self) -> AppResult<Vec<Event>>;
}

/// In-memory implementation of the store (for testing)
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: tokio::sync::RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    events: BTreeMap<i64, Event>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create(&self, draft: &EventDraft) -> AppResult<Event> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let event = Event::from_draft(inner.next_id, draft);
        inner.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get(&self, id: i64) -> AppResult<Option<Event>> {
        let inner = self.inner.read().await;
        Ok(inner.events.get(&id).cloned())
    }

    async fn update(&self, id: i64, draft: &EventDraft) -> AppResult<Event> {
        let mut inner = self.inner.write().await;
        let slot = inner.events.get_mut(&id).ok_or(Error::NotFound(id))?;
        *slot = Event::from_draft(id, draft);
        Ok(slot.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.events.remove(&id).map(|_| ()).ok_or(Error::NotFound(id))
    }

    async fn list(&self) -> AppResult<Vec<Event>> {
        let inner = self.inner.read().await;
        let mut events: Vec<Event> = inner.events.values().cloned().collect();
        sort_events(&mut events);
        Ok(events)
    }
}
