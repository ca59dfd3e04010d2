#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDateTime;
use schedule_reminder::components::reminder::Notifier;
use schedule_reminder::error::{notification_error, storage_error, AppResult};
use schedule_reminder::models::{Event, EventDraft, EventInput};
use schedule_reminder::store::{EventStore, MemoryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Build a validated draft from wire-format strings
pub fn draft(title: &str, date: &str, start: &str, end: &str, reminder: Option<&str>) -> EventDraft {
    EventInput {
        title: title.to_string(),
        date: date.to_string(),
        start_time: start.to_string(),
        end_time: end.to_string(),
        reminder_time: reminder.map(str::to_string),
    }
    .validate()
    .unwrap()
}

/// A stored event with the given id
pub fn event(id: i64, title: &str, date: &str, reminder: Option<&str>) -> Event {
    Event::from_draft(id, &draft(title, date, "09:00", "09:30", reminder))
}

/// Parse "YYYY-MM-DD HH:MM[:SS]"
pub fn at(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .unwrap()
}

/// Notifier that records every call
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn bodies(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, b)| b.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, title: &str, body: &str) -> AppResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Notifier that fails its first `failures` calls, then succeeds
#[derive(Debug, Default)]
pub struct FlakyNotifier {
    pub failures: usize,
    pub attempts: AtomicUsize,
}

impl FlakyNotifier {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for FlakyNotifier {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn notify(&self, _title: &str, _body: &str) -> AppResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            Err(notification_error("toast service unavailable"))
        } else {
            Ok(())
        }
    }
}

/// Store whose every operation fails
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl EventStore for UnavailableStore {
    async fn create(&self, _draft: &EventDraft) -> AppResult<Event> {
        Err(storage_error("database is locked"))
    }

    async fn get(&self, _id: i64) -> AppResult<Option<Event>> {
        Err(storage_error("database is locked"))
    }

    async fn update(&self, _id: i64, _draft: &EventDraft) -> AppResult<Event> {
        Err(storage_error("database is locked"))
    }

    async fn delete(&self, _id: i64) -> AppResult<()> {
        Err(storage_error("database is locked"))
    }

    async fn list(&self) -> AppResult<Vec<Event>> {
        Err(storage_error("database is locked"))
    }
}

/// In-memory store whose first `failures` listings fail
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failures: usize,
    pub listings: AtomicUsize,
}

impl FlakyStore {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    async fn create(&self, draft: &EventDraft) -> AppResult<Event> {
        self.inner.create(draft).await
    }

    async fn get(&self, id: i64) -> AppResult<Option<Event>> {
        self.inner.get(id).await
    }

    async fn update(&self, id: i64, draft: &EventDraft) -> AppResult<Event> {
        self.inner.update(id, draft).await
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> AppResult<Vec<Event>> {
        let listing = self.listings.fetch_add(1, Ordering::SeqCst);
        if listing < self.failures {
            return Err(storage_error("database is locked"));
        }
        self.inner.list().await
    }
}
