//! Flat-file event store: a pretty-printed JSON array of events.
//!
//! Files written by older versions of the offline client are upgraded on load.
//! Two legacy record shapes exist: `{"title", "datetime": "YYYY-MM-DD HH:MM"}`
//! and `{"title", "date", "time"}`. Both become one-hour events.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::EventStore;
use crate::error::{storage_error, AppResult, Error};
use crate::models::{sort_events, Event, EventDraft};
use crate::utils::time::{one_hour_after_clamped, parse_date, parse_time};

/// Event store persisted as a single JSON file
///
/// Other processes may rewrite the file. Every operation first compares the
/// file's modification time and size with the last read or write and reloads
/// when they differ. The cached events change only after a write succeeds.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<Snapshot>,
}

/// Identifies one version of the file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

#[derive(Debug)]
struct Snapshot {
    events: Vec<Event>,
    stamp: Option<FileStamp>,
}

async fn file_stamp(path: &Path) -> AppResult<Option<FileStamp>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(FileStamp {
            modified: meta.modified()?,
            len: meta.len(),
        })),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read the file; a missing or blank file holds no events
async fn load(path: &Path) -> AppResult<Snapshot> {
    // Taken before reading, so a concurrent write shows up as a newer stamp
    let stamp = file_stamp(path).await?;

    let events = match tokio::fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Vec::new(),
        Ok(content) => decode_records(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    Ok(Snapshot { events, stamp })
}

impl JsonFileStore {
    /// Load the store from `path`; a missing file is an empty store
    pub async fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = load(&path).await?;

        if snapshot.stamp.is_none() {
            info!("Schedule file {} does not exist yet", path.display());
        }
        info!(
            "Loaded {} schedules from {}",
            snapshot.events.len(),
            path.display()
        );
        Ok(Self {
            path,
            state: RwLock::new(snapshot),
        })
    }

    /// Lock the cached state, reloading it if the file changed on disk
    async fn current(&self) -> AppResult<RwLockWriteGuard<'_, Snapshot>> {
        let mut state = self.state.write().await;
        if file_stamp(&self.path).await? != state.stamp {
            *state = load(&self.path).await?;
            debug!(
                "Reloaded {} schedules from {}",
                state.events.len(),
                self.path.display()
            );
        }
        Ok(state)
    }

    /// Write `events` to disk, then make them the cached state
    async fn commit(&self, state: &mut Snapshot, events: Vec<Event>) -> AppResult<()> {
        self.persist(&events).await?;
        // An unknown stamp forces a reload on the next operation
        state.stamp = file_stamp(&self.path).await.ok().flatten();
        state.events = events;
        Ok(())
    }

    /// Replace the event at `index` of the time-ordered listing
    pub async fn update_at(&self, index: usize, draft: &EventDraft) -> AppResult<Event> {
        let mut state = self.current().await?;
        let id = id_at(&state.events, index)?;
        self.replace(&mut state, id, draft).await
    }

    /// Remove the events at the given indices of the time-ordered listing
    ///
    /// All indices refer to the listing before any removal.
    pub async fn remove_at(&self, indices: &[usize]) -> AppResult<Vec<Event>> {
        let mut state = self.current().await?;

        let mut ids = Vec::with_capacity(indices.len());
        for &index in indices {
            let id = id_at(&state.events, index)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let (mut removed, kept): (Vec<Event>, Vec<Event>) = state
            .events
            .iter()
            .cloned()
            .partition(|event| ids.contains(&event.id));

        self.commit(&mut state, kept).await?;
        sort_events(&mut removed);
        Ok(removed)
    }

    async fn replace(&self, state: &mut Snapshot, id: i64, draft: &EventDraft) -> AppResult<Event> {
        let mut events = state.events.clone();
        let slot = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(Error::NotFound(id))?;
        *slot = Event::from_draft(id, draft);
        let updated = slot.clone();

        self.commit(state, events).await?;
        Ok(updated)
    }

    /// Write the whole file through a temp file and rename
    async fn persist(&self, events: &[Event]) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(events)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn id_at(events: &[Event], index: usize) -> AppResult<i64> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by(|a, b| (a.date, a.start_time, a.id).cmp(&(b.date, b.start_time, b.id)));
    ordered
        .get(index)
        .map(|e| e.id)
        .ok_or_else(|| storage_error(&format!("no schedule at position {}", index + 1)))
}

#[async_trait]
impl EventStore for JsonFileStore {
    async fn create(&self, draft: &EventDraft) -> AppResult<Event> {
        let mut state = self.current().await?;
        let id = state.events.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let event = Event::from_draft(id, draft);

        let mut events = state.events.clone();
        events.push(event.clone());
        self.commit(&mut state, events).await?;
        Ok(event)
    }

    async fn get(&self, id: i64) -> AppResult<Option<Event>> {
        let state = self.current().await?;
        Ok(state.events.iter().find(|e| e.id == id).cloned())
    }

    async fn update(&self, id: i64, draft: &EventDraft) -> AppResult<Event> {
        let mut state = self.current().await?;
        self.replace(&mut state, id, draft).await
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut state = self.current().await?;
        if !state.events.iter().any(|e| e.id == id) {
            return Err(Error::NotFound(id));
        }
        let events = state.events.iter().filter(|e| e.id != id).cloned().collect();
        self.commit(&mut state, events).await
    }

    async fn list(&self) -> AppResult<Vec<Event>> {
        let mut events = self.current().await?.events.clone();
        sort_events(&mut events);
        Ok(events)
    }
}

/// Any record shape the offline client has ever written
#[derive(Debug, Deserialize)]
struct StoredRecord {
    id: Option<i64>,
    title: String,
    date: Option<String>,
    time: Option<String>,
    datetime: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    reminder_time: Option<String>,
}

/// Parse the file contents, upgrading legacy records and assigning missing ids
pub fn decode_records(content: &str) -> AppResult<Vec<Event>> {
    let records: Vec<StoredRecord> = serde_json::from_str(content)
        .map_err(|e| storage_error(&format!("unreadable schedule file: {}", e)))?;

    let mut drafts = Vec::with_capacity(records.len());
    let mut legacy = 0usize;
    for (position, record) in records.into_iter().enumerate() {
        let (draft, upgraded) = upgrade_record(&record).ok_or_else(|| {
            storage_error(&format!("invalid schedule record at position {}", position + 1))
        })?;
        if upgraded {
            legacy += 1;
        }
        drafts.push((record.id, draft));
    }
    if legacy > 0 {
        warn!("Upgraded {} legacy schedule records", legacy);
    }

    let mut next_id = drafts.iter().filter_map(|(id, _)| *id).max().unwrap_or(0);
    let mut seen = HashSet::new();
    let mut events = Vec::with_capacity(drafts.len());
    for (id, draft) in drafts {
        let id = match id {
            Some(id) if seen.insert(id) => id,
            _ => {
                next_id += 1;
                seen.insert(next_id);
                next_id
            }
        };
        events.push(Event::from_draft(id, &draft));
    }
    Ok(events)
}

/// Convert one record; the flag tells whether it was a legacy shape
fn upgrade_record(record: &StoredRecord) -> Option<(EventDraft, bool)> {
    let legacy_start = match (&record.datetime, &record.date, &record.time) {
        (Some(datetime), _, _) => Some(datetime.clone()),
        (None, Some(date), Some(time)) if record.start_time.is_none() => {
            Some(format!("{} {}", date, time))
        }
        _ => None,
    };

    if let Some(raw) = legacy_start {
        let at = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M").ok()?;
        let start_time = at.time();
        let draft = EventDraft {
            title: record.title.clone(),
            date: at.date(),
            start_time,
            end_time: one_hour_after_clamped(start_time),
            reminder_time: None,
        };
        return Some((draft, true));
    }

    let draft = EventDraft {
        title: record.title.clone(),
        date: parse_date(record.date.as_deref()?)?,
        start_time: parse_time(record.start_time.as_deref()?)?,
        end_time: parse_time(record.end_time.as_deref()?)?,
        reminder_time: match record.reminder_time.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_time(raw)?),
        },
    };
    Some((draft, false))
}
