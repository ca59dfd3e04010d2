//! SQLite-backed event store.
//!
//! A single actor owns the `rusqlite::Connection` and runs on the blocking
//! thread pool. Handles talk to it over an mpsc mailbox, so every statement is
//! serialized through one connection.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use super::EventStore;
use crate::error::{storage_error, AppResult, Error};
use crate::models::{Event, EventDraft};
use crate::utils::time::{format_date, format_time, parse_date, parse_time};

/// Schema migrations, applied in order; index + 1 is the schema version
const MIGRATIONS: &[&str] = &["CREATE TABLE IF NOT EXISTS schedules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        date TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        reminder_time TEXT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_schedules_date_start ON schedules (date, start_time);"];

const SELECT_SQL: &str =
    "SELECT id, title, date, start_time, end_time, reminder_time FROM schedules";

/// Commands that can be sent to the SQLite actor
pub enum StoreCommand {
    Create(EventDraft, mpsc::Sender<AppResult<Event>>),
    Get(i64, mpsc::Sender<AppResult<Option<Event>>>),
    Update(i64, EventDraft, mpsc::Sender<AppResult<Event>>),
    Delete(i64, mpsc::Sender<AppResult<()>>),
    List(mpsc::Sender<AppResult<Vec<Event>>>),
    Shutdown,
}

/// The SQLite actor that processes store commands
pub struct SqliteStoreActor {
    conn: Connection,
    command_rx: mpsc::Receiver<StoreCommand>,
}

/// Handle for communicating with the SQLite actor
#[derive(Clone)]
pub struct SqliteStore {
    command_tx: mpsc::Sender<StoreCommand>,
}

impl SqliteStoreActor {
    /// Open a database file and create the actor and its handle
    pub fn open(path: impl AsRef<Path>) -> AppResult<(Self, SqliteStore)> {
        let path = path.as_ref();
        info!("Opening schedule database at {}", path.display());
        let conn = Connection::open(path).map_err(|e| {
            error!("Failed to open schedule database {}: {}", path.display(), e);
            Error::from(e)
        })?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> AppResult<(Self, SqliteStore)> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(mut conn: Connection) -> AppResult<(Self, SqliteStore)> {
        conn.busy_timeout(Duration::from_secs(5))?;
        apply_migrations(&mut conn)?;

        let (command_tx, command_rx) = mpsc::channel(32);
        Ok((Self { conn, command_rx }, SqliteStore { command_tx }))
    }

    /// Run the actor until shutdown or until every handle is dropped
    ///
    /// Blocks the calling thread.
    pub fn run(mut self) {
        info!("SQLite store actor started");

        while let Some(command) = self.command_rx.blocking_recv() {
            match command {
                StoreCommand::Create(draft, response_tx) => {
                    let _ = response_tx.blocking_send(self.insert(&draft));
                }
                StoreCommand::Get(id, response_tx) => {
                    let _ = response_tx.blocking_send(self.select_one(id));
                }
                StoreCommand::Update(id, draft, response_tx) => {
                    let _ = response_tx.blocking_send(self.replace(id, &draft));
                }
                StoreCommand::Delete(id, response_tx) => {
                    let _ = response_tx.blocking_send(self.remove(id));
                }
                StoreCommand::List(response_tx) => {
                    let _ = response_tx.blocking_send(self.select_all());
                }
                StoreCommand::Shutdown => {
                    info!("SQLite store actor shutting down");
                    break;
                }
            }
        }

        info!("SQLite store actor shut down");
    }

    fn insert(&self, draft: &EventDraft) -> AppResult<Event> {
        self.conn.execute(
            "INSERT INTO schedules (title, date, start_time, end_time, reminder_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draft.title,
                format_date(&draft.date),
                format_time(&draft.start_time),
                format_time(&draft.end_time),
                draft.reminder_time.as_ref().map(format_time),
            ],
        )?;
        Ok(Event::from_draft(self.conn.last_insert_rowid(), draft))
    }

    fn select_one(&self, id: i64) -> AppResult<Option<Event>> {
        let raw = self
            .conn
            .query_row(&format!("{SELECT_SQL} WHERE id = ?1"), params![id], RawRow::read)
            .optional()?;
        raw.map(RawRow::into_event).transpose()
    }

    fn replace(&self, id: i64, draft: &EventDraft) -> AppResult<Event> {
        let changed = self.conn.execute(
            "UPDATE schedules
             SET title = ?1, date = ?2, start_time = ?3, end_time = ?4, reminder_time = ?5
             WHERE id = ?6",
            params![
                draft.title,
                format_date(&draft.date),
                format_time(&draft.start_time),
                format_time(&draft.end_time),
                draft.reminder_time.as_ref().map(format_time),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(Event::from_draft(id, draft))
    }

    fn remove(&self, id: i64) -> AppResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM schedules WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    fn select_all(&self) -> AppResult<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_SQL} ORDER BY date, start_time, id"))?;
        let rows = stmt.query_map([], RawRow::read)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }
}

impl SqliteStore {
    /// Open a database file and spawn its actor on the blocking pool
    pub fn spawn(path: impl AsRef<Path>) -> AppResult<Self> {
        let (actor, handle) = SqliteStoreActor::open(path)?;
        tokio::task::spawn_blocking(move || actor.run());
        Ok(handle)
    }

    /// Spawn an actor over a fresh in-memory database
    pub fn spawn_in_memory() -> AppResult<Self> {
        let (actor, handle) = SqliteStoreActor::open_in_memory()?;
        tokio::task::spawn_blocking(move || actor.run());
        Ok(handle)
    }

    /// Stop the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        self.command_tx
            .send(StoreCommand::Shutdown)
            .await
            .map_err(|e| storage_error(&format!("Actor mailbox error: {}", e)))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(mpsc::Sender<AppResult<T>>) -> StoreCommand,
    ) -> AppResult<T> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(build(response_tx))
            .await
            .map_err(|e| storage_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| storage_error("Response channel closed"))?
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn create(&self, draft: &EventDraft) -> AppResult<Event> {
        let draft = draft.clone();
        self.request(|tx| StoreCommand::Create(draft, tx)).await
    }

    async fn get(&self, id: i64) -> AppResult<Option<Event>> {
        self.request(|tx| StoreCommand::Get(id, tx)).await
    }

    async fn update(&self, id: i64, draft: &EventDraft) -> AppResult<Event> {
        let draft = draft.clone();
        self.request(|tx| StoreCommand::Update(id, draft, tx)).await
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        self.request(|tx| StoreCommand::Delete(id, tx)).await
    }

    async fn list(&self) -> AppResult<Vec<Event>> {
        self.request(StoreCommand::List).await
    }
}

/// Current schema version of the database
pub fn schema_version(conn: &Connection) -> AppResult<u32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Latest schema version this build knows about
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

fn apply_migrations(conn: &mut Connection) -> AppResult<()> {
    let current = schema_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(storage_error(&format!(
            "database schema version {} is newer than supported {}",
            current, latest
        )));
    }

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let version = index as u32 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        info!("Applied schedule database migration {}", version);
    }

    Ok(())
}

/// Text columns as stored, before parsing
struct RawRow {
    id: i64,
    title: String,
    date: String,
    start_time: String,
    end_time: String,
    reminder_time: Option<String>,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            date: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            reminder_time: row.get(5)?,
        })
    }

    fn into_event(self) -> AppResult<Event> {
        let invalid = |field: &str, value: &str| {
            storage_error(&format!(
                "invalid persisted {} for schedule {}: {}",
                field, self.id, value
            ))
        };

        let date = parse_date(&self.date).ok_or_else(|| invalid("date", &self.date))?;
        let start_time =
            parse_time(&self.start_time).ok_or_else(|| invalid("start_time", &self.start_time))?;
        let end_time =
            parse_time(&self.end_time).ok_or_else(|| invalid("end_time", &self.end_time))?;
        let reminder_time = match self.reminder_time.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_time(raw).ok_or_else(|| invalid("reminder_time", raw))?),
        };

        Ok(Event {
            id: self.id,
            title: self.title.clone(),
            date,
            start_time,
            end_time,
            reminder_time,
        })
    }
}
