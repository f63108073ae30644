// crates/proctor-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Record Store
// Description: Durable RecordStore backed by SQLite WAL.
// Purpose: Persist sessions and events with ordered reads and atomic ends.
// Dependencies: proctor-core, rusqlite, serde, thiserror, time
// ============================================================================

//! ## Overview
//! Sessions and events live in two tables. Event order is the timestamp key
//! then the implicit `rowid`, so equal timestamps read back in insertion order.
//! Ending a session is a conditional update guarded by `end_time IS NULL`, so
//! concurrent end requests can never overwrite the first recorded end time.
//!
//! Timestamps are stored as RFC 3339 text for reads and as a pair of integer
//! keys (unix seconds, subsecond nanoseconds) for ordering. Writes reject any
//! timestamp that cannot round-trip through the text form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use proctor_core::Event;
use proctor_core::EventId;
use proctor_core::RecordStore;
use proctor_core::Session;
use proctor_core::SessionId;
use proctor_core::StoreError;
use proctor_core::format_timestamp;
use proctor_core::parse_timestamp;
use proctor_core::storable_timestamp;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 2;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Column list for session reads.
const SESSION_COLUMNS: &str = "id, candidate_name, start_time, end_time, video_path";
/// Column list for event reads.
const EVENT_COLUMNS: &str = "id, session_id, event_type, message, timestamp";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` record store.
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row cannot be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Store(message)
            }
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Maps a rusqlite error into a store error.
fn db_err(err: &rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed record store with WAL support.
#[derive(Clone)]
pub struct SqliteRecordStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Opens an `SQLite`-backed record store, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Inserts a session row.
    fn insert_session_row(&self, session: &Session) -> Result<(), SqliteStoreError> {
        let start_time = checked_timestamp(session.start_time)?;
        let end_time = session.end_time.map(checked_timestamp).transpose()?;
        let (start_secs, start_nanos) = sort_key(start_time);
        let guard = self.lock()?;
        let exists: Option<i64> = guard
            .query_row("SELECT 1 FROM sessions WHERE id = ?1", params![session.id.as_str()], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|err| db_err(&err))?;
        if exists.is_some() {
            return Err(SqliteStoreError::Invalid(format!("duplicate session id: {}", session.id)));
        }
        guard
            .execute(
                "INSERT INTO sessions (id, candidate_name, start_time, start_key, start_nanos, \
                 end_time, video_path) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session.id.as_str(),
                    session.candidate_name,
                    format_timestamp(start_time),
                    start_secs,
                    start_nanos,
                    end_time.map(format_timestamp),
                    session.video_path,
                ],
            )
            .map_err(|err| db_err(&err))?;
        Ok(())
    }

    /// Loads a session row through an existing connection.
    fn load_session(
        connection: &Connection,
        id: &SessionId,
    ) -> Result<Option<Session>, SqliteStoreError> {
        let raw = connection
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id.as_str()],
                RawSession::from_row,
            )
            .optional()
            .map_err(|err| db_err(&err))?;
        raw.map(RawSession::decode).transpose()
    }

    /// Lists all sessions newest first.
    fn list_session_rows(&self) -> Result<Vec<Session>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY start_key DESC, start_nanos \
                 DESC, rowid ASC"
            ))
            .map_err(|err| db_err(&err))?;
        let rows = statement
            .query_map(params![], RawSession::from_row)
            .map_err(|err| db_err(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_err(&err))?;
        rows.into_iter().map(RawSession::decode).collect()
    }

    /// Sets the end time when unset and returns the stored session.
    fn end_session_row(
        &self,
        id: &SessionId,
        at: OffsetDateTime,
    ) -> Result<Option<Session>, SqliteStoreError> {
        let at = checked_timestamp(at)?;
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| db_err(&err))?;
        let Some(mut session) = Self::load_session(&tx, id)? else {
            return Ok(None);
        };
        if session.end(at) {
            let end_time = session.end_time.map(format_timestamp);
            tx.execute(
                "UPDATE sessions SET end_time = ?2 WHERE id = ?1 AND end_time IS NULL",
                params![id.as_str(), end_time],
            )
            .map_err(|err| db_err(&err))?;
        }
        let stored = Self::load_session(&tx, id)?;
        tx.commit().map_err(|err| db_err(&err))?;
        Ok(stored)
    }

    /// Replaces the video reference and returns the stored session.
    fn set_video_path_row(
        &self,
        id: &SessionId,
        video_path: &str,
    ) -> Result<Option<Session>, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| db_err(&err))?;
        let updated = tx
            .execute(
                "UPDATE sessions SET video_path = ?2 WHERE id = ?1",
                params![id.as_str(), video_path],
            )
            .map_err(|err| db_err(&err))?;
        let stored = if updated == 0 { None } else { Self::load_session(&tx, id)? };
        tx.commit().map_err(|err| db_err(&err))?;
        Ok(stored)
    }

    /// Inserts an event row.
    fn insert_event_row(&self, event: &Event) -> Result<(), SqliteStoreError> {
        let timestamp = checked_timestamp(event.timestamp)?;
        let (timestamp_secs, timestamp_nanos) = sort_key(timestamp);
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO events (id, session_id, event_type, message, timestamp, \
                 timestamp_key, timestamp_nanos) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.id.as_str(),
                    event.session_id.as_str(),
                    event.event_type,
                    event.message,
                    format_timestamp(timestamp),
                    timestamp_secs,
                    timestamp_nanos,
                ],
            )
            .map_err(|err| match err.sqlite_error_code() {
                Some(rusqlite::ErrorCode::ConstraintViolation) => {
                    SqliteStoreError::Invalid(format!("event rejected: {err}"))
                }
                _ => db_err(&err),
            })?;
        Ok(())
    }

    /// Lists a session's events in timestamp then insertion order.
    fn list_event_rows(&self, session_id: &SessionId) -> Result<Vec<Event>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE session_id = ?1 ORDER BY \
                 timestamp_key ASC, timestamp_nanos ASC, rowid ASC"
            ))
            .map_err(|err| db_err(&err))?;
        let rows = statement
            .query_map(params![session_id.as_str()], RawEvent::from_row)
            .map_err(|err| db_err(&err))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| db_err(&err))?;
        rows.into_iter().map(RawEvent::decode).collect()
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        self.insert_session_row(session).map_err(StoreError::from)
    }

    fn get_session(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        Self::load_session(&guard, id).map_err(StoreError::from)
    }

    fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        self.list_session_rows().map_err(StoreError::from)
    }

    fn end_session(
        &self,
        id: &SessionId,
        at: OffsetDateTime,
    ) -> Result<Option<Session>, StoreError> {
        self.end_session_row(id, at).map_err(StoreError::from)
    }

    fn set_video_path(
        &self,
        id: &SessionId,
        video_path: &str,
    ) -> Result<Option<Session>, StoreError> {
        self.set_video_path_row(id, video_path).map_err(StoreError::from)
    }

    fn insert_event(&self, event: &Event) -> Result<(), StoreError> {
        self.insert_event_row(event).map_err(StoreError::from)
    }

    fn list_events(&self, session_id: &SessionId) -> Result<Vec<Event>, StoreError> {
        self.list_event_rows(session_id).map_err(StoreError::from)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = self.lock().map_err(StoreError::from)?;
        guard
            .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get::<_, i64>(0))
            .map(|_| ())
            .map_err(|err| StoreError::from(db_err(&err)))
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Undecoded session row.
struct RawSession {
    /// Session identifier.
    id: String,
    /// Candidate display name.
    candidate_name: String,
    /// RFC 3339 start time.
    start_time: String,
    /// RFC 3339 end time.
    end_time: Option<String>,
    /// Video reference.
    video_path: Option<String>,
}

impl RawSession {
    /// Reads a row selected with [`SESSION_COLUMNS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            candidate_name: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            video_path: row.get(4)?,
        })
    }

    /// Decodes timestamps into a session.
    fn decode(self) -> Result<Session, SqliteStoreError> {
        let start_time = decode_timestamp(&self.id, &self.start_time)?;
        let end_time =
            self.end_time.as_deref().map(|value| decode_timestamp(&self.id, value)).transpose()?;
        Ok(Session {
            id: SessionId::new(self.id),
            candidate_name: self.candidate_name,
            start_time,
            end_time,
            video_path: self.video_path,
        })
    }
}

/// Undecoded event row.
struct RawEvent {
    /// Event identifier.
    id: String,
    /// Owning session identifier.
    session_id: String,
    /// Raw event type.
    event_type: String,
    /// Optional message.
    message: Option<String>,
    /// RFC 3339 timestamp.
    timestamp: String,
}

impl RawEvent {
    /// Reads a row selected with [`EVENT_COLUMNS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            session_id: row.get(1)?,
            event_type: row.get(2)?,
            message: row.get(3)?,
            timestamp: row.get(4)?,
        })
    }

    /// Decodes the timestamp into an event.
    fn decode(self) -> Result<Event, SqliteStoreError> {
        let timestamp = decode_timestamp(&self.id, &self.timestamp)?;
        Ok(Event {
            id: EventId::new(self.id),
            session_id: SessionId::new(self.session_id),
            event_type: self.event_type,
            message: self.message,
            timestamp,
        })
    }
}

/// Parses a stored timestamp, failing closed on malformed text.
fn decode_timestamp(owner: &str, value: &str) -> Result<OffsetDateTime, SqliteStoreError> {
    parse_timestamp(value)
        .map_err(|err| SqliteStoreError::Corrupt(format!("bad timestamp for {owner}: {err}")))
}

/// Normalizes a timestamp to UTC, rejecting values the text form cannot hold.
fn checked_timestamp(value: OffsetDateTime) -> Result<OffsetDateTime, SqliteStoreError> {
    storable_timestamp(value).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Returns the `(unix seconds, subsecond nanoseconds)` ordering key.
fn sort_key(value: OffsetDateTime) -> (i64, i64) {
    (value.unix_timestamp(), i64::from(value.nanosecond()))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must be set".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_err(&err))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(|err| db_err(&err))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_err(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_err(&err))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_err(&err))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_err(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_err(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_err(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_err(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS sessions (
                    id TEXT PRIMARY KEY,
                    candidate_name TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    start_key INTEGER NOT NULL,
                    start_nanos INTEGER NOT NULL,
                    end_time TEXT,
                    video_path TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_sessions_start_key
                    ON sessions (start_key, start_nanos);
                CREATE TABLE IF NOT EXISTS events (
                    id TEXT NOT NULL UNIQUE,
                    session_id TEXT NOT NULL,
                    event_type TEXT NOT NULL,
                    message TEXT,
                    timestamp TEXT NOT NULL,
                    timestamp_key INTEGER NOT NULL,
                    timestamp_nanos INTEGER NOT NULL,
                    FOREIGN KEY (session_id) REFERENCES sessions(id)
                );
                CREATE INDEX IF NOT EXISTS idx_events_session_order
                    ON events (session_id, timestamp_key, timestamp_nanos);",
            )
            .map_err(|err| db_err(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| db_err(&err))?;
    Ok(())
}
