//! Event repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `events` storage.
//! - Own hashtag-link replacement logic with atomic semantics.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Event::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - The owner column is never touched by updates.
//! - Dates persist as `%Y-%m-%d` and times as `%H:%M:%S`, so lexicographic
//!   SQL comparison equals chronological comparison.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::event::{Event, EventId, EventValidationError};
use crate::model::user::UserId;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const EVENT_SELECT_SQL: &str = "SELECT
    uuid,
    user_uuid,
    date,
    start_time,
    end_time,
    duration,
    description,
    html_description,
    text_description,
    is_deleted,
    deleted_at,
    created_at,
    updated_at
FROM events";

const EVENT_REQUIRED_COLUMNS: &[&str] = &[
    "uuid",
    "user_uuid",
    "date",
    "start_time",
    "end_time",
    "duration",
    "description",
    "html_description",
    "text_description",
    "is_deleted",
    "deleted_at",
    "created_at",
    "updated_at",
];

const DB_DATE_FORMAT: &str = "%Y-%m-%d";
const DB_TIME_FORMAT: &str = "%H:%M:%S";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EventValidationError),
    Db(DbError),
    NotFound(Uuid),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version is {actual_version}, expected {expected_version}; run migrations first"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EventValidationError> for RepoError {
    fn from(value: EventValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventListQuery {
    /// Restrict to one owner.
    pub user_id: Option<UserId>,
    /// Restrict to one calendar date.
    pub date: Option<NaiveDate>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Read model for event detail/list use-cases: the record plus its
/// associated hashtag names and storage timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub event: Event,
    /// Hashtag names, normalized to lowercase, sorted.
    pub hash_tags: Vec<String>,
    /// Insert timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Update timestamp in epoch milliseconds.
    pub updated_at: i64,
}

/// Repository interface for event persistence operations.
pub trait EventRepository {
    fn create_event(&self, event: &Event) -> RepoResult<EventId>;
    fn update_event(&self, event: &Event) -> RepoResult<()>;
    fn get_event(&self, id: EventId, include_deleted: bool) -> RepoResult<Option<EventRecord>>;
    fn list_events(&self, query: &EventListQuery) -> RepoResult<Vec<EventRecord>>;
    fn soft_delete_event(&self, id: EventId) -> RepoResult<()>;
    /// Replaces all hashtag links for the given event in one transaction,
    /// resolving names to per-owner hashtag rows (find-or-create).
    fn set_event_hash_tags(
        &mut self,
        event_id: EventId,
        user_id: UserId,
        names: &[String],
    ) -> RepoResult<()>;
    /// Finds the owner's open-ended event on `date` with the latest
    /// `start_time` strictly before `start_time`. Ties resolve to the most
    /// recently created row, then the smallest uuid.
    fn latest_open_event_before(
        &self,
        user_id: UserId,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> RepoResult<Option<Event>>;
    /// Returns `(text_description, duration)` rows for events with a known
    /// duration, longest first, capped by `limit`.
    fn longest_durations(&self, limit: Option<u32>) -> RepoResult<Vec<(String, i64)>>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create_event(&self, event: &Event) -> RepoResult<EventId> {
        event.validate()?;

        self.conn.execute(
            "INSERT INTO events (
                uuid,
                user_uuid,
                date,
                start_time,
                end_time,
                duration,
                description,
                html_description,
                text_description,
                is_deleted,
                deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                event.uuid.to_string(),
                event.user_uuid.to_string(),
                date_to_db(event.date),
                time_to_db(event.start_time),
                event.end_time.map(time_to_db),
                event.duration,
                event.description.as_str(),
                event.html_description.as_str(),
                event.text_description.as_str(),
                bool_to_int(event.is_deleted),
                event.deleted_at,
            ],
        )?;

        Ok(event.uuid)
    }

    fn update_event(&self, event: &Event) -> RepoResult<()> {
        event.validate()?;

        let changed = self.conn.execute(
            "UPDATE events
             SET
                date = ?1,
                start_time = ?2,
                end_time = ?3,
                duration = ?4,
                description = ?5,
                html_description = ?6,
                text_description = ?7,
                is_deleted = ?8,
                deleted_at = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?10;",
            params![
                date_to_db(event.date),
                time_to_db(event.start_time),
                event.end_time.map(time_to_db),
                event.duration,
                event.description.as_str(),
                event.html_description.as_str(),
                event.text_description.as_str(),
                bool_to_int(event.is_deleted),
                event.deleted_at,
                event.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(event.uuid));
        }

        Ok(())
    }

    fn get_event(&self, id: EventId, include_deleted: bool) -> RepoResult<Option<EventRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            let (event, created_at, updated_at) = parse_event_row(row)?;
            let hash_tags = load_tags_for_event(self.conn, &event.uuid.to_string())?;
            return Ok(Some(EventRecord {
                event,
                hash_tags,
                created_at,
                updated_at,
            }));
        }

        Ok(None)
    }

    fn list_events(&self, query: &EventListQuery) -> RepoResult<Vec<EventRecord>> {
        let mut sql = format!("{EVENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if let Some(user_id) = query.user_id {
            sql.push_str(" AND user_uuid = ?");
            bind_values.push(Value::Text(user_id.to_string()));
        }

        if let Some(date) = query.date {
            sql.push_str(" AND date = ?");
            bind_values.push(Value::Text(date_to_db(date)));
        }

        sql.push_str(" ORDER BY date ASC, start_time ASC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            let (event, created_at, updated_at) = parse_event_row(row)?;
            let hash_tags = load_tags_for_event(self.conn, &event.uuid.to_string())?;
            records.push(EventRecord {
                event,
                hash_tags,
                created_at,
                updated_at,
            });
        }

        Ok(records)
    }

    fn soft_delete_event(&self, id: EventId) -> RepoResult<()> {
        // COALESCE keeps the original deletion stamp on repeated deletes.
        let changed = self.conn.execute(
            "UPDATE events
             SET
                is_deleted = 1,
                deleted_at = COALESCE(deleted_at, strftime('%s', 'now') * 1000),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn set_event_hash_tags(
        &mut self,
        event_id: EventId,
        user_id: UserId,
        names: &[String],
    ) -> RepoResult<()> {
        let event_id_text = event_id.to_string();
        let user_id_text = user_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !event_exists_in_tx(&tx, event_id_text.as_str())? {
            return Err(RepoError::NotFound(event_id));
        }

        tx.execute(
            "DELETE FROM event_hash_tags WHERE event_uuid = ?1;",
            [event_id_text.as_str()],
        )?;

        for name in names {
            tx.execute(
                "INSERT OR IGNORE INTO hash_tags (user_uuid, name) VALUES (?1, ?2);",
                params![user_id_text.as_str(), name.as_str()],
            )?;
            tx.execute(
                "INSERT INTO event_hash_tags (event_uuid, hash_tag_id)
                 SELECT ?1, id
                 FROM hash_tags
                 WHERE user_uuid = ?2
                   AND name = ?3;",
                params![
                    event_id_text.as_str(),
                    user_id_text.as_str(),
                    name.as_str()
                ],
            )?;
        }

        tx.execute(
            "UPDATE events
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_deleted = 0;",
            [event_id_text.as_str()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn latest_open_event_before(
        &self,
        user_id: UserId,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> RepoResult<Option<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE user_uuid = ?1
               AND date = ?2
               AND is_deleted = 0
               AND end_time IS NULL
               AND start_time < ?3
             ORDER BY start_time DESC, created_at DESC, uuid ASC
             LIMIT 1;"
        ))?;

        let mut rows = stmt.query(params![
            user_id.to_string(),
            date_to_db(date),
            time_to_db(start_time)
        ])?;
        if let Some(row) = rows.next()? {
            let (event, _, _) = parse_event_row(row)?;
            return Ok(Some(event));
        }

        Ok(None)
    }

    fn longest_durations(&self, limit: Option<u32>) -> RepoResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT text_description, duration
             FROM events
             WHERE duration IS NOT NULL
               AND is_deleted = 0
             ORDER BY duration DESC, updated_at DESC, uuid ASC
             LIMIT ?1;",
        )?;

        let capped = limit.map_or(-1, i64::from);
        let mut rows = stmt.query([capped])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push((row.get("text_description")?, row.get("duration")?));
        }

        Ok(entries)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<(Event, i64, i64)> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "events.uuid")?;
    let user_uuid_text: String = row.get("user_uuid")?;
    let user_uuid = parse_uuid(&user_uuid_text, "events.user_uuid")?;

    let date_text: String = row.get("date")?;
    let date = parse_db_date(&date_text)?;
    let start_text: String = row.get("start_time")?;
    let start_time = parse_db_time(&start_text, "events.start_time")?;
    let end_time = match row.get::<_, Option<String>>("end_time")? {
        Some(value) => Some(parse_db_time(&value, "events.end_time")?),
        None => None,
    };

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in events.is_deleted"
            )));
        }
    };

    let event = Event {
        uuid,
        user_uuid,
        date,
        start_time,
        end_time,
        duration: row.get("duration")?,
        description: row.get("description")?,
        html_description: row.get("html_description")?,
        text_description: row.get("text_description")?,
        is_deleted,
        deleted_at: row.get("deleted_at")?,
    };
    event.validate()?;

    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;
    Ok((event, created_at, updated_at))
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn parse_db_date(value: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DB_DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!("invalid date value `{value}` in events.date"))
    })
}

fn parse_db_time(value: &str, column: &str) -> RepoResult<NaiveTime> {
    NaiveTime::parse_from_str(value, DB_TIME_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid time value `{value}` in {column}")))
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DB_DATE_FORMAT).to_string()
}

fn time_to_db(time: NaiveTime) -> String {
    time.format(DB_TIME_FORMAT).to_string()
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn load_tags_for_event(conn: &Connection, event_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM event_hash_tags et
         INNER JOIN hash_tags t ON t.id = et.hash_tag_id
         WHERE et.event_uuid = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([event_uuid])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

fn event_exists_in_tx(tx: &Transaction<'_>, event_uuid: &str) -> RepoResult<bool> {
    let exists: i64 = tx.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM events
            WHERE uuid = ?1
        );",
        [event_uuid],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["events", "users", "hash_tags", "event_hash_tags"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for column in EVENT_REQUIRED_COLUMNS.iter().copied() {
        if !table_has_column(conn, "events", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "events",
                column,
            });
        }
    }

    Ok(())
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
