//! Synchronous SQLite access layer for note records.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::errors::{NoteError, Result};
use crate::models::{Note, Priority};

const REQUIRED_COLUMNS: [&str; 2] = ["x", "y"];

const CREATE_NOTES: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id            INTEGER PRIMARY KEY,
    x             INTEGER,
    y             INTEGER,
    text          TEXT,
    priority      TEXT DEFAULT 'Low',
    timer_enabled BOOLEAN DEFAULT 0,
    timer_time    BIGINT
)"#;

const SELECT_NOTE: &str =
    "SELECT id, x, y, text, priority, timer_enabled, timer_time FROM notes";

/// What to do when the on-disk `notes` table lacks required columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SchemaDriftPolicy {
    /// Drop the table and start over. Existing notes are lost.
    #[default]
    Recreate,
    /// Fail with `SchemaMismatch` and leave the file alone.
    Refuse,
}

/* -------------------------------------------------------------------- */

pub struct NoteStore {
    conn: Connection,
}

impl NoteStore {
    pub fn open<P: AsRef<Path>>(path: P, policy: SchemaDriftPolicy) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening note store at {}", path.display());
        let conn = Connection::open(path)?;
        Self::with_connection(conn, policy)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, SchemaDriftPolicy::Recreate)
    }

    fn with_connection(conn: Connection, policy: SchemaDriftPolicy) -> Result<Self> {
        let store = Self { conn };
        store.ensure_schema(policy)?;
        Ok(store)
    }

    /* --------------------------- schema ----------------------------- */

    fn ensure_schema(&self, policy: SchemaDriftPolicy) -> Result<()> {
        let columns = self.table_columns()?;
        if columns.is_empty() {
            info!("Creating notes table");
            self.conn.execute_batch(CREATE_NOTES)?;
            return Ok(());
        }

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !columns.iter().any(|have| have.as_str() == *c))
            .collect();
        if missing.is_empty() {
            debug!("Notes table schema is current");
            return Ok(());
        }

        let msg = format!("notes table is missing columns: {}", missing.join(", "));
        match policy {
            SchemaDriftPolicy::Refuse => Err(NoteError::schema_mismatch(msg)),
            SchemaDriftPolicy::Recreate => {
                let dropped: i64 =
                    self.conn
                        .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
                warn!("{}; recreating table and discarding {} notes", msg, dropped);
                self.conn.execute_batch("DROP TABLE notes;")?;
                self.conn.execute_batch(CREATE_NOTES)?;
                Ok(())
            }
        }
    }

    fn table_columns(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(notes)")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    /* ----------------------------- CRUD ----------------------------- */

    #[instrument(skip(self))]
    pub fn load_all(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_NOTE} ORDER BY id"))?;
        let notes = stmt
            .query_map([], note_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        info!("Loaded {} notes", notes.len());
        Ok(notes)
    }

    pub fn get(&self, id: i64) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(&format!("{SELECT_NOTE} WHERE id = ?1"), params![id], note_from_row)
            .optional()?;
        Ok(note)
    }

    /// Stores a new record and returns its id. The id on `note` is ignored.
    #[instrument(skip(self, note))]
    pub fn insert(&self, note: &Note) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO notes (x, y, text, priority, timer_enabled, timer_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                note.x,
                note.y,
                note.text,
                note.priority.as_str(),
                note.timer_enabled,
                stored_timer(note),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted note {}", id);
        Ok(id)
    }

    /// Writes the whole record, recreating the row if it has vanished.
    #[instrument(skip(self, note), fields(id = note.id))]
    pub fn update(&self, note: &Note) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notes (id, x, y, text, priority, timer_enabled, timer_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                x = excluded.x,
                y = excluded.y,
                text = excluded.text,
                priority = excluded.priority,
                timer_enabled = excluded.timer_enabled,
                timer_time = excluded.timer_time",
            params![
                note.id,
                note.x,
                note.y,
                note.text,
                note.priority.as_str(),
                note.timer_enabled,
                stored_timer(note),
            ],
        )?;
        debug!("Saved note {}", note.id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(NoteError::NoteNotFound(id));
        }
        info!("Deleted note {}", id);
        Ok(())
    }
}

fn stored_timer(note: &Note) -> Option<i64> {
    if note.timer_enabled {
        note.timer_time
    } else {
        None
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    let id: i64 = row.get(0)?;
    let priority = match row.get::<_, Option<String>>(4)? {
        Some(name) => name.parse::<Priority>().unwrap_or_else(|_| {
            warn!("Note {} has unknown priority {:?}, using Low", id, name);
            Priority::Low
        }),
        None => Priority::Low,
    };

    let mut note = Note {
        id,
        x: row.get::<_, Option<i32>>(1)?.unwrap_or(0),
        y: row.get::<_, Option<i32>>(2)?.unwrap_or(0),
        text: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        priority,
        timer_enabled: row.get::<_, Option<bool>>(5)?.unwrap_or(false),
        timer_time: row.get(6)?,
    };

    if note.timer_enabled && note.timer_time.is_none() {
        warn!("Note {} has a timer without a time, hiding timer", id);
        note.timer_enabled = false;
    }
    note.normalize_timer();
    Ok(note)
}
