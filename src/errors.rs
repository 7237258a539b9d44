use thiserror::Error;

use crate::models::SessionHandle;

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    #[error("Session not found: {0}")]
    SessionNotFound(SessionHandle),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Invalid sort key: {0}")]
    InvalidSortKey(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NoteError {
    pub fn schema_mismatch<T: Into<String>>(msg: T) -> Self {
        NoteError::SchemaMismatch(msg.into())
    }

    pub fn invalid_priority<T: Into<String>>(msg: T) -> Self {
        NoteError::InvalidPriority(msg.into())
    }

    pub fn invalid_sort_key<T: Into<String>>(msg: T) -> Self {
        NoteError::InvalidSortKey(msg.into())
    }

    pub fn invalid_command<T: Into<String>>(msg: T) -> Self {
        NoteError::InvalidCommand(msg.into())
    }

    pub fn config_error<T: Into<String>>(msg: T) -> Self {
        NoteError::Config(msg.into())
    }

    pub fn export_error<T: Into<String>>(msg: T) -> Self {
        NoteError::Export(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, NoteError>;
