//! Sticky notes backed by a local SQLite store: note sessions, list
//! continuation, a dashboard view and CSV export.

pub mod auto_list;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod database;
pub mod errors;
pub mod export;
pub mod models;
pub mod session;
pub mod shell;


pub use context::AppContext;
pub use database::{NoteStore, SchemaDriftPolicy};
pub use errors::{NoteError, Result};
pub use models::{Note, NoteStyle, Priority, SessionHandle};
pub use session::{NoteEdit, NoteEvent, NoteEventKind, NoteSession};
