//! CSV snapshot of every open note, handed to a local sink.

use std::io::Write;
use std::path::PathBuf;

use tracing::{error, info};

use crate::context::AppContext;
use crate::errors::{NoteError, Result};
use crate::models::Note;

pub const HEADER: [&str; 7] = [
    "ID",
    "X",
    "Y",
    "Text",
    "Priority",
    "Timer Enabled",
    "Timer Time",
];

pub trait ExportSink {
    fn send(&mut self, csv: &str) -> Result<()>;
}

/// Writes the export to a file, creating parent directories as needed.
pub struct FileSink {
    pub path: PathBuf,
}

impl ExportSink for FileSink {
    fn send(&mut self, csv: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, csv)?;
        info!("Exported notes to {}", self.path.display());
        Ok(())
    }
}

pub struct WriterSink<W: Write>(pub W);

impl<W: Write> ExportSink for WriterSink<W> {
    fn send(&mut self, csv: &str) -> Result<()> {
        self.0.write_all(csv.as_bytes())?;
        self.0.flush()?;
        Ok(())
    }
}

pub fn to_csv(notes: &[Note]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for note in notes {
        writer.write_record([
            note.id.to_string(),
            note.x.to_string(),
            note.y.to_string(),
            note.text.clone(),
            note.priority.to_string(),
            if note.timer_enabled { "True" } else { "False" }.to_string(),
            note.timer_time.map(|t| t.to_string()).unwrap_or_default(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| NoteError::export_error(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| NoteError::export_error(e.to_string()))
}

/// Exports every open note. Failures are logged and reported as `false`,
/// never raised to the caller.
pub fn sync(ctx: &AppContext, sink: &mut dyn ExportSink) -> bool {
    let notes = ctx.snapshot_all();
    match to_csv(&notes).and_then(|csv| sink.send(&csv)) {
        Ok(()) => {
            info!("Exported {} notes", notes.len());
            true
        }
        Err(e) => {
            error!("Export failed: {}", e);
            false
        }
    }
}
