//! Read-only summary view over the live sessions.

use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::AppContext;
use crate::errors::{NoteError, Result};
use crate::models::{Note, Priority, SessionHandle};
use crate::session::NoteSession;

/// Sort position for notes without a running timer.
pub const NO_DEADLINE: i64 = i64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Priority,
    TimeRemaining,
    Id,
    Text,
    TimerEnabled,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Priority => "priority",
            SortKey::TimeRemaining => "time_remaining",
            SortKey::Id => "id",
            SortKey::Text => "text",
            SortKey::TimerEnabled => "timer_enabled",
        }
    }

    fn compare(&self, a: &Note, b: &Note, now: DateTime<Utc>) -> Ordering {
        match self {
            SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortKey::TimeRemaining => {
                time_remaining_ms(a, now).cmp(&time_remaining_ms(b, now))
            }
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Text => a.text.cmp(&b.text),
            SortKey::TimerEnabled => a.timer_enabled.cmp(&b.timer_enabled),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = NoteError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "priority" => Ok(SortKey::Priority),
            "time_remaining" => Ok(SortKey::TimeRemaining),
            "id" => Ok(SortKey::Id),
            "text" => Ok(SortKey::Text),
            "timer" | "timer_enabled" => Ok(SortKey::TimerEnabled),
            _ => Err(NoteError::invalid_sort_key(s)),
        }
    }
}

/// How often the countdown column is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshGranularity {
    #[default]
    Second,
    Minute,
}

impl RefreshGranularity {
    pub fn period(&self) -> Duration {
        match self {
            RefreshGranularity::Second => Duration::from_secs(1),
            RefreshGranularity::Minute => Duration::from_secs(60),
        }
    }
}

impl FromStr for RefreshGranularity {
    type Err = NoteError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "second" => Ok(RefreshGranularity::Second),
            "minute" => Ok(RefreshGranularity::Minute),
            other => Err(NoteError::config_error(format!(
                "unknown refresh granularity: {other}"
            ))),
        }
    }
}

/* -------------------------------------------------------------------- */

/// Milliseconds until the timer fires; `NO_DEADLINE` without a live timer.
pub fn time_remaining_ms(note: &Note, now: DateTime<Utc>) -> i64 {
    match note.timer_time {
        Some(time) if note.timer_enabled => {
            let remaining = time.saturating_mul(1000).saturating_sub(now.timestamp_millis());
            if remaining >= 0 {
                remaining
            } else {
                NO_DEADLINE
            }
        }
        _ => NO_DEADLINE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteSummary {
    pub handle: SessionHandle,
    pub id: i64,
    pub priority: Priority,
    pub color: &'static str,
    pub preview: String,
    pub timer_enabled: bool,
    pub countdown: String,
    pub stuck: bool,
}

impl NoteSummary {
    fn from_session(session: &NoteSession, preview_chars: usize, now: DateTime<Utc>) -> Self {
        let note = session.note();
        Self {
            handle: session.handle(),
            id: note.id,
            priority: note.priority,
            color: note.priority.color(),
            preview: note.text.chars().take(preview_chars).collect(),
            timer_enabled: note.timer_enabled,
            countdown: session.countdown_at(now),
            stuck: session.is_stuck(),
        }
    }
}

/// Summaries of every live session, ordered by `sort_key`. Ties keep
/// handle order.
pub fn list(
    ctx: &AppContext,
    sort_key: SortKey,
    preview_chars: usize,
    now: DateTime<Utc>,
) -> Vec<NoteSummary> {
    let mut sessions: Vec<&NoteSession> = ctx.sessions().collect();
    sessions.sort_by(|a, b| sort_key.compare(a.note(), b.note(), now));
    sessions
        .into_iter()
        .map(|s| NoteSummary::from_session(s, preview_chars, now))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteDetails {
    pub id: i64,
    pub text: String,
    pub priority: Priority,
    pub timer_enabled: bool,
    /// RFC 3339, only when the timer is enabled.
    pub timer_time: Option<String>,
}

pub fn details(ctx: &AppContext, handle: SessionHandle) -> Result<NoteDetails> {
    let note = ctx.session(handle)?.note();
    let timer_time = note
        .timer_time
        .filter(|_| note.timer_enabled)
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(|t| t.to_rfc3339());
    Ok(NoteDetails {
        id: note.id,
        text: note.text.clone(),
        priority: note.priority,
        timer_enabled: note.timer_enabled,
        timer_time,
    })
}

/* -------------------------------------------------------------------- */

/// A dashboard window's state: the current rows plus a stale flag raised by
/// change events. Any change triggers a full re-list on the next `poll`.
pub struct Dashboard {
    sort_key: SortKey,
    preview_chars: usize,
    rows: Vec<NoteSummary>,
    stale: Rc<Cell<bool>>,
}

impl Dashboard {
    pub fn attach(ctx: &mut AppContext, sort_key: SortKey, preview_chars: usize) -> Self {
        let stale = Rc::new(Cell::new(false));
        let flag = Rc::clone(&stale);
        ctx.subscribe(move |_| flag.set(true));

        Self {
            sort_key,
            preview_chars,
            rows: list(ctx, sort_key, preview_chars, Utc::now()),
            stale,
        }
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn rows(&self) -> &[NoteSummary] {
        &self.rows
    }

    pub fn is_stale(&self) -> bool {
        self.stale.get()
    }

    pub fn set_sort_key(&mut self, ctx: &AppContext, sort_key: SortKey, now: DateTime<Utc>) {
        self.sort_key = sort_key;
        self.relist(ctx, now);
    }

    pub fn relist(&mut self, ctx: &AppContext, now: DateTime<Utc>) {
        self.rows = list(ctx, self.sort_key, self.preview_chars, now);
        self.stale.set(false);
        debug!("Dashboard re-listed {} rows by {}", self.rows.len(), self.sort_key);
    }

    /// Re-lists if a change event arrived since the last listing.
    pub fn poll(&mut self, ctx: &AppContext, now: DateTime<Utc>) -> bool {
        if !self.stale.get() {
            return false;
        }
        self.relist(ctx, now);
        true
    }

    /// Re-derives the countdown of every visible row. Never mutates notes.
    pub fn tick(&mut self, ctx: &AppContext, now: DateTime<Utc>) {
        for row in self.rows.iter_mut() {
            if let Ok(session) = ctx.session(row.handle) {
                row.countdown = session.countdown_at(now);
                row.stuck = session.is_stuck();
            }
        }
    }

    /// The current rows as a JSON array.
    pub fn render_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rows)?)
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "{:<6} {:<5} {:<9} {:<6} {:<18} {:<8} {}\n",
            "Handle", "ID", "Priority", "Timer", "Time Remaining", "Shown", "Text"
        );
        for row in &self.rows {
            out.push_str(&format!(
                "{:<6} {:<5} {:<9} {:<6} {:<18} {:<8} {}\n",
                row.handle.to_string(),
                row.id,
                row.priority.as_str(),
                if row.timer_enabled { "Yes" } else { "No" },
                row.countdown,
                if row.stuck { "Stuck" } else { "Unstuck" },
                row.preview.replace('\n', " "),
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NoteStore;
    use crate::session::NoteEdit;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn context_with(notes: Vec<Note>) -> AppContext {
        let mut ctx = AppContext::new(NoteStore::open_in_memory().unwrap());
        for (i, note) in notes.into_iter().enumerate() {
            ctx.open_existing(Note {
                id: i as i64 + 1,
                ..note
            });
        }
        ctx
    }

    fn with_priority(priority: Priority) -> Note {
        Note {
            priority,
            ..Note::default()
        }
    }

    fn ids(rows: &[NoteSummary]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_sort_by_priority() {
        let ctx = context_with(vec![
            with_priority(Priority::Low),
            with_priority(Priority::Critical),
            with_priority(Priority::Medium),
        ]);
        let rows = list(&ctx, SortKey::Priority, 50, now());
        let order: Vec<Priority> = rows.iter().map(|r| r.priority).collect();
        assert_eq!(order, vec![Priority::Critical, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn test_sort_by_time_remaining_puts_untimed_last() {
        let ctx = context_with(vec![
            Note::default(),
            Note {
                timer_enabled: true,
                timer_time: Some(now().timestamp() + 10),
                ..Note::default()
            },
            Note {
                timer_enabled: true,
                timer_time: Some(now().timestamp() - 10),
                ..Note::default()
            },
        ]);
        let rows = list(&ctx, SortKey::TimeRemaining, 50, now());
        assert_eq!(ids(&rows), vec![2, 1, 3]);
        assert_eq!(rows[0].countdown, "0d 0h 0m 10s");
    }

    #[test]
    fn test_sort_by_text_id_and_timer() {
        let ctx = context_with(vec![
            Note {
                text: "banana".into(),
                timer_enabled: true,
                timer_time: Some(1),
                ..Note::default()
            },
            Note {
                text: "apple".into(),
                ..Note::default()
            },
        ]);
        assert_eq!(ids(&list(&ctx, SortKey::Text, 50, now())), vec![2, 1]);
        assert_eq!(ids(&list(&ctx, SortKey::Id, 50, now())), vec![1, 2]);
        assert_eq!(ids(&list(&ctx, SortKey::TimerEnabled, 50, now())), vec![2, 1]);
    }

    #[test]
    fn test_preview_is_truncated() {
        let ctx = context_with(vec![Note {
            text: "x".repeat(80),
            ..Note::default()
        }]);
        let rows = list(&ctx, SortKey::Id, 50, now());
        assert_eq!(rows[0].preview.chars().count(), 50);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("Time Remaining".parse::<SortKey>().unwrap(), SortKey::TimeRemaining);
        assert_eq!("timer".parse::<SortKey>().unwrap(), SortKey::TimerEnabled);
        assert!("colour".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_dashboard_relists_after_change() {
        let mut ctx = AppContext::new(NoteStore::open_in_memory().unwrap());
        let first = ctx.open_new().unwrap();
        let mut dash = Dashboard::attach(&mut ctx, SortKey::Priority, 50);
        assert_eq!(dash.rows().len(), 1);
        assert!(!dash.poll(&ctx, now()));

        let second = ctx.open_new().unwrap();
        ctx.edit(second, NoteEdit::Priority(Priority::Critical)).unwrap();
        assert!(dash.poll(&ctx, now()));
        assert_eq!(dash.rows()[0].handle, second);

        ctx.delete(first).unwrap();
        assert!(dash.poll(&ctx, now()));
        assert_eq!(dash.rows().len(), 1);
        assert!(dash.rows().iter().all(|r| r.handle != first));
    }

    #[test]
    fn test_tick_updates_countdown() {
        let mut ctx = context_with(vec![Note {
            timer_enabled: true,
            timer_time: Some(now().timestamp() + 61),
            ..Note::default()
        }]);
        let mut dash = Dashboard::attach(&mut ctx, SortKey::Id, 50);
        dash.tick(&ctx, now());
        assert_eq!(dash.rows()[0].countdown, "0d 0h 1m 1s");
        dash.tick(&ctx, now() + chrono::Duration::seconds(61));
        assert_eq!(dash.rows()[0].countdown, "Timer Expired");
    }

    #[test]
    fn test_details_formats_timer() {
        let ctx = context_with(vec![Note {
            text: "call".into(),
            timer_enabled: true,
            timer_time: Some(0),
            ..Note::default()
        }]);
        let d = details(&ctx, SessionHandle(1)).unwrap();
        assert_eq!(d.timer_time.as_deref(), Some("1970-01-01T00:00:00+00:00"));
        assert!(details(&ctx, SessionHandle(9)).is_err());
    }

    #[test]
    fn test_render_json_rows() {
        let mut ctx = context_with(vec![Note {
            text: "call mum".into(),
            priority: Priority::High,
            ..Note::default()
        }]);
        let dash = Dashboard::attach(&mut ctx, SortKey::Id, 50);
        let value: serde_json::Value = serde_json::from_str(&dash.render_json().unwrap()).unwrap();
        let row = &value[0];
        assert_eq!(row["handle"], 1);
        assert_eq!(row["priority"], "High");
        assert_eq!(row["color"], "#85193C");
        assert_eq!(row["preview"], "call mum");
        assert_eq!(row["countdown"], "");
    }
}
