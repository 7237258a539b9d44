//! Live, editable state of one open note.

use chrono::{DateTime, Utc};

use crate::models::{Note, NoteStyle, Priority, SessionHandle};

pub const TIMER_EXPIRED: &str = "Timer Expired";

const SECS_PER_DAY: i64 = 24 * 3600;
const SECS_PER_HOUR: i64 = 3600;
const SECS_PER_MINUTE: i64 = 60;

/// One user edit. Every edit is persisted as soon as it is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteEdit {
    Text(String),
    Priority(Priority),
    TimerEnabled(bool),
    /// Epoch seconds picked in the timer input.
    TimerTime(i64),
    Position { x: i32, y: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEventKind {
    Saved,
    Deleted,
}

/// Emitted after every save or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub handle: SessionHandle,
    pub note_id: i64,
    pub kind: NoteEventKind,
}

/// An edited note that has not been committed to its session yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Draft {
    pub(crate) note: Note,
    timer_input: i64,
}

pub type ChangeListener = Box<dyn FnMut(&NoteEvent)>;

pub struct NoteSession {
    handle: SessionHandle,
    note: Note,
    timer_input: i64,
    stuck: bool,
    style: NoteStyle,
    pub(crate) listeners: Vec<ChangeListener>,
}

impl NoteSession {
    pub(crate) fn bind(handle: SessionHandle, mut note: Note, now: DateTime<Utc>) -> Self {
        note.normalize_timer();
        let timer_input = note.timer_time.unwrap_or_else(|| now.timestamp());
        let style = NoteStyle::for_priority(note.priority);
        Self {
            handle,
            note,
            timer_input,
            stuck: true,
            style,
            listeners: Vec::new(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn style(&self) -> NoteStyle {
        self.style
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck
    }

    pub(crate) fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }

    /// Last value of the timer picker, kept while the timer is off.
    pub fn timer_input(&self) -> i64 {
        self.timer_input
    }

    /// Computes the result of `edit` without touching the session.
    pub(crate) fn draft(&self, edit: NoteEdit) -> Draft {
        let mut note = self.note.clone();
        let mut timer_input = self.timer_input;
        match edit {
            NoteEdit::Text(text) => note.text = text,
            NoteEdit::Priority(priority) => note.priority = priority,
            NoteEdit::TimerEnabled(enabled) => note.timer_enabled = enabled,
            NoteEdit::TimerTime(time) => timer_input = time,
            NoteEdit::Position { x, y } => {
                note.x = x;
                note.y = y;
            }
        }
        note.timer_time = if note.timer_enabled {
            Some(timer_input)
        } else {
            None
        };
        Draft { note, timer_input }
    }

    pub(crate) fn commit(&mut self, draft: Draft) {
        self.style = NoteStyle::for_priority(draft.note.priority);
        self.note = draft.note;
        self.timer_input = draft.timer_input;
    }

    pub(crate) fn apply(&mut self, edit: NoteEdit) {
        let draft = self.draft(edit);
        self.commit(draft);
    }

    pub(crate) fn emit(&mut self, event: &NoteEvent) {
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn countdown(&self) -> String {
        self.countdown_at(Utc::now())
    }

    pub fn countdown_at(&self, now: DateTime<Utc>) -> String {
        countdown(&self.note, now)
    }
}

/// Remaining time until the note's timer fires, or empty when it has none.
pub fn countdown(note: &Note, now: DateTime<Utc>) -> String {
    let Some(timer_time) = note.timer_time.filter(|_| note.timer_enabled) else {
        return String::new();
    };
    let remaining = timer_time.saturating_sub(now.timestamp());
    if remaining <= 0 {
        return TIMER_EXPIRED.to_string();
    }

    let days = remaining / SECS_PER_DAY;
    let rest = remaining % SECS_PER_DAY;
    let hours = rest / SECS_PER_HOUR;
    let rest = rest % SECS_PER_HOUR;
    let minutes = rest / SECS_PER_MINUTE;
    let seconds = rest % SECS_PER_MINUTE;
    format!("{days}d {hours}h {minutes}m {seconds}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn session(note: Note) -> NoteSession {
        NoteSession::bind(SessionHandle(1), note, now())
    }

    #[test]
    fn test_countdown_disabled_is_empty() {
        let s = session(Note {
            timer_enabled: false,
            timer_time: Some(1_700_000_500),
            ..Note::default()
        });
        assert_eq!(s.countdown_at(now()), "");
    }

    #[test]
    fn test_countdown_at_deadline_is_expired() {
        let s = session(Note {
            timer_enabled: true,
            timer_time: Some(1_700_000_000),
            ..Note::default()
        });
        assert_eq!(s.countdown_at(now()), TIMER_EXPIRED);
    }

    #[test]
    fn test_countdown_buckets() {
        let remaining = 2 * SECS_PER_DAY + 3 * SECS_PER_HOUR + 4 * SECS_PER_MINUTE + 5;
        let s = session(Note {
            timer_enabled: true,
            timer_time: Some(1_700_000_000 + remaining),
            ..Note::default()
        });
        assert_eq!(s.countdown_at(now()), "2d 3h 4m 5s");
    }

    #[test]
    fn test_timer_input_survives_disable() {
        let mut s = session(Note::default());
        s.apply(NoteEdit::TimerTime(1_800_000_000));
        assert_eq!(s.note().timer_time, None);

        s.apply(NoteEdit::TimerEnabled(true));
        assert_eq!(s.note().timer_time, Some(1_800_000_000));

        s.apply(NoteEdit::TimerEnabled(false));
        assert_eq!(s.note().timer_time, None);
        assert_eq!(s.timer_input(), 1_800_000_000);

        s.apply(NoteEdit::TimerEnabled(true));
        assert_eq!(s.note().timer_time, Some(1_800_000_000));
    }

    #[test]
    fn test_timer_input_defaults_to_now() {
        let s = session(Note::default());
        assert_eq!(s.timer_input(), now().timestamp());
    }

    #[test]
    fn test_priority_edit_restyles() {
        let mut s = session(Note::default());
        assert_eq!(s.style().background, "#FCF259");
        s.apply(NoteEdit::Priority(Priority::Critical));
        assert_eq!(s.style().background, "#C5172E");
        assert!(s.style().stays_on_top);
    }

    #[test]
    fn test_draft_leaves_session_untouched() {
        let s = session(Note::default());
        let draft = s.draft(NoteEdit::Priority(Priority::High));
        assert_eq!(draft.note.priority, Priority::High);
        assert_eq!(s.note().priority, Priority::Low);
        assert_eq!(s.style().background, "#FCF259");
    }

    #[test]
    fn test_bind_disables_timer_without_time() {
        let mut s = session(Note {
            timer_enabled: true,
            timer_time: None,
            ..Note::default()
        });
        assert!(!s.note().timer_enabled);

        s.apply(NoteEdit::Text("later".into()));
        assert!(!s.note().timer_enabled);
        assert_eq!(s.note().timer_time, None);
        assert_eq!(s.countdown_at(now()), "");
    }
}
