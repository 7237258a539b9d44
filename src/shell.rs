//! Line-oriented commands standing in for the tray menu and note windows.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::auto_list::{continue_list, strike_completed};
use crate::context::AppContext;
use crate::dashboard::{self, Dashboard, SortKey};
use crate::errors::{NoteError, Result};
use crate::export::{self, FileSink};
use crate::models::{Priority, SessionHandle};
use crate::session::NoteEdit;

pub const HELP: &str = "\
new                        open a new note
list [sort] [--json]       dashboard (priority, time_remaining, id, text, timer_enabled)
show <h> [--json]          note details
text <h> <text>            replace text, \\n starts a new line
strike <h>                 strike through list items
priority <h> <level>       Low, Medium, High or Critical
timer <h> on|off|<epoch>|+<secs>
move <h> <x> <y>           record window position
stick <h>                  toggle shown/hidden
delete <h>                 delete the note
export [path]              write all notes as CSV
watch <ticks>              refresh the dashboard countdown
quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerArg {
    On,
    Off,
    At(i64),
    In(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    List(Option<SortKey>, Format),
    Show(SessionHandle, Format),
    Text(SessionHandle, String),
    Strike(SessionHandle),
    Priority(SessionHandle, Priority),
    Timer(SessionHandle, TimerArg),
    Move(SessionHandle, i32, i32),
    Stick(SessionHandle),
    Delete(SessionHandle),
    Export(Option<PathBuf>),
    Watch(u32),
    Help,
    Quit,
}

fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    }
}

fn handle_arg(rest: &str) -> Result<(SessionHandle, &str)> {
    let (word, rest) = next_word(rest);
    if word.is_empty() {
        return Err(NoteError::invalid_command("missing session handle"));
    }
    Ok((word.parse()?, rest))
}

/// Splits a trailing `--json` off the arguments.
fn format_arg(rest: &str) -> (&str, Format) {
    match rest.trim_end().strip_suffix("--json") {
        Some(rest) => (rest, Format::Json),
        None => (rest, Format::Table),
    }
}

fn number<T: FromStr>(word: &str, what: &str) -> Result<T> {
    word.parse::<T>()
        .map_err(|_| NoteError::invalid_command(format!("{what} must be a number: {word:?}")))
}

impl FromStr for Command {
    type Err = NoteError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let (verb, rest) = next_word(line);
        let command = match verb.to_ascii_lowercase().as_str() {
            "new" => Command::New,
            "list" => {
                let (rest, format) = format_arg(rest);
                match rest.trim() {
                    "" => Command::List(None, format),
                    key => Command::List(Some(key.parse()?), format),
                }
            }
            "show" => {
                let (rest, format) = format_arg(rest);
                Command::Show(handle_arg(rest)?.0, format)
            }
            "text" => {
                let (handle, text) = handle_arg(rest)?;
                let text = text.strip_prefix(' ').unwrap_or(text);
                Command::Text(handle, text.replace("\\n", "\n"))
            }
            "strike" => Command::Strike(handle_arg(rest)?.0),
            "priority" => {
                let (handle, level) = handle_arg(rest)?;
                Command::Priority(handle, level.parse()?)
            }
            "timer" => {
                let (handle, arg) = handle_arg(rest)?;
                let arg = match arg.trim() {
                    "on" => TimerArg::On,
                    "off" => TimerArg::Off,
                    rel if rel.starts_with('+') => TimerArg::In(number(&rel[1..], "timer offset")?),
                    abs => TimerArg::At(number(abs, "timer time")?),
                };
                Command::Timer(handle, arg)
            }
            "move" => {
                let (handle, rest) = handle_arg(rest)?;
                let (x, rest) = next_word(rest);
                let (y, _) = next_word(rest);
                Command::Move(handle, number(x, "x")?, number(y, "y")?)
            }
            "stick" | "unstick" => Command::Stick(handle_arg(rest)?.0),
            "delete" => Command::Delete(handle_arg(rest)?.0),
            "export" => match rest.trim() {
                "" => Command::Export(None),
                path => Command::Export(Some(PathBuf::from(path))),
            },
            "watch" => Command::Watch(number(rest.trim(), "tick count")?),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(NoteError::invalid_command(format!("unknown command: {other}"))),
        };
        Ok(command)
    }
}

/// What the caller should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Print(String),
    Watch(u32),
    Quit,
}

pub struct Shell {
    ctx: AppContext,
    dashboard: Dashboard,
    export_path: PathBuf,
}

impl Shell {
    pub fn new(mut ctx: AppContext, sort_key: SortKey, preview_chars: usize, export_path: PathBuf) -> Self {
        let dashboard = Dashboard::attach(&mut ctx, sort_key, preview_chars);
        Self {
            ctx,
            dashboard,
            export_path,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Parses and runs one line. Errors are logged and printed, never fatal.
    pub fn run_line(&mut self, line: &str, now: DateTime<Utc>) -> Reply {
        if line.trim().is_empty() {
            return Reply::Print(String::new());
        }
        match line.parse::<Command>().and_then(|cmd| self.execute(cmd, now)) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Command {:?} failed: {}", line.trim(), e);
                Reply::Print(format!("error: {e}"))
            }
        }
    }

    pub fn execute(&mut self, command: Command, now: DateTime<Utc>) -> Result<Reply> {
        let text = match command {
            Command::New => {
                let handle = self.ctx.open_new()?;
                format!("Opened {} (note {})", handle, self.ctx.session(handle)?.note().id)
            }
            Command::List(sort_key, format) => {
                match sort_key {
                    Some(key) => self.dashboard.set_sort_key(&self.ctx, key, now),
                    None => {
                        self.dashboard.poll(&self.ctx, now);
                    }
                }
                self.dashboard.tick(&self.ctx, now);
                match format {
                    Format::Table => self.dashboard.render(),
                    Format::Json => self.dashboard.render_json()?,
                }
            }
            Command::Show(handle, Format::Json) => {
                serde_json::to_string_pretty(&dashboard::details(&self.ctx, handle)?)?
            }
            Command::Show(handle, Format::Table) => {
                let d = dashboard::details(&self.ctx, handle)?;
                let mut out = format!(
                    "Note {}\nPriority: {}\nTimer Enabled: {}\n",
                    d.id,
                    d.priority,
                    if d.timer_enabled { "Yes" } else { "No" }
                );
                if let Some(time) = d.timer_time {
                    out.push_str(&format!("Timer Time: {time}\n"));
                }
                out.push_str(&d.text);
                out
            }
            Command::Text(handle, text) => {
                self.ctx.edit(handle, NoteEdit::Text(continue_list(&text)))?;
                self.ctx.session(handle)?.note().text.clone()
            }
            Command::Strike(handle) => {
                let struck = strike_completed(&self.ctx.session(handle)?.note().text);
                self.ctx.edit(handle, NoteEdit::Text(struck))?;
                self.ctx.session(handle)?.note().text.clone()
            }
            Command::Priority(handle, priority) => {
                self.ctx.edit(handle, NoteEdit::Priority(priority))?;
                let style = self.ctx.session(handle)?.style();
                format!("{} is now {} ({})", handle, priority, style.background)
            }
            Command::Timer(handle, arg) => {
                match arg {
                    TimerArg::On => self.ctx.edit(handle, NoteEdit::TimerEnabled(true))?,
                    TimerArg::Off => self.ctx.edit(handle, NoteEdit::TimerEnabled(false))?,
                    TimerArg::At(time) => self.set_timer(handle, time)?,
                    TimerArg::In(secs) => {
                        let time = now
                            .timestamp()
                            .checked_add(secs)
                            .ok_or_else(|| NoteError::invalid_command("timer offset out of range"))?;
                        self.set_timer(handle, time)?
                    }
                }
                let countdown = self.ctx.session(handle)?.countdown_at(now);
                if countdown.is_empty() {
                    format!("{handle} timer off")
                } else {
                    format!("{handle} {countdown}")
                }
            }
            Command::Move(handle, x, y) => {
                self.ctx.edit(handle, NoteEdit::Position { x, y })?;
                format!("{handle} at ({x}, {y})")
            }
            Command::Stick(handle) => {
                if self.ctx.toggle_stuck(handle)? {
                    format!("{handle} stuck")
                } else {
                    format!("{handle} unstuck")
                }
            }
            Command::Delete(handle) => {
                self.ctx.delete(handle)?;
                format!("Deleted {handle}")
            }
            Command::Export(path) => {
                let mut sink = FileSink {
                    path: path.unwrap_or_else(|| self.export_path.clone()),
                };
                if export::sync(&self.ctx, &mut sink) {
                    format!("Exported to {}", sink.path.display())
                } else {
                    "Export failed, see log".to_string()
                }
            }
            Command::Watch(ticks) => return Ok(Reply::Watch(ticks)),
            Command::Help => HELP.to_string(),
            Command::Quit => {
                info!("Quit requested");
                return Ok(Reply::Quit);
            }
        };
        Ok(Reply::Print(text))
    }

    fn set_timer(&mut self, handle: SessionHandle, time: i64) -> Result<()> {
        self.ctx.edit(handle, NoteEdit::TimerTime(time))?;
        self.ctx.edit(handle, NoteEdit::TimerEnabled(true))
    }

    /// One dashboard refresh: re-list if anything changed, then recount.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> String {
        self.dashboard.poll(&self.ctx, now);
        self.dashboard.tick(&self.ctx, now);
        self.dashboard.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::NoteStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn shell() -> Shell {
        let ctx = AppContext::new(NoteStore::open_in_memory().unwrap());
        Shell::new(ctx, SortKey::Priority, 50, PathBuf::from("notes.csv"))
    }

    fn print(reply: Reply) -> String {
        match reply {
            Reply::Print(text) => text,
            other => panic!("Expected printed output, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("new".parse::<Command>().unwrap(), Command::New);
        assert_eq!(
            "list time_remaining".parse::<Command>().unwrap(),
            Command::List(Some(SortKey::TimeRemaining), Format::Table)
        );
        assert_eq!(
            "list --json".parse::<Command>().unwrap(),
            Command::List(None, Format::Json)
        );
        assert_eq!(
            "show #3 --json".parse::<Command>().unwrap(),
            Command::Show(SessionHandle(3), Format::Json)
        );
        assert_eq!(
            "text 2 - a\\n".parse::<Command>().unwrap(),
            Command::Text(SessionHandle(2), "- a\n".to_string())
        );
        assert_eq!(
            "timer #1 +90".parse::<Command>().unwrap(),
            Command::Timer(SessionHandle(1), TimerArg::In(90))
        );
        assert_eq!(
            "move 1 -4 12".parse::<Command>().unwrap(),
            Command::Move(SessionHandle(1), -4, 12)
        );
        assert!("priority 1 Urgent".parse::<Command>().is_err());
        assert!("delete".parse::<Command>().is_err());
        assert!("fly 1".parse::<Command>().is_err());
    }

    #[test]
    fn test_text_runs_auto_list() {
        let mut sh = shell();
        print(sh.run_line("new", now()));
        let out = print(sh.run_line("text 1 1. eggs\\n", now()));
        assert_eq!(out, "1. eggs\n2. ");
    }

    #[test]
    fn test_timer_and_list() {
        let mut sh = shell();
        sh.run_line("new", now());
        sh.run_line("new", now());
        assert_eq!(print(sh.run_line("timer 2 +10", now())), "#2 0d 0h 0m 10s");

        let table = print(sh.run_line("list time_remaining", now()));
        let rows: Vec<&str> = table.lines().skip(1).collect();
        assert!(rows[0].starts_with("#2"));
        assert!(rows[1].starts_with("#1"));

        assert_eq!(print(sh.run_line("timer 2 off", now())), "#2 timer off");
    }

    #[test]
    fn test_errors_are_printed() {
        let mut sh = shell();
        let out = print(sh.run_line("delete 9", now()));
        assert_eq!(out, "error: Session not found: #9");
        assert_eq!(sh.run_line("quit", now()), Reply::Quit);
        assert_eq!(sh.run_line("watch 3", now()), Reply::Watch(3));
    }

    #[test]
    fn test_delete_drops_from_listing() {
        let mut sh = shell();
        sh.run_line("new", now());
        sh.run_line("new", now());
        sh.run_line("delete 1", now());
        let table = sh.refresh(now());
        assert_eq!(table.lines().count(), 2);
        assert!(!table.contains("#1 "));
    }

    #[test]
    fn test_timer_offset_overflow_is_an_error() {
        let mut sh = shell();
        sh.run_line("new", now());
        let out = print(sh.run_line("timer 1 +9223372036854775807", now()));
        assert_eq!(out, "error: Invalid command: timer offset out of range");
        assert_eq!(print(sh.run_line("timer 1 +60", now())), "#1 0d 0h 1m 0s");
    }

    #[test]
    fn test_json_output() {
        let mut sh = shell();
        sh.run_line("new", now());
        sh.run_line("text 1 buy milk", now());
        sh.run_line("priority 1 critical", now());

        let rows: serde_json::Value =
            serde_json::from_str(&print(sh.run_line("list --json", now()))).unwrap();
        assert_eq!(rows.as_array().map(Vec::len), Some(1));
        assert_eq!(rows[0]["priority"], "Critical");
        assert_eq!(rows[0]["preview"], "buy milk");

        let details: serde_json::Value =
            serde_json::from_str(&print(sh.run_line("show 1 --json", now()))).unwrap();
        assert_eq!(details["text"], "buy milk");
        assert_eq!(details["timer_enabled"], false);
        assert!(details["timer_time"].is_null());
    }
}
