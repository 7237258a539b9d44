//! Application context: the store handle, the live session registry and the
//! change observers, passed explicitly instead of living in globals.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::database::NoteStore;
use crate::errors::{NoteError, Result};
use crate::models::{Note, SessionHandle};
use crate::session::{ChangeListener, NoteEdit, NoteEvent, NoteEventKind, NoteSession};

pub struct AppContext {
    store: NoteStore,
    sessions: BTreeMap<SessionHandle, NoteSession>,
    next_handle: u64,
    subscribers: Vec<ChangeListener>,
}

impl AppContext {
    pub fn new(store: NoteStore) -> Self {
        Self {
            store,
            sessions: BTreeMap::new(),
            next_handle: 1,
            subscribers: Vec::new(),
        }
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    /// Opens one session per stored note.
    pub fn load_all(&mut self) -> Result<Vec<SessionHandle>> {
        let notes = self.store.load_all()?;
        let handles = notes
            .into_iter()
            .map(|note| self.open_existing(note))
            .collect::<Vec<_>>();
        info!("Opened {} sessions from the store", handles.len());
        Ok(handles)
    }

    /// Creates a fresh note and persists it before any edit can happen.
    pub fn open_new(&mut self) -> Result<SessionHandle> {
        let mut note = Note::default();
        note.id = self.store.insert(&note)?;
        let handle = self.register(note);
        info!("Opened new note {} as {}", self.sessions[&handle].note().id, handle);
        Ok(handle)
    }

    pub fn open_existing(&mut self, note: Note) -> SessionHandle {
        let handle = self.register(note);
        debug!("Bound note {} to {}", self.sessions[&handle].note().id, handle);
        handle
    }

    fn register(&mut self, note: Note) -> SessionHandle {
        let handle = SessionHandle(self.next_handle);
        self.next_handle += 1;
        self.sessions
            .insert(handle, NoteSession::bind(handle, note, Utc::now()));
        handle
    }

    pub fn session(&self, handle: SessionHandle) -> Result<&NoteSession> {
        self.sessions
            .get(&handle)
            .ok_or(NoteError::SessionNotFound(handle))
    }

    fn session_mut(&mut self, handle: SessionHandle) -> Result<&mut NoteSession> {
        self.sessions
            .get_mut(&handle)
            .ok_or(NoteError::SessionNotFound(handle))
    }

    /// Live sessions in handle order.
    pub fn sessions(&self) -> impl Iterator<Item = &NoteSession> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Applies one edit, saves the whole note and notifies observers.
    pub fn edit(&mut self, handle: SessionHandle, edit: NoteEdit) -> Result<()> {
        let session = self
            .sessions
            .get_mut(&handle)
            .ok_or(NoteError::SessionNotFound(handle))?;
        let draft = session.draft(edit);
        self.store.update(&draft.note)?;
        session.commit(draft);

        let event = NoteEvent {
            handle,
            note_id: session.note().id,
            kind: NoteEventKind::Saved,
        };
        session.emit(&event);
        self.notify(&event);
        Ok(())
    }

    /// Removes the note from the store and its session from the registry.
    ///
    /// A row that has already vanished from the store still closes the
    /// session, and the call reports `NoteNotFound`.
    pub fn delete(&mut self, handle: SessionHandle) -> Result<()> {
        let note_id = self.session(handle)?.note().id;
        let outcome = match self.store.delete(note_id) {
            Err(NoteError::NoteNotFound(id)) => {
                warn!("Note {} was already gone from the store", id);
                Err(NoteError::NoteNotFound(id))
            }
            Err(e) => return Err(e),
            Ok(()) => Ok(()),
        };

        let mut session = self
            .sessions
            .remove(&handle)
            .ok_or(NoteError::SessionNotFound(handle))?;
        let event = NoteEvent {
            handle,
            note_id,
            kind: NoteEventKind::Deleted,
        };
        session.emit(&event);
        self.notify(&event);
        info!("Deleted {} (note {})", handle, note_id);
        outcome
    }

    pub fn set_stuck(&mut self, handle: SessionHandle, stuck: bool) -> Result<()> {
        self.session_mut(handle)?.set_stuck(stuck);
        Ok(())
    }

    /// Flips between shown and hidden, returning the new state.
    pub fn toggle_stuck(&mut self, handle: SessionHandle) -> Result<bool> {
        let session = self.session_mut(handle)?;
        let stuck = !session.is_stuck();
        session.set_stuck(stuck);
        Ok(stuck)
    }

    /// Registers a callback for saves and deletes of one session.
    pub fn on_change<F>(&mut self, handle: SessionHandle, callback: F) -> Result<()>
    where
        F: FnMut(&NoteEvent) + 'static,
    {
        self.session_mut(handle)?.listeners.push(Box::new(callback));
        Ok(())
    }

    /// Registers a callback for saves and deletes of every session, including
    /// ones opened later.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(&NoteEvent) + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }

    fn notify(&mut self, event: &NoteEvent) {
        for subscriber in self.subscribers.iter_mut() {
            subscriber(event);
        }
    }

    pub fn snapshot_all(&self) -> Vec<Note> {
        self.sessions.values().map(|s| s.note().clone()).collect()
    }
}
