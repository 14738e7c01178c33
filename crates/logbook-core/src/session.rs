//! Per-conversation session state and the store that owns it.

use crate::dialogue::{StateId, TerminalSignal};
use crate::model::{Topic, User};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where the parent machine resumes when a nested conversation
/// terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnMapping {
    pub on_end: StateId,
    pub on_stop: StateId,
}

impl ReturnMapping {
    #[must_use]
    pub fn resolve(&self, signal: TerminalSignal) -> StateId {
        match signal {
            TerminalSignal::End => self.on_end,
            TerminalSignal::Stop => self.on_stop,
        }
    }
}

/// Activation record of a nested conversation.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    /// State the parent machine was in when the frame was pushed.
    pub parent: StateId,
    pub returns: ReturnMapping,
}

/// Scratch fields a conversation accumulates. A typed record: every
/// field has one owner and one meaning, there are no string keys to
/// collide on.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    /// Last fetched ordered topic list; button labels resolve against it.
    pub topics: Vec<Topic>,
    pub selected_topic_id: Option<i64>,
    pub selected_story_id: Option<i64>,
    pub user: Option<User>,
    flash: Option<String>,
    start_over: bool,
    topic_start_over: bool,
}

impl SessionData {
    /// Queue a one-shot message for the next rendered screen.
    pub fn set_flash(&mut self, text: impl Into<String>) {
        self.flash = Some(text.into());
    }

    /// One-shot read: the flash is cleared by the read and never
    /// survives to a second render.
    pub fn take_flash(&mut self) -> Option<String> {
        self.flash.take()
    }

    /// Mark the outer machine as resuming into an already-seen screen.
    pub fn mark_start_over(&mut self) {
        self.start_over = true;
    }

    /// Consume the outer start-over flag, resetting it.
    pub fn take_start_over(&mut self) -> bool {
        std::mem::take(&mut self.start_over)
    }

    /// Mark the story-editing machine as resuming into the topic screen.
    pub fn mark_topic_start_over(&mut self) {
        self.topic_start_over = true;
    }

    /// Consume the inner start-over flag, resetting it.
    pub fn take_topic_start_over(&mut self) -> bool {
        std::mem::take(&mut self.topic_start_over)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One end-user conversation. Owned exclusively by the dialogue engine;
/// created lazily on the first event, reset to `End` on termination.
#[derive(Debug)]
pub struct Session {
    id: i64,
    current: StateId,
    stack: Vec<Frame>,
    pub data: SessionData,
}

impl Session {
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            current: StateId::End,
            stack: Vec::new(),
            data: SessionData::default(),
        }
    }

    /// Conversation identity; also the `external_id` sent to the backend.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub fn current(&self) -> StateId {
        self.current
    }

    /// Nesting depth: 0 when only the outer machine is active.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn set_current(&mut self, state: StateId) {
        self.current = state;
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) {
        self.stack.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) -> Option<Frame> {
        self.stack.pop()
    }

    /// The conversation is over: drop every frame, reset scratch data,
    /// rest in `End` until the next `/start`.
    pub(crate) fn terminate(&mut self) {
        self.stack.clear();
        self.data.clear();
        self.current = StateId::End;
    }

    /// Unwind every nested frame and restart the outer machine. Scratch
    /// data survives a restart.
    pub(crate) fn reset(&mut self, state: StateId) {
        self.stack.clear();
        self.current = state;
    }
}

/// Hands out per-conversation sessions, creating them lazily on first
/// use.
///
/// The async mutex around each session is held for a whole dispatch
/// including any backend await, so events for one conversation are
/// processed strictly in arrival order (tokio's mutex is fair) while
/// distinct conversations interleave freely. Sessions are never expired
/// here; that is the hosting process's concern.
#[derive(Default)]
pub struct SessionStore {
    sessions: std::sync::Mutex<HashMap<i64, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, id: i64) -> Arc<Mutex<Session>> {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        sessions
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(id))))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionStore};
    use crate::dialogue::StateId;

    #[test]
    fn test_flash_is_one_shot() {
        let mut session = Session::new(7);
        session.data.set_flash("saved");
        assert_eq!(session.data.take_flash().as_deref(), Some("saved"));
        assert_eq!(session.data.take_flash(), None);
    }

    #[test]
    fn test_start_over_flags_reset_on_take() {
        let mut session = Session::new(7);
        session.data.mark_start_over();
        session.data.mark_topic_start_over();
        assert!(session.data.take_start_over());
        assert!(!session.data.take_start_over());
        assert!(session.data.take_topic_start_over());
        assert!(!session.data.take_topic_start_over());
    }

    #[test]
    fn test_terminate_clears_everything() {
        let mut session = Session::new(7);
        session.set_current(StateId::SelectTopic);
        session.data.selected_topic_id = Some(1001);
        session.data.set_flash("pending");
        session.terminate();
        assert_eq!(session.current(), StateId::End);
        assert_eq!(session.depth(), 0);
        assert_eq!(session.data.selected_topic_id, None);
        assert_eq!(session.data.take_flash(), None);
    }

    #[test]
    fn test_store_returns_same_session() {
        let store = SessionStore::new();
        let first = store.get_or_create(42);
        let second = store.get_or_create(42);
        assert!(std::sync::Arc::ptr_eq(&first, &second));
    }
}
