//! The conversation state machine.
//!
//! Two nested machines share one session: the outer topic-selection
//! flow and the inner story-editing flow. Events are routed through an
//! immutable transition table built once at startup; an event that
//! matches nothing in the active state is silently dropped.

mod engine;
mod handlers;
mod table;

pub use engine::{Dispatch, Engine};
pub use table::{standard_table, Rule, TableBuilder, TransitionTable};

use crate::backend::Backend;
use crate::config::ApiSettings;
use crate::render::Screen;
use crate::session::Session;
use futures_util::future::BoxFuture;

/// Which machine a state belongs to. Fallback rules are registered per
/// machine, so `/exit` means "close the story editor" while nested and
/// "end the conversation" outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    Outer,
    Inner,
}

/// Every state of both machines. `End` doubles as the idle state of a
/// fresh session, so creation and termination meet in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateId {
    // outer machine
    SelectTopic,
    SearchTopic,
    CreateTopicIntro,
    CreateTopic,
    LookupStoryIntro,
    LookupStory,
    EditStory,
    UpdateStory,
    Register,
    Stopping,
    End,
    // inner machine (story editing)
    SelectStoryType,
    VideoStory,
    PhotoStory,
    TextStory,
}

/// Sentinel a handler returns to terminate the active conversation
/// layer. Deliberately disjoint from [`StateId`]; consumed only by the
/// frame-pop logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalSignal {
    End,
    Stop,
}

/// Commands recognized at the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Exit,
    Help,
}

/// Attachment kinds the channel can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

/// One inbound occurrence from the messaging channel.
#[derive(Debug, Clone)]
pub enum Event {
    Command(CommandKind),
    /// A button tap; `data` is the opaque callback tag.
    Callback { data: String },
    /// A free-text message.
    Text { text: String },
    /// An attachment; `file_ref` is the platform file reference.
    Media {
        kind: MediaKind,
        caption: Option<String>,
        file_ref: String,
    },
}

impl Event {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn callback_data(&self) -> Option<&str> {
        match self {
            Self::Callback { data } => Some(data),
            _ => None,
        }
    }
}

/// Callback tags carried by inline buttons.
pub mod callback {
    pub const SEARCH: &str = "search";
    pub const NEW: &str = "new";
    pub const LOOKUP: &str = "lookup";
    pub const BACK: &str = "back";
    pub const EDIT: &str = "edit";
    pub const REMOVE_TOPIC: &str = "remove_topic";
    pub const REMOVE_STORY: &str = "remove_story";
    pub const VIDEO: &str = "video";
    pub const PHOTO: &str = "photo";
    pub const TEXT: &str = "text";
}

/// Parse callback data or typed input as a decimal id. Digits only, so
/// tags like `remove_topic` can never collide with an id.
#[must_use]
pub fn parse_decimal_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// The matching key routing an event to a handler within the active
/// state. Structural: no pattern strings, no regex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Command(CommandKind),
    /// A literal button-callback tag.
    Callback(&'static str),
    /// A callback whose data is a decimal topic id.
    TopicId,
    /// Any free-text message.
    Text,
    /// An attachment of the given kind.
    Media(MediaKind),
}

impl Selector {
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        match (self, event) {
            (Self::Command(wanted), Event::Command(got)) => wanted == got,
            (Self::Callback(tag), Event::Callback { data }) => data == tag,
            (Self::TopicId, Event::Callback { data }) => parse_decimal_id(data).is_some(),
            (Self::Text, Event::Text { .. }) => true,
            (Self::Media(wanted), Event::Media { kind, .. }) => wanted == kind,
            _ => false,
        }
    }
}

/// What a handler decided should happen to the conversation.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    /// Keep the current state.
    Stay,
    /// Move within the active machine.
    Transition(StateId),
    /// Push a frame and hand control to the inner machine.
    EnterNested {
        initial: StateId,
        returns: crate::session::ReturnMapping,
    },
    /// Pop the active frame; the popped frame's return mapping decides
    /// where the parent resumes. Popping the last frame terminates the
    /// conversation.
    Terminal(TerminalSignal),
    /// Unwind every frame and restart the outer machine.
    Reset(StateId),
}

/// Handler result: the outcome plus an optional screen to render.
pub struct Step {
    pub outcome: Outcome,
    pub screen: Option<Screen>,
}

impl Step {
    #[must_use]
    pub fn stay(screen: Screen) -> Self {
        Self {
            outcome: Outcome::Stay,
            screen: Some(screen),
        }
    }

    #[must_use]
    pub fn to(state: StateId, screen: Screen) -> Self {
        Self {
            outcome: Outcome::Transition(state),
            screen: Some(screen),
        }
    }

    #[must_use]
    pub fn reset_to(state: StateId, screen: Screen) -> Self {
        Self {
            outcome: Outcome::Reset(state),
            screen: Some(screen),
        }
    }

    #[must_use]
    pub fn silent(outcome: Outcome) -> Self {
        Self {
            outcome,
            screen: None,
        }
    }
}

/// Everything a handler may touch. Handlers read and write session
/// data, perform at most one backend call of their own, and decide the
/// outcome; rendering and state commits stay in the engine.
pub struct Ctx<'a> {
    pub event: &'a Event,
    pub session: &'a mut Session,
    pub backend: &'a dyn Backend,
    pub settings: &'a ApiSettings,
}

pub type HandlerFuture<'a> = BoxFuture<'a, Step>;

/// A transition handler. Plain function pointers keep the table `Copy`
/// and trivially immutable.
pub type Handler = for<'a> fn(Ctx<'a>) -> HandlerFuture<'a>;

#[cfg(test)]
mod tests {
    use super::{parse_decimal_id, CommandKind, Event, MediaKind, Selector};

    fn tap(data: &str) -> Event {
        Event::Callback {
            data: data.to_string(),
        }
    }

    #[test]
    fn test_parse_decimal_id() {
        assert_eq!(parse_decimal_id("1001"), Some(1001));
        assert_eq!(parse_decimal_id(""), None);
        assert_eq!(parse_decimal_id("-5"), None);
        assert_eq!(parse_decimal_id("12a"), None);
        assert_eq!(parse_decimal_id("99999999999999999999"), None);
    }

    #[test]
    fn test_selector_matching() {
        assert!(Selector::TopicId.matches(&tap("1001")));
        assert!(!Selector::TopicId.matches(&tap("back")));
        assert!(Selector::Callback("back").matches(&tap("back")));
        assert!(!Selector::Callback("back").matches(&tap("backwards")));
        assert!(Selector::Command(CommandKind::Exit).matches(&Event::Command(CommandKind::Exit)));
        assert!(!Selector::Command(CommandKind::Exit).matches(&Event::Command(CommandKind::Help)));
        assert!(Selector::Text.matches(&Event::Text {
            text: "anything".to_string()
        }));
        let video = Event::Media {
            kind: MediaKind::Video,
            caption: None,
            file_ref: "f1".to_string(),
        };
        assert!(Selector::Media(MediaKind::Video).matches(&video));
        assert!(!Selector::Media(MediaKind::Photo).matches(&video));
        // Kind mismatches never cross-match.
        assert!(!Selector::Text.matches(&tap("text")));
        assert!(!Selector::Callback("text").matches(&Event::Text {
            text: "text".to_string()
        }));
    }
}
