//! Render layer: pure functions from state and data to screens.
//!
//! Text is Telegram-flavored HTML; everything dynamic is escaped here so
//! handlers never worry about markup.

use crate::dialogue::{callback, Event};
use crate::model::{Story, Topic};

/// One inline button: a label and the opaque tag the transition table
/// matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub tag: String,
}

impl Button {
    #[must_use]
    pub fn new(label: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tag: tag.into(),
        }
    }
}

/// Ordered grid of inline buttons.
pub type ButtonGrid = Vec<Vec<Button>>;

/// What the channel should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub keyboard: Option<ButtonGrid>,
}

impl Screen {
    #[must_use]
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_keyboard(text: impl Into<String>, keyboard: ButtonGrid) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Which channel operation renders a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMethod {
    Reply,
    EditInPlace,
}

impl RenderMethod {
    /// The one rule deciding send versus edit: a button tap can rewrite
    /// the message it came from, anything else gets a new message
    /// (platforms cannot edit in response to text or media).
    #[must_use]
    pub fn for_event(event: &Event) -> Self {
        match event {
            Event::Callback { .. } => Self::EditInPlace,
            _ => Self::Reply,
        }
    }
}

fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

fn navigation_row() -> Vec<Button> {
    vec![
        Button::new("Search Topic", callback::SEARCH),
        Button::new("New Topic", callback::NEW),
        Button::new("Lookup Story", callback::LOOKUP),
    ]
}

/// Topic list: one button per topic plus the navigation row.
#[must_use]
pub fn topic_list(topics: &[Topic], text: &str) -> Screen {
    let mut rows: ButtonGrid = topics
        .iter()
        .map(|topic| vec![Button::new(&topic.title, topic.id.to_string())])
        .collect();
    rows.push(navigation_row());
    Screen::with_keyboard(escape(text), rows)
}

/// The story-editing screen for one topic. `banner` is a consumed flash
/// line shown above the title.
#[must_use]
pub fn topic_screen(title: &str, story_count: Option<u64>, banner: Option<&str>) -> Screen {
    let mut text = String::new();
    if let Some(banner) = banner {
        text.push_str(&escape(banner));
        text.push('\n');
    }
    text.push_str(&format!("<b>{}</b>", escape(title)));
    match story_count {
        Some(1) => text.push_str("\n1 story"),
        Some(n) => text.push_str(&format!("\n{n} stories")),
        None => {}
    }
    Screen::with_keyboard(
        text,
        vec![
            vec![
                Button::new("Video", callback::VIDEO),
                Button::new("Photo", callback::PHOTO),
                Button::new("Text", callback::TEXT),
            ],
            vec![
                Button::new("Remove topic", callback::REMOVE_TOPIC),
                Button::new("Back", callback::BACK),
            ],
        ],
    )
}

/// A found story with its edit actions.
#[must_use]
pub fn story_screen(story: &Story) -> Screen {
    Screen::with_keyboard(
        format!(
            "<b>Story #{}</b> ({})\n{}",
            story.id,
            story.kind.as_str(),
            escape(&story.description)
        ),
        vec![vec![
            Button::new("Remove", callback::REMOVE_STORY),
            Button::new("Edit", callback::EDIT),
            Button::new("Back", callback::BACK),
        ]],
    )
}

/// Lookup failed, whether from bad input or an absent story.
#[must_use]
pub fn story_missing(text: &str) -> Screen {
    Screen::with_keyboard(
        escape(text),
        vec![vec![
            Button::new("Lookup again", callback::LOOKUP),
            Button::new("Back", callback::BACK),
        ]],
    )
}

/// A plain text prompt with no buttons.
#[must_use]
pub fn prompt(text: &str) -> Screen {
    Screen::text_only(escape(text))
}

#[must_use]
pub fn help() -> Screen {
    Screen::text_only(
        "<b>Commands</b>\n\
         /start - show the latest topics\n\
         /exit - leave the current dialogue\n\
         /help - this message",
    )
}

#[must_use]
pub fn farewell() -> Screen {
    Screen::text_only("Okay, bye.")
}

#[cfg(test)]
mod tests {
    use super::{story_missing, topic_list, topic_screen, RenderMethod};
    use crate::dialogue::{CommandKind, Event, MediaKind};
    use crate::model::Topic;

    fn seasons() -> Vec<Topic> {
        serde_json::from_str(
            r#"[
                {"id": 1001, "title": "Winter", "created": "2020-02-21T13:41:25.767454Z"},
                {"id": 1002, "title": "Spring", "created": "2020-02-20T14:14:04.122992Z"}
            ]"#,
        )
        .expect("fixture topics")
    }

    #[test]
    fn test_topic_list_has_one_row_per_topic_plus_navigation() {
        let screen = topic_list(&seasons(), "Latest topics");
        let rows = screen.keyboard.expect("keyboard");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0].label, "Winter");
        assert_eq!(rows[0][0].tag, "1001");
        let tags: Vec<&str> = rows[2].iter().map(|b| b.tag.as_str()).collect();
        assert_eq!(tags, ["search", "new", "lookup"]);
    }

    #[test]
    fn test_topic_screen_escapes_title_and_shows_banner() {
        let screen = topic_screen("Tips & <tricks>", Some(2), Some("Got it!"));
        assert!(screen.text.starts_with("Got it!\n"));
        assert!(screen.text.contains("Tips &amp; &lt;tricks&gt;"));
        assert!(screen.text.ends_with("2 stories"));
    }

    #[test]
    fn test_story_missing_offers_retry() {
        let screen = story_missing("Story 9 was not found");
        let rows = screen.keyboard.expect("keyboard");
        assert_eq!(rows[0][0].tag, "lookup");
        assert_eq!(rows[0][1].tag, "back");
    }

    #[test]
    fn test_render_method_rule() {
        let tap = Event::Callback {
            data: "back".to_string(),
        };
        let text = Event::Text {
            text: "hello".to_string(),
        };
        let media = Event::Media {
            kind: MediaKind::Photo,
            caption: None,
            file_ref: "f1".to_string(),
        };
        let command = Event::Command(CommandKind::Start);
        assert_eq!(RenderMethod::for_event(&tap), RenderMethod::EditInPlace);
        assert_eq!(RenderMethod::for_event(&text), RenderMethod::Reply);
        assert_eq!(RenderMethod::for_event(&media), RenderMethod::Reply);
        assert_eq!(RenderMethod::for_event(&command), RenderMethod::Reply);
    }
}
