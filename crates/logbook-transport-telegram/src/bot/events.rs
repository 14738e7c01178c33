//! Mapping Telegram updates onto the engine's event model.

use logbook_core::dialogue::{CommandKind, Event, MediaKind};
use teloxide::types::{CallbackQuery, Message};
use teloxide::utils::command::BotCommands;

/// Commands the bot recognizes at the top level.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "Show the latest topics.")]
    Start,
    #[command(description = "Leave the current dialogue.")]
    Exit,
    #[command(description = "Show this help.")]
    Help,
}

impl Command {
    #[must_use]
    pub fn into_event(self) -> Event {
        Event::Command(match self {
            Self::Start => CommandKind::Start,
            Self::Exit => CommandKind::Exit,
            Self::Help => CommandKind::Help,
        })
    }
}

/// Best-effort conversion of a plain message into an engine event.
/// Messages carrying nothing the engine models (stickers, locations and
/// the like) map to `None` and are ignored.
#[must_use]
pub fn message_event(msg: &Message) -> Option<Event> {
    if let Some(text) = msg.text() {
        return Some(Event::Text {
            text: text.to_string(),
        });
    }
    let caption = msg.caption().map(str::to_string);
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        // The last photo size is the largest rendition.
        return Some(Event::Media {
            kind: MediaKind::Photo,
            caption,
            file_ref: photo.file.id.0.clone(),
        });
    }
    if let Some(video) = msg.video() {
        return Some(Event::Media {
            kind: MediaKind::Video,
            caption,
            file_ref: video.file.id.0.clone(),
        });
    }
    if let Some(document) = msg.document() {
        return Some(Event::Media {
            kind: MediaKind::Document,
            caption,
            file_ref: document.file.id.0.clone(),
        });
    }
    None
}

/// Button taps carry their opaque tag; taps without data are dropped.
#[must_use]
pub fn callback_event(query: &CallbackQuery) -> Option<Event> {
    query.data.clone().map(|data| Event::Callback { data })
}

#[cfg(test)]
mod tests {
    use super::Command;
    use logbook_core::dialogue::{CommandKind, Event};
    use teloxide::utils::command::BotCommands;

    #[test]
    fn test_commands_parse_and_map() {
        let cmd = Command::parse("/start", "logbook_bot").expect("parses");
        assert!(matches!(
            cmd.into_event(),
            Event::Command(CommandKind::Start)
        ));
        let cmd = Command::parse("/exit", "logbook_bot").expect("parses");
        assert!(matches!(cmd.into_event(), Event::Command(CommandKind::Exit)));
        assert!(Command::parse("/unknown", "logbook_bot").is_err());
    }
}
