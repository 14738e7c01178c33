//! Wire model shared between the backend client and the dialogue engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A topic stories can be attached to. Immutable once fetched; identity
/// is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
}

/// Kind of content a story carries. `Album` exists on the wire but is
/// never produced by this bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryKind {
    Photo,
    Album,
    Video,
    Text,
}

impl StoryKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Album => "album",
            Self::Video => "video",
            Self::Text => "text",
        }
    }
}

/// A story attached to a topic. `content` is a platform file reference
/// for media stories and the story text for text stories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: StoryKind,
    pub description: String,
    pub content: String,
    pub topic_id: i64,
    pub user_id: i64,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
}

/// A registered end user. `external_id` is the messaging-platform
/// conversation identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub external_id: i64,
}

/// Body for `POST stories/`.
#[derive(Debug, Clone, Serialize)]
pub struct StoryDraft {
    #[serde(rename = "type")]
    pub kind: StoryKind,
    pub description: String,
    pub content: String,
    pub topic_id: i64,
    pub user_id: i64,
}

/// Body for `PUT stories/{id}/`. Only set fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Body for `POST users/`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterProfile {
    pub external_id: i64,
    pub code: String,
}

/// Find a topic in a previously fetched list.
#[must_use]
pub fn topic_by_id(topics: &[Topic], id: i64) -> Option<&Topic> {
    topics.iter().find(|topic| topic.id == id)
}

#[cfg(test)]
mod tests {
    use super::{topic_by_id, StoryKind, Topic};

    #[test]
    fn test_topic_deserializes_from_api_shape() {
        let raw = r#"{"id": 1001, "title": "Winter", "created": "2020-02-21T13:41:25.767454Z"}"#;
        let topic: Topic = serde_json::from_str(raw).expect("topic should deserialize");
        assert_eq!(topic.id, 1001);
        assert_eq!(topic.title, "Winter");
    }

    #[test]
    fn test_story_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&StoryKind::Photo).expect("serialize"),
            "\"photo\""
        );
        let kind: StoryKind = serde_json::from_str("\"video\"").expect("deserialize");
        assert_eq!(kind, StoryKind::Video);
    }

    #[test]
    fn test_topic_by_id() {
        let raw = r#"[
            {"id": 1001, "title": "Winter", "created": "2020-02-21T13:41:25.767454Z"},
            {"id": 1002, "title": "Spring", "created": "2020-02-20T14:14:04.122992Z"}
        ]"#;
        let topics: Vec<Topic> = serde_json::from_str(raw).expect("topics should deserialize");
        assert_eq!(
            topic_by_id(&topics, 1002).map(|t| t.title.as_str()),
            Some("Spring")
        );
        assert!(topic_by_id(&topics, 9999).is_none());
    }
}
