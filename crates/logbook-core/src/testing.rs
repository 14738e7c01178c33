//! Testing helpers: an in-memory backend, a recording channel and mock
//! constructors.

use crate::backend::{ApiError, ApiResult, Backend, MockBackend};
use crate::channel::{Channel, ChannelError};
use crate::model::{RegisterProfile, Story, StoryDraft, StoryKind, StoryPatch, Topic, User};
use crate::render::Screen;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn fixture_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 2, 21, 13, 41, 25)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Vec-backed stand-in for the remote API. Shapes and fixtures follow
/// the real backend; useful for end-to-end dialogue tests without a
/// network.
#[derive(Default)]
pub struct InMemoryBackend {
    topics: Mutex<Vec<Topic>>,
    stories: Mutex<Vec<Story>>,
    users: Mutex<Vec<User>>,
    next_id: AtomicI64,
    story_lookups: AtomicUsize,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(2001),
            ..Self::default()
        }
    }

    /// Seeded with the four season topics the fixtures shipped.
    #[must_use]
    pub fn with_season_topics() -> Self {
        let backend = Self::new();
        for (id, title) in [
            (1001, "Winter"),
            (1002, "Spring"),
            (1003, "Summer"),
            (1004, "Autumn"),
        ] {
            locked(&backend.topics).push(Topic {
                id,
                title: title.to_string(),
                created_at: fixture_time(),
            });
        }
        backend
    }

    fn alloc_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn seed_user(&self, external_id: i64) -> User {
        let user = User {
            id: self.alloc_id(),
            external_id,
        };
        locked(&self.users).push(user.clone());
        user
    }

    pub fn seed_story(&self, topic_id: i64, user_id: i64, description: &str) -> Story {
        let story = Story {
            id: self.alloc_id(),
            kind: StoryKind::Text,
            description: description.to_string(),
            content: description.to_string(),
            topic_id,
            user_id,
            created_at: fixture_time(),
        };
        locked(&self.stories).push(story.clone());
        story
    }

    /// How many times `lookup_story` reached this backend.
    #[must_use]
    pub fn story_lookups(&self) -> usize {
        self.story_lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn fetch_latest_topics(&self) -> ApiResult<Vec<Topic>> {
        Ok(locked(&self.topics).clone())
    }

    async fn search_topics(&self, query: &str) -> ApiResult<Vec<Topic>> {
        let query = query.to_lowercase();
        Ok(locked(&self.topics)
            .iter()
            .filter(|topic| topic.title.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }

    async fn fetch_topic_story_count(&self, topic_id: i64) -> ApiResult<u64> {
        Ok(locked(&self.stories)
            .iter()
            .filter(|story| story.topic_id == topic_id)
            .count() as u64)
    }

    async fn create_topic(&self, title: &str) -> ApiResult<Topic> {
        let topic = Topic {
            id: self.alloc_id(),
            title: title.to_string(),
            created_at: fixture_time(),
        };
        locked(&self.topics).push(topic.clone());
        Ok(topic)
    }

    async fn remove_topic(&self, id: i64) -> ApiResult<()> {
        let mut topics = locked(&self.topics);
        let before = topics.len();
        topics.retain(|topic| topic.id != id);
        if topics.len() == before {
            return Err(ApiError::NotFound(format!("topic {id}: not found")));
        }
        Ok(())
    }

    async fn lookup_story(&self, id: i64) -> ApiResult<Story> {
        self.story_lookups.fetch_add(1, Ordering::Relaxed);
        locked(&self.stories)
            .iter()
            .find(|story| story.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("story {id}: not found")))
    }

    async fn create_story(&self, draft: &StoryDraft) -> ApiResult<Story> {
        let story = Story {
            id: self.alloc_id(),
            kind: draft.kind,
            description: draft.description.clone(),
            content: draft.content.clone(),
            topic_id: draft.topic_id,
            user_id: draft.user_id,
            created_at: fixture_time(),
        };
        locked(&self.stories).push(story.clone());
        Ok(story)
    }

    async fn update_story(&self, id: i64, fields: &StoryPatch) -> ApiResult<Story> {
        let mut stories = locked(&self.stories);
        let story = stories
            .iter_mut()
            .find(|story| story.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("story {id}: not found")))?;
        if let Some(description) = &fields.description {
            story.description = description.clone();
        }
        Ok(story.clone())
    }

    async fn remove_story(&self, id: i64) -> ApiResult<()> {
        let mut stories = locked(&self.stories);
        let before = stories.len();
        stories.retain(|story| story.id != id);
        if stories.len() == before {
            return Err(ApiError::NotFound(format!("story {id}: not found")));
        }
        Ok(())
    }

    async fn register_user(&self, profile: &RegisterProfile) -> ApiResult<User> {
        let user = User {
            id: self.alloc_id(),
            external_id: profile.external_id,
        };
        locked(&self.users).push(user.clone());
        Ok(user)
    }

    async fn find_user_by_external_id(&self, external_id: i64) -> ApiResult<User> {
        locked(&self.users)
            .iter()
            .find(|user| user.external_id == external_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("user {external_id}: not found")))
    }
}

/// Which channel operation a render used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOp {
    Reply,
    Edit,
}

/// Records every render the engine dispatches.
#[derive(Default)]
pub struct RecordingChannel {
    renders: Mutex<Vec<(RenderOp, Screen)>>,
}

impl RecordingChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn renders(&self) -> Vec<(RenderOp, Screen)> {
        locked(&self.renders).clone()
    }

    #[must_use]
    pub fn last(&self) -> Option<(RenderOp, Screen)> {
        locked(&self.renders).last().cloned()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    async fn reply(&self, screen: &Screen) -> Result<(), ChannelError> {
        locked(&self.renders).push((RenderOp::Reply, screen.clone()));
        Ok(())
    }

    async fn edit_in_place(&self, screen: &Screen) -> Result<(), ChannelError> {
        locked(&self.renders).push((RenderOp::Edit, screen.clone()));
        Ok(())
    }
}

/// Mock backend that fails every call, for failure-path tests.
#[must_use]
pub fn mock_backend_down() -> MockBackend {
    fn down<T>() -> ApiResult<T> {
        Err(ApiError::Transport("backend is down".to_string()))
    }
    let mut mock = MockBackend::new();
    mock.expect_fetch_latest_topics().returning(|| down());
    mock.expect_search_topics().returning(|_| down());
    mock.expect_fetch_topic_story_count().returning(|_| down());
    mock.expect_create_topic().returning(|_| down());
    mock.expect_remove_topic().returning(|_| down());
    mock.expect_lookup_story().returning(|_| down());
    mock.expect_create_story().returning(|_| down());
    mock.expect_update_story().returning(|_, _| down());
    mock.expect_remove_story().returning(|_| down());
    mock.expect_register_user().returning(|_| down());
    mock.expect_find_user_by_external_id().returning(|_| down());
    mock
}
