//! Backend client: the remote topics/stories/users API.
//!
//! Every operation returns the uniform [`ApiResult`] envelope. The
//! dialogue engine never branches on the error variant, only on success
//! versus failure; the error's display string feeds failure screens.

mod http;

pub use http::HttpBackend;

use crate::model::{RegisterProfile, Story, StoryDraft, StoryPatch, Topic, User};
use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

/// Uniform result envelope for every backend operation.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failure talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or HTTP failure, including non-success statuses.
    #[error("request failed: {0}")]
    Transport(String),
    /// Well-formed call, empty or absent result.
    #[error("{0}")]
    NotFound(String),
}

/// The remote data API, as the dialogue engine consumes it.
///
/// Calls are suspension points: the engine holds the session for the
/// duration of a call, so events for the same conversation queue behind
/// it. No operation panics or escapes the [`ApiResult`] envelope.
#[automock]
#[async_trait]
pub trait Backend: Send + Sync {
    async fn fetch_latest_topics(&self) -> ApiResult<Vec<Topic>>;
    async fn search_topics(&self, query: &str) -> ApiResult<Vec<Topic>>;
    async fn fetch_topic_story_count(&self, topic_id: i64) -> ApiResult<u64>;
    async fn create_topic(&self, title: &str) -> ApiResult<Topic>;
    async fn remove_topic(&self, id: i64) -> ApiResult<()>;
    async fn lookup_story(&self, id: i64) -> ApiResult<Story>;
    async fn create_story(&self, draft: &StoryDraft) -> ApiResult<Story>;
    async fn update_story(&self, id: i64, fields: &StoryPatch) -> ApiResult<Story>;
    async fn remove_story(&self, id: i64) -> ApiResult<()>;
    async fn register_user(&self, profile: &RegisterProfile) -> ApiResult<User>;
    async fn find_user_by_external_id(&self, external_id: i64) -> ApiResult<User>;
}
