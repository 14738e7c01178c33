//! JSON-over-HTTP implementation of [`Backend`].

use super::{ApiError, ApiResult, Backend};
use crate::config::ApiSettings;
use crate::model::{RegisterProfile, Story, StoryDraft, StoryPatch, Topic, User};
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Client for the remote logbook API: bearer-token auth, `format=json`
/// on every request, resource collections `topics/`, `stories/`,
/// `users/`.
pub struct HttpBackend {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpBackend {
    /// Build a client with the configured timeout. The timeout prevents
    /// an unresponsive backend from hanging a session forever at the
    /// transport level; the engine itself sets no deadline.
    #[must_use]
    pub fn new(settings: &ApiSettings) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: settings.api_host.trim_end_matches('/').to_string(),
            token: settings.api_token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> ApiResult<Response> {
        debug!(%method, path, "backend request");
        let mut request = self
            .http
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .query(&[("format", "json")])
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(format!("{path}: not found"))),
            status if !status.is_success() => {
                Err(ApiError::Transport(format!("api error: {status}")))
            }
            _ => Ok(response),
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> ApiResult<T> {
        let response = self.send(method, path, query, body).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Transport(format!("bad response body: {e}")))
    }
}

fn encode<B: Serialize>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| ApiError::Transport(format!("encode: {e}")))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_latest_topics(&self) -> ApiResult<Vec<Topic>> {
        self.fetch(Method::GET, "topics/", &[], None).await
    }

    async fn search_topics(&self, query: &str) -> ApiResult<Vec<Topic>> {
        self.fetch(
            Method::GET,
            "topics/",
            &[("search", query.to_string())],
            None,
        )
        .await
    }

    async fn fetch_topic_story_count(&self, topic_id: i64) -> ApiResult<u64> {
        // The API exposes no count endpoint; list the topic's stories
        // and count client-side.
        let stories: Vec<Story> = self
            .fetch(
                Method::GET,
                "stories/",
                &[("topic", topic_id.to_string())],
                None,
            )
            .await?;
        Ok(stories.len() as u64)
    }

    async fn create_topic(&self, title: &str) -> ApiResult<Topic> {
        self.fetch(Method::POST, "topics/", &[], Some(json!({ "title": title })))
            .await
    }

    async fn remove_topic(&self, id: i64) -> ApiResult<()> {
        self.send(Method::DELETE, &format!("topics/{id}/"), &[], None)
            .await
            .map(|_| ())
    }

    async fn lookup_story(&self, id: i64) -> ApiResult<Story> {
        self.fetch(Method::GET, &format!("stories/{id}/"), &[], None)
            .await
    }

    async fn create_story(&self, draft: &StoryDraft) -> ApiResult<Story> {
        self.fetch(Method::POST, "stories/", &[], Some(encode(draft)?))
            .await
    }

    async fn update_story(&self, id: i64, fields: &StoryPatch) -> ApiResult<Story> {
        self.fetch(
            Method::PUT,
            &format!("stories/{id}/"),
            &[],
            Some(encode(fields)?),
        )
        .await
    }

    async fn remove_story(&self, id: i64) -> ApiResult<()> {
        self.send(Method::DELETE, &format!("stories/{id}/"), &[], None)
            .await
            .map(|_| ())
    }

    async fn register_user(&self, profile: &RegisterProfile) -> ApiResult<User> {
        self.fetch(Method::POST, "users/", &[], Some(encode(profile)?))
            .await
    }

    async fn find_user_by_external_id(&self, external_id: i64) -> ApiResult<User> {
        let users: Vec<User> = self
            .fetch(
                Method::GET,
                "users/",
                &[("external_id", external_id.to_string())],
                None,
            )
            .await?;
        users
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("user {external_id}: not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::HttpBackend;
    use crate::config::ApiSettings;

    fn settings(host: &str) -> ApiSettings {
        ApiSettings {
            api_host: host.to_string(),
            api_token: "token".to_string(),
            registration_code: "1234".to_string(),
            http_timeout_secs: 30,
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let backend = HttpBackend::new(&settings("http://localhost:8000/api/"));
        assert_eq!(
            backend.url("topics/"),
            "http://localhost:8000/api/topics/"
        );
        let backend = HttpBackend::new(&settings("http://localhost:8000/api"));
        assert_eq!(
            backend.url("stories/7/"),
            "http://localhost:8000/api/stories/7/"
        );
    }
}
