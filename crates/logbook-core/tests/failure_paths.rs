//! Backend failures recover into navigable screens, never crashes.

use logbook_core::backend::{ApiError, MockBackend};
use logbook_core::config::ApiSettings;
use logbook_core::dialogue::{standard_table, CommandKind, Dispatch, Engine, Event, StateId};
use logbook_core::model::User;
use logbook_core::session::Session;
use logbook_core::testing::{mock_backend_down, RecordingChannel};
use std::sync::Arc;

const CHAT: i64 = 7;

fn settings() -> ApiSettings {
    ApiSettings {
        api_host: "http://localhost:8000/api".to_string(),
        api_token: "token".to_string(),
        registration_code: "1234".to_string(),
        http_timeout_secs: 30,
    }
}

fn start() -> Event {
    Event::Command(CommandKind::Start)
}

#[tokio::test]
async fn test_start_with_backend_down_asks_to_register() {
    let engine = Engine::new(standard_table(), Arc::new(mock_backend_down()), settings());
    let channel = RecordingChannel::new();
    let mut session = Session::new(CHAT);

    // The failed user lookup reads as "unknown user": the conversation
    // moves on instead of erroring out.
    let result = engine
        .dispatch(&mut session, &start(), &channel)
        .await
        .expect("dispatch succeeds");

    assert_eq!(result, Dispatch::Handled(StateId::Register));
    let (_, screen) = channel.last().expect("prompt rendered");
    assert!(screen.text.contains("registration code"));
}

#[tokio::test]
async fn test_topic_fetch_failure_still_renders_the_list_screen() {
    let mut mock = MockBackend::new();
    mock.expect_find_user_by_external_id().returning(|id| {
        Ok(User {
            id: 1,
            external_id: id,
        })
    });
    mock.expect_fetch_latest_topics()
        .returning(|| Err(ApiError::Transport("backend is down".to_string())));
    let engine = Engine::new(standard_table(), Arc::new(mock), settings());
    let channel = RecordingChannel::new();
    let mut session = Session::new(CHAT);

    let result = engine
        .dispatch(&mut session, &start(), &channel)
        .await
        .expect("dispatch succeeds");

    // The screen is empty but navigable: all three flows stay reachable.
    assert_eq!(result, Dispatch::Handled(StateId::SelectTopic));
    let (_, screen) = channel.last().expect("list rendered");
    assert_eq!(screen.text, "Latest topics");
    let rows = screen.keyboard.expect("keyboard");
    assert_eq!(rows.len(), 1);
    let tags: Vec<&str> = rows[0].iter().map(|b| b.tag.as_str()).collect();
    assert_eq!(tags, ["search", "new", "lookup"]);
}

#[tokio::test]
async fn test_create_topic_failure_flashes_the_error() {
    let mut mock = MockBackend::new();
    mock.expect_find_user_by_external_id().returning(|id| {
        Ok(User {
            id: 1,
            external_id: id,
        })
    });
    mock.expect_fetch_latest_topics().returning(|| Ok(Vec::new()));
    mock.expect_create_topic()
        .returning(|_| Err(ApiError::Transport("backend is down".to_string())));
    let engine = Engine::new(standard_table(), Arc::new(mock), settings());
    let channel = RecordingChannel::new();
    let mut session = Session::new(CHAT);

    for event in [
        start(),
        Event::Callback {
            data: "new".to_string(),
        },
        Event::Text {
            text: "Doomed".to_string(),
        },
    ] {
        engine
            .dispatch(&mut session, &event, &channel)
            .await
            .expect("dispatch succeeds");
    }

    assert_eq!(session.current(), StateId::SelectTopic);
    let (_, screen) = channel.last().expect("list rendered");
    assert!(screen.text.contains("request failed"));
}
