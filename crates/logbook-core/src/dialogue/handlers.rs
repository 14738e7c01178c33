//! Transition handlers, one per edge of the dialogue graph.
//!
//! Every handler owns a single purpose and at most one backend call of
//! its own; handlers that drop the user back onto the topic list funnel
//! through [`topic_list_screen`], the shared resume path.

use super::{
    callback, parse_decimal_id, Ctx, Event, HandlerFuture, MediaKind, Outcome, StateId, Step,
    TerminalSignal,
};
use crate::backend::{ApiResult, Backend};
use crate::model::{topic_by_id, RegisterProfile, StoryDraft, StoryKind, StoryPatch};
use crate::render;
use crate::render::Screen;
use crate::session::{ReturnMapping, Session};
use tracing::{info, warn};

const TEXT_LATEST_TOPICS: &str = "Latest topics";
const TEXT_REGISTER_PROMPT: &str = "Welcome! Send the registration code to continue";
const TEXT_GOT_IT: &str = "Got it!";

/// Fetch the latest topics and build the list screen, consuming any
/// pending flash and the outer start-over flag. Shared by every handler
/// that resumes the topic selection, the way the source funneled
/// everything back through its start handler.
async fn topic_list_screen(session: &mut Session, backend: &dyn Backend) -> Screen {
    let resumed = session.data.take_start_over();
    let fetched = match backend.fetch_latest_topics().await {
        Ok(topics) => {
            session.data.topics = topics;
            true
        }
        Err(err) => {
            warn!(%err, "could not fetch latest topics");
            false
        }
    };
    let text = session
        .data
        .take_flash()
        .unwrap_or_else(|| TEXT_LATEST_TOPICS.to_string());
    let shown = if fetched { &session.data.topics[..] } else { &[] };
    tracing::debug!(resumed, topics = shown.len(), "rendering topic list");
    render::topic_list(shown, &text)
}

/// The topic screen of the story editor, entered fresh from a topic
/// button or resumed after a story operation. On fresh entry the tapped
/// id is parsed and stored; on resume the stored id is reused and the
/// consumed flash becomes the banner.
async fn story_editor_screen(cx: &mut Ctx<'_>) -> Screen {
    let resumed = cx.session.data.take_topic_start_over();
    if !resumed {
        if let Some(id) = cx.event.callback_data().and_then(parse_decimal_id) {
            cx.session.data.selected_topic_id = Some(id);
        }
    }
    let topic_id = cx.session.data.selected_topic_id;
    let title = match topic_id.and_then(|id| topic_by_id(&cx.session.data.topics, id)) {
        Some(topic) => topic.title.clone(),
        None => topic_id.map_or_else(|| "Topic".to_string(), |id| format!("Topic #{id}")),
    };
    let story_count = match topic_id {
        Some(id) => cx.backend.fetch_topic_story_count(id).await.ok(),
        None => None,
    };
    let banner = cx.session.data.take_flash();
    render::topic_screen(&title, story_count, banner.as_deref())
}

async fn resolve_user(session: &mut Session, backend: &dyn Backend) -> ApiResult<()> {
    let user = backend.find_user_by_external_id(session.id()).await?;
    session.data.user = Some(user);
    Ok(())
}

/// `/start`: resolve the user, then show the latest topics. Re-entrant
/// from any state; unwinds whatever was on the stack.
pub(crate) fn start(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        info!(conversation = cx.session.id(), "starting");
        if cx.session.data.user.is_none() {
            if let Err(err) = resolve_user(cx.session, cx.backend).await {
                info!(conversation = cx.session.id(), %err, "unknown user, asking for a code");
                return Step::reset_to(StateId::Register, render::prompt(TEXT_REGISTER_PROMPT));
            }
        }
        let screen = topic_list_screen(cx.session, cx.backend).await;
        Step::reset_to(StateId::SelectTopic, screen)
    })
}

/// Text typed in `Register`: check the code locally, then create the
/// user. A backend failure here is the one fatal path; nothing works
/// without an identity.
pub(crate) fn register(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let code = cx.event.text().unwrap_or_default().trim();
        if code != cx.settings.registration_code {
            return Step::stay(render::prompt("That code is not right, try again"));
        }
        let profile = RegisterProfile {
            external_id: cx.session.id(),
            code: code.to_string(),
        };
        match cx.backend.register_user(&profile).await {
            Ok(user) => {
                info!(conversation = cx.session.id(), user = user.id, "registered");
                cx.session.data.user = Some(user);
                cx.session.data.set_flash("You are in! Here are the latest topics");
                let screen = topic_list_screen(cx.session, cx.backend).await;
                Step::reset_to(StateId::SelectTopic, screen)
            }
            Err(err) => {
                warn!(conversation = cx.session.id(), %err, "registration failed, ending");
                Step {
                    outcome: Outcome::Terminal(TerminalSignal::End),
                    screen: Some(render::prompt("Registration failed, try again later")),
                }
            }
        }
    })
}

/// A numeric topic button from `SelectTopic`: push the story-editing
/// frame and show the topic screen.
pub(crate) fn enter_story_editor(mut cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let screen = story_editor_screen(&mut cx).await;
        Step {
            outcome: Outcome::EnterNested {
                initial: StateId::SelectStoryType,
                returns: ReturnMapping {
                    on_end: StateId::SelectTopic,
                    on_stop: StateId::Stopping,
                },
            },
            screen: Some(screen),
        }
    })
}

pub(crate) fn search_topic_intro(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        info!(conversation = cx.session.id(), "search topic");
        Step::to(
            StateId::SearchTopic,
            render::prompt("Type the topic name to search"),
        )
    })
}

/// The typed search query. Empty results keep the full navigation row
/// so every flow stays reachable without `/start`.
pub(crate) fn search_topic(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let query = cx.event.text().unwrap_or_default();
        info!(query, "searching for topics");
        let screen = match cx.backend.search_topics(query).await {
            Ok(topics) if !topics.is_empty() => {
                cx.session.data.topics = topics;
                render::topic_list(&cx.session.data.topics, "Search results")
            }
            Ok(_) => render::topic_list(&[], "Nothing found, try again"),
            Err(err) => {
                warn!(%err, "topic search failed");
                render::topic_list(&[], "Nothing found, try again")
            }
        };
        Step::to(StateId::SelectTopic, screen)
    })
}

pub(crate) fn create_topic_intro(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        info!(conversation = cx.session.id(), "new topic");
        Step::to(
            StateId::CreateTopic,
            render::prompt("Okay, type the new topic name"),
        )
    })
}

/// The typed topic title: create it and fall back onto the refreshed
/// list, flashing the result either way.
pub(crate) fn create_topic(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let title = cx.event.text().unwrap_or_default().trim().to_string();
        match cx.backend.create_topic(&title).await {
            Ok(topic) => {
                info!(topic = topic.id, "topic created");
                cx.session.data.set_flash("New topic was created");
            }
            Err(err) => cx.session.data.set_flash(err.to_string()),
        }
        cx.session.data.mark_start_over();
        let screen = topic_list_screen(cx.session, cx.backend).await;
        Step::to(StateId::SelectTopic, screen)
    })
}

pub(crate) fn lookup_story_intro(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        info!(conversation = cx.session.id(), "lookup story");
        Step::to(StateId::LookupStory, render::prompt("Input story ID"))
    })
}

/// The typed story id. Non-numeric input short-circuits onto the
/// not-found screen without touching the backend.
pub(crate) fn lookup_story(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let raw = cx.event.text().unwrap_or_default().trim();
        let Some(story_id) = parse_decimal_id(raw) else {
            info!(input = raw, "invalid story id");
            return Step::to(
                StateId::EditStory,
                render::story_missing("That is not a story ID, send a number"),
            );
        };
        cx.session.data.selected_story_id = Some(story_id);
        let screen = match cx.backend.lookup_story(story_id).await {
            Ok(story) => render::story_screen(&story),
            Err(err) => {
                info!(story = story_id, %err, "story not found");
                render::story_missing(&format!("Story {story_id} was not found"))
            }
        };
        Step::to(StateId::EditStory, screen)
    })
}

pub(crate) fn edit_story_intro(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        info!(conversation = cx.session.id(), "edit story description");
        Step::to(StateId::UpdateStory, render::prompt("Input story description"))
    })
}

/// The typed replacement description for the selected story.
pub(crate) fn update_story(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let Some(story_id) = cx.session.data.selected_story_id else {
            return Step::to(
                StateId::EditStory,
                render::story_missing("No story selected, look one up first"),
            );
        };
        let fields = StoryPatch {
            description: Some(cx.event.text().unwrap_or_default().to_string()),
        };
        let screen = match cx.backend.update_story(story_id, &fields).await {
            Ok(story) => {
                info!(story = story.id, "story updated");
                render::story_screen(&story)
            }
            Err(err) => {
                warn!(story = story_id, %err, "story update failed");
                render::story_missing(&format!("Story {story_id} could not be updated"))
            }
        };
        Step::to(StateId::EditStory, screen)
    })
}

/// Remove the selected story, then drop back onto the topic list with a
/// one-shot confirmation.
pub(crate) fn remove_story(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        match cx.session.data.selected_story_id.take() {
            Some(id) => match cx.backend.remove_story(id).await {
                Ok(()) => {
                    info!(story = id, "story removed");
                    cx.session.data.set_flash(format!("Story #{id} was removed"));
                }
                Err(err) => {
                    warn!(story = id, %err, "story removal failed");
                    cx.session.data.set_flash(format!("Could not remove story #{id}"));
                }
            },
            None => cx.session.data.set_flash("No story selected"),
        }
        cx.session.data.mark_start_over();
        let screen = topic_list_screen(cx.session, cx.backend).await;
        Step::to(StateId::SelectTopic, screen)
    })
}

/// Back from the story screen to the topic list.
pub(crate) fn close_story(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        cx.session.data.selected_story_id = None;
        cx.session.data.mark_start_over();
        let screen = topic_list_screen(cx.session, cx.backend).await;
        Step::to(StateId::SelectTopic, screen)
    })
}

/// A story-type button on the topic screen: prompt for the matching
/// content.
pub(crate) fn ask_for_story(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let (next, text) = match cx.event.callback_data() {
            Some(callback::TEXT) => (StateId::TextStory, "Tell your story"),
            Some(callback::VIDEO) => (StateId::VideoStory, "Attach video"),
            Some(callback::PHOTO) => (StateId::PhotoStory, "Attach photo"),
            _ => return Step::silent(Outcome::Stay),
        };
        Step::to(next, render::prompt(text))
    })
}

fn draft(cx: &Ctx<'_>, kind: StoryKind, description: String, content: String) -> StoryDraft {
    StoryDraft {
        kind,
        description,
        content,
        topic_id: cx.session.data.selected_topic_id.unwrap_or_default(),
        user_id: cx.session.data.user.as_ref().map(|u| u.id).unwrap_or_default(),
    }
}

async fn save_story(cx: &mut Ctx<'_>, draft: StoryDraft) {
    match cx.backend.create_story(&draft).await {
        Ok(story) => {
            info!(story = story.id, topic = story.topic_id, "story created");
            cx.session.data.set_flash(TEXT_GOT_IT);
        }
        Err(err) => {
            warn!(topic = draft.topic_id, %err, "story creation failed");
            cx.session.data.set_flash(format!("Could not save the story: {err}"));
        }
    }
    cx.session.data.mark_topic_start_over();
}

/// A video or photo arrived while its story state was active: persist it
/// and resume the topic screen.
pub(crate) fn save_media_story(mut cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        if let Event::Media {
            kind,
            caption,
            file_ref,
        } = cx.event
        {
            let story_kind = match kind {
                MediaKind::Video => StoryKind::Video,
                _ => StoryKind::Photo,
            };
            let story = draft(
                &cx,
                story_kind,
                caption.clone().unwrap_or_default(),
                file_ref.clone(),
            );
            save_story(&mut cx, story).await;
        }
        let screen = story_editor_screen(&mut cx).await;
        Step::to(StateId::SelectStoryType, screen)
    })
}

/// The typed story text: persist it and resume the topic screen.
pub(crate) fn save_text_story(mut cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        let text = cx.event.text().unwrap_or_default().to_string();
        let story = draft(&cx, StoryKind::Text, text.clone(), text);
        save_story(&mut cx, story).await;
        let screen = story_editor_screen(&mut cx).await;
        Step::to(StateId::SelectStoryType, screen)
    })
}

/// Back from the topic screen: the inner conversation is done, resume
/// the topic list in the outer machine.
pub(crate) fn close_topic(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        info!(conversation = cx.session.id(), "closing topic");
        cx.session.data.selected_topic_id = None;
        cx.session.data.mark_start_over();
        let screen = topic_list_screen(cx.session, cx.backend).await;
        Step {
            outcome: Outcome::Terminal(TerminalSignal::End),
            screen: Some(screen),
        }
    })
}

/// Remove the selected topic and resume the topic list.
pub(crate) fn remove_topic(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        if let Some(id) = cx.session.data.selected_topic_id.take() {
            match cx.backend.remove_topic(id).await {
                Ok(()) => {
                    info!(topic = id, "topic removed");
                    cx.session.data.set_flash(format!("Topic #{id} was removed"));
                }
                Err(err) => {
                    warn!(topic = id, %err, "topic removal failed");
                    cx.session.data.set_flash(format!("Could not remove topic #{id}"));
                }
            }
        }
        cx.session.data.mark_start_over();
        let screen = topic_list_screen(cx.session, cx.backend).await;
        Step {
            outcome: Outcome::Terminal(TerminalSignal::End),
            screen: Some(screen),
        }
    })
}

/// `/exit` while nested: say goodbye and stop both machines.
pub(crate) fn close_nested(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        info!(conversation = cx.session.id(), "leaving the nested dialogue");
        Step {
            outcome: Outcome::Terminal(TerminalSignal::Stop),
            screen: Some(render::farewell()),
        }
    })
}

/// `/exit` in the outer machine: the conversation is over.
pub(crate) fn end_conversation(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        info!(conversation = cx.session.id(), "exit");
        Step::silent(Outcome::Terminal(TerminalSignal::End))
    })
}

/// `/help` anywhere: show the command list, keep the state.
pub(crate) fn show_help(cx: Ctx<'_>) -> HandlerFuture<'_> {
    Box::pin(async move {
        info!(conversation = cx.session.id(), "showing help");
        Step::stay(render::help())
    })
}
