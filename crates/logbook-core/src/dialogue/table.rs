//! The transition table: `(state, selector) -> handler`, immutable once
//! built.
//!
//! Rules are matched first-match-wins in declaration order. A state's
//! effective rule list is its own rules, then its machine's fallbacks,
//! then the global rules, mirroring the precedence the source dialogue
//! gave state handlers over fallbacks over entry points.

use super::{callback, handlers, Event, Handler, Machine, MediaKind, Selector, StateId};
use std::collections::HashMap;

/// One `(selector, handler)` row within a state. `name` identifies the
/// handler in traces.
#[derive(Clone, Copy)]
pub struct Rule {
    pub selector: Selector,
    pub handler: Handler,
    pub name: &'static str,
}

/// The dialogue graph. Built once by [`TableBuilder`], never mutated.
pub struct TransitionTable {
    states: HashMap<StateId, Vec<Rule>>,
    machines: HashMap<StateId, Machine>,
}

impl TransitionTable {
    #[must_use]
    pub fn builder() -> TableBuilder {
        TableBuilder::default()
    }

    /// First rule of the active state matching the event, if any.
    #[must_use]
    pub fn lookup(&self, state: StateId, event: &Event) -> Option<&Rule> {
        self.states
            .get(&state)?
            .iter()
            .find(|rule| rule.selector.matches(event))
    }

    /// Whether the state is part of the declared state set.
    #[must_use]
    pub fn declares(&self, state: StateId) -> bool {
        self.machines.contains_key(&state)
    }

    #[must_use]
    pub fn machine_of(&self, state: StateId) -> Option<Machine> {
        self.machines.get(&state).copied()
    }
}

/// Builder for [`TransitionTable`]. Declaration order is match order.
#[derive(Default)]
pub struct TableBuilder {
    declarations: Vec<(StateId, Machine)>,
    rules: Vec<(StateId, Rule)>,
    fallbacks: Vec<(Machine, Rule)>,
    globals: Vec<Rule>,
}

impl TableBuilder {
    /// Declare a state and the machine it belongs to. States must be
    /// declared before rules target them.
    #[must_use]
    pub fn state(mut self, machine: Machine, state: StateId) -> Self {
        self.declarations.push((state, machine));
        self
    }

    /// Add a rule to a state.
    #[must_use]
    pub fn on(
        mut self,
        state: StateId,
        selector: Selector,
        name: &'static str,
        handler: Handler,
    ) -> Self {
        self.rules.push((
            state,
            Rule {
                selector,
                handler,
                name,
            },
        ));
        self
    }

    /// Add a rule checked in every state of one machine, after that
    /// state's own rules.
    #[must_use]
    pub fn fallback(
        mut self,
        machine: Machine,
        selector: Selector,
        name: &'static str,
        handler: Handler,
    ) -> Self {
        self.fallbacks.push((
            machine,
            Rule {
                selector,
                handler,
                name,
            },
        ));
        self
    }

    /// Add a rule checked last in every declared state.
    #[must_use]
    pub fn global(mut self, selector: Selector, name: &'static str, handler: Handler) -> Self {
        self.globals.push(Rule {
            selector,
            handler,
            name,
        });
        self
    }

    #[must_use]
    pub fn build(self) -> TransitionTable {
        let mut states: HashMap<StateId, Vec<Rule>> = HashMap::new();
        let mut machines = HashMap::new();
        for (state, machine) in &self.declarations {
            machines.insert(*state, *machine);
            states.insert(*state, Vec::new());
        }
        for (state, rule) in self.rules {
            if let Some(rules) = states.get_mut(&state) {
                rules.push(rule);
            }
        }
        for (state, machine) in &self.declarations {
            if let Some(rules) = states.get_mut(state) {
                for (fallback_machine, rule) in &self.fallbacks {
                    if fallback_machine == machine {
                        rules.push(*rule);
                    }
                }
                rules.extend(self.globals.iter().copied());
            }
        }
        TransitionTable { states, machines }
    }
}

/// The dialogue graph of the logbook bot, wired once at startup.
#[must_use]
pub fn standard_table() -> TransitionTable {
    use super::CommandKind::{Exit, Help, Start};
    use super::Machine::{Inner, Outer};
    use super::Selector::Command;

    let builder = TransitionTable::builder();
    let builder = topic_selection(builder);
    let builder = story_management(builder);
    let builder = story_editor(builder);
    builder
        .fallback(Inner, Command(Exit), "close_nested", handlers::close_nested)
        .fallback(Outer, Command(Exit), "end_conversation", handlers::end_conversation)
        .global(Command(Start), "start", handlers::start)
        .global(Command(Help), "show_help", handlers::show_help)
        .build()
}

/// Outer machine, topic side: listing, searching, creating.
fn topic_selection(builder: TableBuilder) -> TableBuilder {
    use super::Machine::Outer;
    use super::Selector::{Callback, Text, TopicId};

    builder
        .state(Outer, StateId::End)
        .state(Outer, StateId::Stopping)
        .state(Outer, StateId::Register)
        .on(StateId::Register, Text, "register", handlers::register)
        .state(Outer, StateId::SelectTopic)
        .on(
            StateId::SelectTopic,
            TopicId,
            "enter_story_editor",
            handlers::enter_story_editor,
        )
        .on(
            StateId::SelectTopic,
            Callback(callback::SEARCH),
            "search_topic_intro",
            handlers::search_topic_intro,
        )
        .on(
            StateId::SelectTopic,
            Callback(callback::NEW),
            "create_topic_intro",
            handlers::create_topic_intro,
        )
        .on(
            StateId::SelectTopic,
            Callback(callback::LOOKUP),
            "lookup_story_intro",
            handlers::lookup_story_intro,
        )
        .state(Outer, StateId::SearchTopic)
        .on(StateId::SearchTopic, Text, "search_topic", handlers::search_topic)
        // The intro variants are declared states of the source dialogue
        // that never rested; they carry the same text rules as their
        // awaiting counterparts so the table is total over the set.
        .state(Outer, StateId::CreateTopic)
        .on(StateId::CreateTopic, Text, "create_topic", handlers::create_topic)
        .state(Outer, StateId::CreateTopicIntro)
        .on(StateId::CreateTopicIntro, Text, "create_topic", handlers::create_topic)
}

/// Outer machine, story side: lookup, edit, removal.
fn story_management(builder: TableBuilder) -> TableBuilder {
    use super::Machine::Outer;
    use super::Selector::{Callback, Text};

    builder
        .state(Outer, StateId::LookupStory)
        .on(StateId::LookupStory, Text, "lookup_story", handlers::lookup_story)
        .state(Outer, StateId::LookupStoryIntro)
        .on(StateId::LookupStoryIntro, Text, "lookup_story", handlers::lookup_story)
        .state(Outer, StateId::EditStory)
        .on(
            StateId::EditStory,
            Callback(callback::LOOKUP),
            "lookup_story_intro",
            handlers::lookup_story_intro,
        )
        .on(
            StateId::EditStory,
            Callback(callback::EDIT),
            "edit_story_intro",
            handlers::edit_story_intro,
        )
        .on(
            StateId::EditStory,
            Callback(callback::REMOVE_STORY),
            "remove_story",
            handlers::remove_story,
        )
        .on(
            StateId::EditStory,
            Callback(callback::BACK),
            "close_story",
            handlers::close_story,
        )
        .state(Outer, StateId::UpdateStory)
        .on(StateId::UpdateStory, Text, "update_story", handlers::update_story)
}

/// Inner machine: the nested story-editing conversation.
fn story_editor(builder: TableBuilder) -> TableBuilder {
    use super::Machine::Inner;
    use super::Selector::{Callback, Media, Text};

    builder
        .state(Inner, StateId::SelectStoryType)
        .on(
            StateId::SelectStoryType,
            Callback(callback::VIDEO),
            "ask_for_story",
            handlers::ask_for_story,
        )
        .on(
            StateId::SelectStoryType,
            Callback(callback::PHOTO),
            "ask_for_story",
            handlers::ask_for_story,
        )
        .on(
            StateId::SelectStoryType,
            Callback(callback::TEXT),
            "ask_for_story",
            handlers::ask_for_story,
        )
        .on(
            StateId::SelectStoryType,
            Callback(callback::REMOVE_TOPIC),
            "remove_topic",
            handlers::remove_topic,
        )
        .on(
            StateId::SelectStoryType,
            Callback(callback::BACK),
            "close_topic",
            handlers::close_topic,
        )
        .state(Inner, StateId::VideoStory)
        .on(
            StateId::VideoStory,
            Media(MediaKind::Video),
            "save_video_story",
            handlers::save_media_story,
        )
        .state(Inner, StateId::PhotoStory)
        .on(
            StateId::PhotoStory,
            Media(MediaKind::Photo),
            "save_photo_story",
            handlers::save_media_story,
        )
        .state(Inner, StateId::TextStory)
        .on(StateId::TextStory, Text, "save_text_story", handlers::save_text_story)
}

#[cfg(test)]
mod tests {
    use super::standard_table;
    use crate::dialogue::{CommandKind, Event, StateId};

    fn tap(data: &str) -> Event {
        Event::Callback {
            data: data.to_string(),
        }
    }

    #[test]
    fn test_numeric_callback_routes_to_story_editor() {
        let table = standard_table();
        let rule = table
            .lookup(StateId::SelectTopic, &tap("1001"))
            .expect("rule");
        assert_eq!(rule.name, "enter_story_editor");
        let rule = table
            .lookup(StateId::SelectTopic, &tap("search"))
            .expect("rule");
        assert_eq!(rule.name, "search_topic_intro");
    }

    #[test]
    fn test_exit_fallback_differs_per_machine() {
        let table = standard_table();
        let exit = Event::Command(CommandKind::Exit);
        let inner = table
            .lookup(StateId::SelectStoryType, &exit)
            .expect("inner rule");
        assert_eq!(inner.name, "close_nested");
        let outer = table.lookup(StateId::SelectTopic, &exit).expect("outer rule");
        assert_eq!(outer.name, "end_conversation");
    }

    #[test]
    fn test_start_is_reachable_from_everywhere() {
        let table = standard_table();
        let start = Event::Command(CommandKind::Start);
        for state in [
            StateId::End,
            StateId::Stopping,
            StateId::SelectTopic,
            StateId::SearchTopic,
            StateId::Register,
            StateId::VideoStory,
        ] {
            let rule = table.lookup(state, &start).expect("start rule");
            assert_eq!(rule.name, "start");
        }
    }

    #[test]
    fn test_unmatched_events_have_no_rule() {
        let table = standard_table();
        let text = Event::Text {
            text: "hello".to_string(),
        };
        assert!(table.lookup(StateId::SelectTopic, &text).is_none());
        assert!(table.lookup(StateId::End, &tap("search")).is_none());
        // Wrong media kind in a story state is dropped too.
        let photo = Event::Media {
            kind: crate::dialogue::MediaKind::Photo,
            caption: None,
            file_ref: "f1".to_string(),
        };
        assert!(table.lookup(StateId::VideoStory, &photo).is_none());
    }

    #[test]
    fn test_every_declared_state_is_known() {
        let table = standard_table();
        for state in [
            StateId::SelectTopic,
            StateId::SearchTopic,
            StateId::CreateTopicIntro,
            StateId::CreateTopic,
            StateId::LookupStoryIntro,
            StateId::LookupStory,
            StateId::EditStory,
            StateId::UpdateStory,
            StateId::Register,
            StateId::Stopping,
            StateId::End,
            StateId::SelectStoryType,
            StateId::VideoStory,
            StateId::PhotoStory,
            StateId::TextStory,
        ] {
            assert!(table.declares(state), "{state:?} missing from table");
        }
    }
}
