//! Event dispatch: one event in, at most one handler run, one render,
//! one state commit.

use super::table::TransitionTable;
use super::{Ctx, Event, Outcome, StateId, TerminalSignal};
use crate::backend::Backend;
use crate::channel::{Channel, ChannelError};
use crate::config::ApiSettings;
use crate::render::RenderMethod;
use crate::session::{Frame, Session};
use std::sync::Arc;
use tracing::{debug, info};

/// How a dispatch concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran; the session now rests in this state.
    Handled(StateId),
    /// Nothing in the active state matched; the event was dropped and
    /// the session is untouched.
    Ignored,
}

/// Drives sessions through the transition table.
pub struct Engine {
    table: TransitionTable,
    backend: Arc<dyn Backend>,
    settings: ApiSettings,
}

impl Engine {
    #[must_use]
    pub fn new(table: TransitionTable, backend: Arc<dyn Backend>, settings: ApiSettings) -> Self {
        Self {
            table,
            backend,
            settings,
        }
    }

    #[must_use]
    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Process one event against one session.
    ///
    /// The caller must hold the session for the duration of the call;
    /// events for the same conversation must never be dispatched
    /// concurrently. The state is committed only after the handler and
    /// its render succeed, so a channel failure leaves the session in
    /// its last good state.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] if the rendered screen could not be
    /// put on the channel. Backend failures never surface here; they
    /// are folded into screens by the handlers.
    pub async fn dispatch(
        &self,
        session: &mut Session,
        event: &Event,
        channel: &dyn Channel,
    ) -> Result<Dispatch, ChannelError> {
        let state = session.current();
        let Some(rule) = self.table.lookup(state, event) else {
            debug!(?state, "no transition matched, dropping event");
            return Ok(Dispatch::Ignored);
        };
        debug!(?state, handler = rule.name, "dispatching");

        let step = (rule.handler)(Ctx {
            event,
            session: &mut *session,
            backend: self.backend.as_ref(),
            settings: &self.settings,
        })
        .await;

        if let Some(screen) = &step.screen {
            match RenderMethod::for_event(event) {
                RenderMethod::Reply => channel.reply(screen).await?,
                RenderMethod::EditInPlace => channel.edit_in_place(screen).await?,
            }
        }

        let next = self.apply(session, step.outcome);
        debug_assert!(
            self.table.declares(next),
            "transitioned into undeclared state {next:?}"
        );
        Ok(Dispatch::Handled(next))
    }

    fn apply(&self, session: &mut Session, outcome: Outcome) -> StateId {
        match outcome {
            Outcome::Stay => {}
            Outcome::Transition(next) => session.set_current(next),
            Outcome::EnterNested { initial, returns } => {
                session.push_frame(Frame {
                    parent: session.current(),
                    returns,
                });
                session.set_current(initial);
            }
            Outcome::Terminal(signal) => self.unwind(session, signal),
            Outcome::Reset(next) => session.reset(next),
        }
        session.current()
    }

    fn unwind(&self, session: &mut Session, signal: TerminalSignal) {
        match session.pop_frame() {
            Some(frame) => {
                let next = frame.returns.resolve(signal);
                debug!(parent = ?frame.parent, ?signal, ?next, "nested conversation terminated");
                session.set_current(next);
            }
            None => {
                info!(conversation = session.id(), "conversation terminated");
                session.terminate();
            }
        }
    }
}
