//! Event dispatch - routes each `ServerEvent` to its state mutation
//!
//! Dispatch is synchronous and never waits on anything. Work that needs the
//! network (the diff refresh after a run finishes) is returned as an
//! [`Effect`] for the coordinator to schedule in the background.

use tracing::debug;

use super::envelope::ServerEvent;
use crate::error::ErrorNotice;
use crate::session::{AgentStatus, InteractionKind};
use crate::store::SyncStore;

/// Side effects requested by a dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Pull git status; fire-and-forget relative to dispatch
    RefreshDiff,
    /// Session identity changed (idempotent setter reported a change)
    SessionChanged { session_id: Option<String> },
    /// Claude state entered `waiting`
    WaitingEntered,
    /// A new pending interaction replaced any previous one
    InteractionRequested { request_id: String },
    /// User-visible error reported by the agent
    Error(ErrorNotice),
}

/// Apply one event to the store and collect the resulting effects
pub fn dispatch(store: &mut SyncStore, event: ServerEvent) -> Vec<Effect> {
    debug!(kind = event.kind_name(), "{}", event.description());
    let mut effects = Vec::new();

    match event {
        ServerEvent::Log(payload) => {
            let entry = payload.into_entry();
            if let Some(id) = entry.session_id.as_deref() {
                set_session_id(store, id, &mut effects);
            }
            store.append_log(entry);
        }
        ServerEvent::Status(update) => {
            let next = update.apply_to(store.session.status());
            apply_status(store, next, &mut effects);
        }
        ServerEvent::StatusResponse(status) => {
            apply_status(store, status, &mut effects);
        }
        ServerEvent::SessionInfo(info) => {
            set_session_id(store, &info.session_id, &mut effects);
        }
        ServerEvent::Waiting(payload) => {
            set_pending(store, payload.into_pending(InteractionKind::Question), &mut effects);
        }
        ServerEvent::PermissionRequest(payload) => {
            set_pending(
                store,
                payload.into_pending(InteractionKind::Permission),
                &mut effects,
            );
        }
        ServerEvent::Diff(entry) => {
            store.upsert_diff(entry);
        }
        ServerEvent::FileChanged(change) => match change.to_diff_entry() {
            Some(entry) => store.upsert_diff(entry),
            None => store.remove_diff(&change.path),
        },
        ServerEvent::Error(err) => {
            let message = match err.code {
                Some(code) => format!("{}: {}", code, err.message),
                None => err.message,
            };
            effects.push(Effect::Error(ErrorNotice::command(message)));
        }
    }

    effects
}

fn apply_status(store: &mut SyncStore, next: AgentStatus, effects: &mut Vec<Effect>) {
    let session_id = next.session_id.clone();
    let transition = store.session.apply_status(next);

    if let Some(id) = session_id.as_deref() {
        set_session_id(store, id, effects);
    }
    if transition.entered_waiting() {
        effects.push(Effect::WaitingEntered);
    }
    if transition.finished_run() {
        effects.push(Effect::RefreshDiff);
    }
}

fn set_session_id(store: &mut SyncStore, id: &str, effects: &mut Vec<Effect>) {
    if id.is_empty() {
        return;
    }
    if store.session.set_session_id(id) {
        effects.push(Effect::SessionChanged {
            session_id: Some(id.to_string()),
        });
    }
}

fn set_pending(
    store: &mut SyncStore,
    interaction: crate::session::PendingInteraction,
    effects: &mut Vec<Effect>,
) {
    let request_id = interaction.request_id.clone();
    store.session.set_pending(interaction);
    effects.push(Effect::InteractionRequested { request_id });
}
