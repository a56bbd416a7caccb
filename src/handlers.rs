//! Built-in handlers.

use tracing::info;

use crate::registry::{DispatchOutcome, HandlerEntry};

/// Handler that logs each activity it receives and always succeeds
pub fn logging_handler(name: impl Into<String>) -> HandlerEntry {
    let name = name.into();
    let label = name.clone();
    HandlerEntry::from_sync(name, move |payload, activity| {
        info!(
            handler = %label,
            verb = %activity.verb,
            actor = ?activity.actor_id(),
            object = ?activity.object_id(),
            payload = %payload,
            "activity received"
        );
        Ok(DispatchOutcome::ok())
    })
}
