//! gtag.js tagged-event convention: `gtag('event', name, {event_category,
//! event_label, value})`.

use tracing::debug;

use ga_events_core::{BackendKind, EventDescriptor};

use super::{BackendCall, CallConvention, TaggedParams};

/// Tag-based backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedEvent;

impl TaggedEvent {
    /// Map an action onto gtag's recommended event name. Actions without
    /// a recommended name pass through unchanged.
    fn event_name(action: &str) -> &str {
        match action {
            "Download" => "file_download",
            other => other,
        }
    }
}

impl CallConvention for TaggedEvent {
    fn kind(&self) -> BackendKind {
        BackendKind::TaggedEvent
    }

    fn translate(&self, descriptor: &EventDescriptor) -> BackendCall {
        let name = Self::event_name(&descriptor.action);
        debug!(
            event_name = name,
            category = %descriptor.category,
            "tagged event translated"
        );
        BackendCall::Tagged {
            command: "event".into(),
            name: name.to_string(),
            params: TaggedParams {
                event_category: descriptor.category.clone(),
                event_label: descriptor.label.clone(),
                value: descriptor.value.clone(),
            },
        }
    }
}
