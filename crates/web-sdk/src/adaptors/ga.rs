//! analytics.js command convention: `ga('send', 'event', category, action,
//! label, value)`.

use tracing::debug;

use ga_events_core::{BackendKind, EventDescriptor};

use super::{BackendCall, CallConvention};

/// Legacy synchronous-command backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCommand;

impl CallConvention for LegacyCommand {
    fn kind(&self) -> BackendKind {
        BackendKind::LegacyCommand
    }

    fn translate(&self, descriptor: &EventDescriptor) -> BackendCall {
        debug!(
            category = %descriptor.category,
            action = %descriptor.action,
            "legacy command translated"
        );
        BackendCall::Command {
            command: "send".into(),
            hit_type: "event".into(),
            category: descriptor.category.clone(),
            action: descriptor.action.clone(),
            label: descriptor.label.clone(),
            value: descriptor.value.clone(),
        }
    }
}
