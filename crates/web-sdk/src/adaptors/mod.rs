//! Call conventions for the supported analytics backends.
//!
//! Each convention implements [`CallConvention`] to turn an
//! [`EventDescriptor`] into the [`BackendCall`] its page-global function
//! expects (`ga(...)` for analytics.js, `gtag(...)` for gtag.js).

pub mod ga;
pub mod gtag;

use serde::{Deserialize, Serialize};

use ga_events_core::{BackendKind, EventDescriptor};

pub use ga::LegacyCommand;
pub use gtag::TaggedEvent;

/// Payload object of a tagged event call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedParams {
    pub event_category: String,
    pub event_label: String,
    pub value: String,
}

/// One outbound call to the analytics backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "convention", rename_all = "snake_case")]
pub enum BackendCall {
    /// `ga(command, hit_type, category, action, label, value)`
    Command {
        command: String,
        hit_type: String,
        category: String,
        action: String,
        label: String,
        value: String,
    },
    /// `gtag(command, name, params)`
    Tagged {
        command: String,
        name: String,
        params: TaggedParams,
    },
}

impl BackendCall {
    /// Positional arguments, as passed to the page-global function.
    pub fn args(&self) -> Vec<serde_json::Value> {
        match self {
            BackendCall::Command {
                command,
                hit_type,
                category,
                action,
                label,
                value,
            } => vec![
                serde_json::json!(command),
                serde_json::json!(hit_type),
                serde_json::json!(category),
                serde_json::json!(action),
                serde_json::json!(label),
                serde_json::json!(value),
            ],
            BackendCall::Tagged {
                command,
                name,
                params,
            } => vec![
                serde_json::json!(command),
                serde_json::json!(name),
                serde_json::json!(params),
            ],
        }
    }

    /// Recover the descriptor content carried by this call. Tagged event
    /// names are reported as-is.
    pub fn descriptor(&self) -> EventDescriptor {
        match self {
            BackendCall::Command {
                category,
                action,
                label,
                value,
                ..
            } => EventDescriptor::new(category, action, label, value),
            BackendCall::Tagged { name, params, .. } => EventDescriptor::new(
                &params.event_category,
                name,
                &params.event_label,
                &params.value,
            ),
        }
    }
}

/// Translation from descriptors into one backend's call shape.
pub trait CallConvention {
    fn kind(&self) -> BackendKind;

    /// Build the single call that reports `descriptor`.
    fn translate(&self, descriptor: &EventDescriptor) -> BackendCall;
}

/// Resolve a configured kind into its convention.
pub fn convention_for(kind: BackendKind) -> Box<dyn CallConvention> {
    match kind {
        BackendKind::LegacyCommand => Box::new(LegacyCommand),
        BackendKind::TaggedEvent => Box::new(TaggedEvent),
    }
}
