use serde::{Deserialize, Serialize};

/// Backend-agnostic description of one trackable interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescriptor {
    /// Subject area, e.g. "Resource" or "Dataset".
    pub category: String,
    /// Interaction kind, e.g. "Download", "click", "view".
    pub action: String,
    pub label: String,
    /// Free-form payload; usually a URL or `identifier|url`.
    pub value: String,
}

impl EventDescriptor {
    pub fn new(
        category: impl Into<String>,
        action: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Which analytics call convention is active for a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// analytics.js: `ga('send', 'event', category, action, label, value)`.
    LegacyCommand,
    /// gtag.js: `gtag('event', action, {event_category, event_label, value})`.
    #[default]
    TaggedEvent,
}

impl BackendKind {
    /// Name of the page-global function the convention is invoked through.
    pub fn global_function(self) -> &'static str {
        match self {
            BackendKind::LegacyCommand => "ga",
            BackendKind::TaggedEvent => "gtag",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy_command" | "legacy" | "ga" => Ok(BackendKind::LegacyCommand),
            "tagged_event" | "tagged" | "gtag" => Ok(BackendKind::TaggedEvent),
            other => Err(format!("unknown backend kind '{other}'")),
        }
    }
}
