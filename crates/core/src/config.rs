use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{TrackingError, TrackingResult};
use crate::types::BackendKind;

/// Adapter configuration. Loaded from environment variables with the
/// prefix `GA_EVENTS__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Property / measurement id, e.g. "UA-1234-1" or "G-XXXXXXX".
    #[serde(default)]
    pub tracking_id: String,
    #[serde(default)]
    pub backend: BackendKind,
    /// Namespacing hint for resource download URLs. Accepted for
    /// compatibility with the page module options; event values are not
    /// rewritten with it.
    #[serde(default = "default_resource_prefix")]
    pub resource_prefix: String,
    #[serde(default = "default_track_events")]
    pub track_events: bool,
    /// Percent-encode URLs in event values the way `encodeURIComponent` does.
    #[serde(default)]
    pub encode_values: bool,
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub linked_domains: Vec<String>,
    #[serde(default)]
    pub enable_user_id: bool,
    /// Sent as `debug_mode` in the tag configuration.
    #[serde(default = "default_debug_mode")]
    pub debug_mode: bool,
    /// Emit GA4 `user_properties` instead of a dimension `custom_map`.
    #[serde(default)]
    pub ga4: bool,
    /// Document base URL used to resolve relative hrefs.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_resource_prefix() -> String {
    "/downloads/".to_string()
}
fn default_track_events() -> bool {
    true
}
fn default_domain() -> String {
    "auto".to_string()
}
fn default_debug_mode() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tracking_id: String::new(),
            backend: BackendKind::default(),
            resource_prefix: default_resource_prefix(),
            track_events: default_track_events(),
            encode_values: false,
            domain: default_domain(),
            fields: BTreeMap::new(),
            linked_domains: Vec::new(),
            enable_user_id: false,
            debug_mode: true,
            ga4: false,
            base_url: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an optional TOML file, overridden by
    /// environment variables.
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("GA_EVENTS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("linked_domains"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Fail fast on settings the adapter cannot run with.
    pub fn validate(&self) -> TrackingResult<()> {
        if self.tracking_id.trim().is_empty() {
            return Err(TrackingError::Config("tracking_id must not be empty".into()));
        }
        if let Some(base) = &self.base_url {
            if base.trim().is_empty() {
                return Err(TrackingError::Config(
                    "base_url must not be empty when set".into(),
                ));
            }
        }
        Ok(())
    }

    /// Linked domains with surrounding whitespace and empty entries removed.
    pub fn linked_domains(&self) -> Vec<String> {
        self.linked_domains
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect()
    }
}
