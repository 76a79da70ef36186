//! Page-header tag configuration: the object passed to `gtag('config', id,
//! ...)` plus the surrounding data the header snippet renders.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use ga_events_core::{AppConfig, TrackingResult};

/// The logged-in user viewing the page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Viewer {
    pub id: String,
    #[serde(default)]
    pub sysadmin: bool,
    /// Member of a public service body.
    #[serde(default)]
    pub psb: bool,
}

/// The dataset shown on the page, if any.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageRef {
    pub name: String,
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderContext {
    #[serde(default)]
    pub viewer: Option<Viewer>,
    #[serde(default)]
    pub package: Option<PackageRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Public,
    Psb,
    Admin,
    Psbadmin,
}

impl UserType {
    pub fn of(viewer: Option<&Viewer>) -> Self {
        match viewer {
            Some(v) if v.psb => UserType::Psb,
            Some(v) if v.sysadmin => UserType::Admin,
            Some(_) => UserType::Psbadmin,
            None => UserType::Public,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserType::Public => "public",
            UserType::Psb => "psb",
            UserType::Admin => "admin",
            UserType::Psbadmin => "psbadmin",
        }
    }
}

/// Build the tag configuration object for one page view.
pub fn tag_config(config: &AppConfig, ctx: &HeaderContext) -> Value {
    let mut tag = Map::new();
    tag.insert("anonymizeIp".into(), json!(true));
    tag.insert("debug_mode".into(), json!(config.debug_mode));

    if config.enable_user_id {
        if let Some(viewer) = &ctx.viewer {
            tag.insert("user_id".into(), json!(viewer.id));
        }
    }

    if let Some(package) = &ctx.package {
        if let Some(org) = &package.organization {
            tag.insert("org".into(), json!(org));
            tag.insert("dataset".into(), json!(package.name));
        }
    }

    let user_type = UserType::of(ctx.viewer.as_ref());
    if config.ga4 {
        tag.insert("user_properties".into(), json!({ "user_type": user_type.as_str() }));
    } else {
        tag.insert(
            "custom_map".into(),
            json!({
                "dimension1": "org",
                "dimension2": "dataset",
                "dimension3": "user_type",
            }),
        );
        tag.insert("user_type".into(), json!(user_type.as_str()));
    }

    Value::Object(tag)
}

/// Everything the header snippet needs to load and configure the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderData {
    pub tracking_id: String,
    pub global_function: String,
    pub ga4: bool,
    /// Serialized [`tag_config`] output.
    pub config: String,
    pub domain: String,
    pub fields: BTreeMap<String, String>,
    pub linked_domains: Vec<String>,
}

impl HeaderData {
    pub fn build(config: &AppConfig, ctx: &HeaderContext) -> TrackingResult<Self> {
        let linked_domains = config.linked_domains();
        let mut fields = config.fields.clone();
        if !linked_domains.is_empty() {
            fields.insert("allowLinker".into(), "true".into());
        }
        Ok(Self {
            tracking_id: config.tracking_id.clone(),
            global_function: config.backend.global_function().to_string(),
            ga4: config.ga4,
            config: serde_json::to_string(&tag_config(config, ctx))?,
            domain: config.domain.clone(),
            fields,
            linked_domains,
        })
    }
}
