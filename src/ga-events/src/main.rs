//! ga-events: preview the analytics calls a data-portal page emits, and
//! render the page-header tag configuration.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use ga_events_core::{AppConfig, BackendKind};
use ga_events_web::adaptors::BackendCall;
use ga_events_web::header::{HeaderContext, HeaderData, PackageRef, Viewer};
use ga_events_web::{Document, PageNode, RecordingBackend, Tracker};

#[derive(Parser, Debug)]
#[command(name = "ga-events")]
#[command(about = "Data-portal click tracking for analytics.js and gtag.js")]
#[command(version)]
struct Cli {
    /// TOML config file (environment variables with prefix GA_EVENTS__ override it)
    #[arg(long, env = "GA_EVENTS_CONFIG")]
    config: Option<PathBuf>,

    /// Tracking id (overrides config)
    #[arg(long, env = "GA_EVENTS__TRACKING_ID")]
    tracking_id: Option<String>,

    /// Backend convention: legacy_command or tagged_event (overrides config)
    #[arg(long)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Attach the bindings to a page description and click elements by id,
    /// printing one JSON line per backend call.
    Preview {
        /// JSON page tree: {"tag": ..., "attrs": {...}, "children": [...]}
        #[arg(long)]
        page: PathBuf,

        /// `id` attribute of an element to click; repeatable
        #[arg(long = "click", required = true)]
        clicks: Vec<String>,

        /// Document base URL for resolving relative hrefs (overrides config)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Print the header data for one page view as JSON.
    Header {
        #[arg(long)]
        viewer_id: Option<String>,
        #[arg(long, default_value_t = false)]
        sysadmin: bool,
        #[arg(long, default_value_t = false)]
        psb: bool,
        /// Dataset name shown on the page
        #[arg(long)]
        package: Option<String>,
        #[arg(long, requires = "package")]
        organization: Option<String>,
    },
}

#[derive(Serialize)]
struct PreviewLine<'a> {
    target: &'a str,
    call: &'a BackendCall,
    args: Vec<serde_json::Value>,
    navigates_to: Option<&'a str>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ga_events=info,ga_events_web=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(Some(path.as_path()))
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        }),
    };

    if let Some(id) = cli.tracking_id {
        config.tracking_id = id;
    }
    if let Some(kind) = cli.backend {
        config.backend = kind;
    }

    info!(
        backend = ?config.backend,
        track_events = config.track_events,
        encode_values = config.encode_values,
        "Configuration loaded"
    );

    match cli.command {
        Command::Preview {
            page,
            clicks,
            base_url,
        } => preview(config, &page, &clicks, base_url),
        Command::Header {
            viewer_id,
            sysadmin,
            psb,
            package,
            organization,
        } => {
            let ctx = HeaderContext {
                viewer: viewer_id.map(|id| Viewer { id, sysadmin, psb }),
                package: package.map(|name| PackageRef { name, organization }),
            };
            let data = HeaderData::build(&config, &ctx)?;
            println!("{}", serde_json::to_string_pretty(&data)?);
            Ok(())
        }
    }
}

fn preview(
    mut config: AppConfig,
    page: &Path,
    clicks: &[String],
    base_url: Option<String>,
) -> anyhow::Result<()> {
    if base_url.is_some() {
        config.base_url = base_url;
    }

    let raw = std::fs::read_to_string(page)
        .with_context(|| format!("reading page {}", page.display()))?;
    let tree: PageNode = serde_json::from_str(&raw)
        .with_context(|| format!("parsing page {}", page.display()))?;
    let mut doc = Document::from_tree(tree, config.base_url.as_deref())?;

    let backend = Rc::new(RecordingBackend::new());
    let tracker = Tracker::new(config, backend.clone())?;
    let bound = tracker.attach(&mut doc);
    info!(
        backend = ?tracker.backend(),
        bindings = tracker.bindings().len(),
        elements = bound,
        "Page bindings attached"
    );

    for target in clicks {
        let node = doc
            .find_by_id(target)
            .ok_or_else(|| anyhow!("no element with id '{target}' on the page"))?;
        let outcome = doc.click(node);
        let calls = backend.take();
        if calls.is_empty() {
            info!(target = %target, "click produced no analytics call");
        }
        for call in &calls {
            let line = PreviewLine {
                target,
                call,
                args: call.args(),
                navigates_to: outcome.navigates_to.as_deref(),
            };
            println!("{}", serde_json::to_string(&line)?);
        }
    }
    Ok(())
}
