//! Click tracking for data-portal pages: declarative bindings from page
//! elements to analytics events, and dispatch through either the
//! analytics.js command convention or the gtag.js tagged-event convention.
//!
//! # Modules
//!
//! - [`selector`] — Selector parsing and matching for bindings
//! - [`dom`] — Element/root traits and an in-memory page
//! - [`bindings`] — Binding registry and the data-portal catalog
//! - [`adaptors`] — Backend call conventions (`ga`, `gtag`)
//! - [`dispatcher`] — Fire-and-forget dispatch through an injected handle
//! - [`tracker`] — Configured adapter instance
//! - [`header`] — Page-header tag configuration

pub mod adaptors;
pub mod bindings;
pub mod dispatcher;
pub mod dom;
pub mod header;
pub mod selector;
pub mod tracker;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use adaptors::{BackendCall, CallConvention};
pub use bindings::{BindingRegistry, CatalogOptions};
pub use dispatcher::{BackendDispatcher, BackendHandle, RecordingBackend};
pub use dom::{Document, Element, InteractionRoot, PageNode};
pub use selector::Selector;
pub use tracker::Tracker;
