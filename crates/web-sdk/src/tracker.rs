//! Page tracker, the configured adapter instance. Owns the binding set and
//! the dispatcher, and attaches them to a page root once at initialization.

use std::rc::Rc;

use tracing::{debug, info};

use ga_events_core::{AppConfig, BackendKind, EventDescriptor, TrackingResult};

use crate::bindings::{Binding, BindingRegistry, CatalogOptions};
use crate::dispatcher::{BackendDispatcher, BackendHandle};
use crate::dom::{Element, InteractionRoot};

pub struct Tracker {
    config: AppConfig,
    registry: Rc<BindingRegistry>,
    dispatcher: Rc<BackendDispatcher>,
}

impl Tracker {
    /// Build the data-portal catalog for `config` and bind `handle` under
    /// the configured backend convention.
    pub fn new(config: AppConfig, handle: Rc<dyn BackendHandle>) -> TrackingResult<Self> {
        let registry = BindingRegistry::catalog(CatalogOptions::from(&config))?;
        Self::with_registry(config, registry, handle)
    }

    pub fn with_registry(
        config: AppConfig,
        registry: BindingRegistry,
        handle: Rc<dyn BackendHandle>,
    ) -> TrackingResult<Self> {
        config.validate()?;
        let dispatcher = BackendDispatcher::configure(config.backend, handle);

        info!(
            backend = ?config.backend,
            bindings = registry.len(),
            resource_prefix = %config.resource_prefix,
            "tracker configured"
        );

        Ok(Self {
            config,
            registry: Rc::new(registry),
            dispatcher: Rc::new(dispatcher),
        })
    }

    pub fn backend(&self) -> BackendKind {
        self.dispatcher.kind()
    }

    pub fn bindings(&self) -> &[Binding] {
        self.registry.bindings()
    }

    /// Install listeners under `root`. Does nothing when event tracking is
    /// switched off. Returns the number of elements bound.
    pub fn attach(&self, root: &mut dyn InteractionRoot) -> usize {
        if !self.config.track_events {
            debug!("event tracking disabled, no listeners attached");
            return 0;
        }
        let bound = self.registry.attach(root, Rc::clone(&self.dispatcher));
        info!(elements = bound, "tracker attached");
        bound
    }

    /// Run one binding against an element directly, as its listener would.
    /// Returns the dispatched descriptor, if any.
    pub fn handle_interaction(
        &self,
        binding: usize,
        element: &dyn Element,
    ) -> Option<EventDescriptor> {
        let descriptor = self.registry.bindings().get(binding)?.describe(element)?;
        self.dispatcher.dispatch(&descriptor);
        Some(descriptor)
    }
}
