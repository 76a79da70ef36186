//! Binding registry: which page elements produce which analytics events.

use std::rc::Rc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, info};

use ga_events_core::{AppConfig, EventDescriptor, TrackingResult};

use crate::dispatcher::BackendDispatcher;
use crate::dom::{ClickEvent, ClickListener, Element, InteractionRoot};
use crate::selector::Selector;

pub const DOWNLOAD_SELECTOR: &str = "a.resource-url-analytics, a.btn-download";
pub const DATASET_HEADING_SELECTOR: &str = ".dataset-heading a";
pub const RESOURCE_TEXT_SELECTOR: &str = ".dataset-resource-text a:eq(1)";

/// Attribute carrying the resource identifier on download links.
pub const RESOURCE_ID_ATTR: &str = "resource_id";

/// Characters `encodeURIComponent` escapes: everything except
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Builds a descriptor from a matched element, or `None` to skip dispatch.
pub type EventFactory = Box<dyn Fn(&dyn Element) -> Option<EventDescriptor>>;

pub struct Binding {
    selector: Selector,
    factory: EventFactory,
}

impl Binding {
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn describe(&self, element: &dyn Element) -> Option<EventDescriptor> {
        (self.factory)(element)
    }
}

/// Options that shape the catalog's descriptor values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Percent-encode the URL part of values like `encodeURIComponent`.
    pub encode_values: bool,
}

impl From<&AppConfig> for CatalogOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            encode_values: config.encode_values,
        }
    }
}

#[derive(Default)]
pub struct BindingRegistry {
    bindings: Vec<Binding>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a binding. A malformed selector is rejected here.
    pub fn register<F>(&mut self, selector: &str, factory: F) -> TrackingResult<()>
    where
        F: Fn(&dyn Element) -> Option<EventDescriptor> + 'static,
    {
        let selector = Selector::parse(selector)?;
        debug!(selector = %selector, "binding registered");
        self.bindings.push(Binding {
            selector,
            factory: Box::new(factory),
        });
        Ok(())
    }

    /// The data-portal bindings: resource downloads, dataset heading links
    /// and resource view links.
    pub fn catalog(options: CatalogOptions) -> TrackingResult<Self> {
        let mut registry = Self::new();

        registry.register(DOWNLOAD_SELECTOR, move |el| {
            let url = link_url(el, options)?;
            let value = match el.attribute(RESOURCE_ID_ATTR) {
                Some(id) => format!("{id}|{url}"),
                None => url,
            };
            Some(EventDescriptor::new("Resource", "Download", "Download", value))
        })?;

        registry.register(DATASET_HEADING_SELECTOR, move |el| {
            let url = link_url(el, options)?;
            Some(EventDescriptor::new("Dataset", "click", "CKAN_Dataset_view", url))
        })?;

        registry.register(RESOURCE_TEXT_SELECTOR, move |el| {
            let url = link_url(el, options)?;
            Some(EventDescriptor::new("Resource", "view", "CKAN_Resource_view", url))
        })?;

        Ok(registry)
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Install one click listener per binding under `root`. Each listener
    /// builds a descriptor from the clicked element and hands any result
    /// to `dispatcher`. Returns the number of elements bound.
    pub fn attach(
        self: &Rc<Self>,
        root: &mut dyn InteractionRoot,
        dispatcher: Rc<BackendDispatcher>,
    ) -> usize {
        let mut bound = 0;
        for index in 0..self.bindings.len() {
            let registry = Rc::clone(self);
            let dispatcher = Rc::clone(&dispatcher);
            let listener: ClickListener = Rc::new(move |el: &dyn Element, _event: &ClickEvent| {
                let binding = &registry.bindings[index];
                match binding.describe(el) {
                    Some(descriptor) => {
                        dispatcher.dispatch(&descriptor);
                    }
                    None => debug!(selector = %binding.selector, "no link target, event skipped"),
                }
            });
            let count = root.on_click(&self.bindings[index].selector, listener);
            info!(selector = %self.bindings[index].selector, elements = count, "binding attached");
            bound += count;
        }
        bound
    }
}

/// The element's resolved link, optionally encoded. `None` when there is
/// nothing to report.
fn link_url(el: &dyn Element, options: CatalogOptions) -> Option<String> {
    let url = el.resolved_href()?;
    if options.encode_values {
        Some(encode_uri_component(&url))
    } else {
        Some(url)
    }
}

/// Percent-encode `input` the way `encodeURIComponent` does.
pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}
