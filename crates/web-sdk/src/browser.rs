//! In-browser glue (wasm32 only): `web_sys` implementations of the page
//! traits and a backend handle that calls the page-global `ga` / `gtag`.

use std::rc::Rc;

use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use ga_events_core::{AppConfig, TrackingError, TrackingResult};

use crate::adaptors::BackendCall;
use crate::dispatcher::BackendHandle;
use crate::dom::{ClickEvent, ClickListener, Element, InteractionRoot};
use crate::selector::Selector;
use crate::tracker::Tracker;

/// A live DOM element.
pub struct DomElement(web_sys::Element);

impl Element for DomElement {
    fn tag(&self) -> String {
        self.0.tag_name().to_ascii_lowercase()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.0.get_attribute(name)
    }

    fn resolved_href(&self) -> Option<String> {
        let raw = self.0.get_attribute("href")?;
        if raw.trim().is_empty() {
            return None;
        }
        match self.0.dyn_ref::<web_sys::HtmlAnchorElement>() {
            Some(anchor) => Some(anchor.href()).filter(|href| !href.is_empty()),
            None => Some(raw),
        }
    }
}

/// Listener scope rooted at a live element, usually `document.body`.
pub struct PageRoot(web_sys::Element);

impl PageRoot {
    pub fn new(root: web_sys::Element) -> Self {
        Self(root)
    }

    pub fn body() -> Option<Self> {
        let body = web_sys::window()?.document()?.body()?;
        Some(Self(body.into()))
    }

    fn select(&self, selector: &Selector) -> Vec<web_sys::Element> {
        let mut matched: Vec<web_sys::Element> = Vec::new();
        for group in selector.groups() {
            let css = group.css();
            let list = match self.0.query_selector_all(&css) {
                Ok(list) => list,
                Err(e) => {
                    warn!(selector = %css, error = ?e, "selector rejected by the browser, group skipped");
                    continue;
                }
            };
            let hits: Vec<web_sys::Element> = (0..list.length())
                .filter_map(|i| list.get(i))
                .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
                .collect();
            let picked = match group.position() {
                Some(index) => hits.into_iter().nth(index).into_iter().collect(),
                None => hits,
            };
            for el in picked {
                if !matched.iter().any(|m| m.is_same_node(Some(&*el))) {
                    matched.push(el);
                }
            }
        }
        matched
    }
}

impl InteractionRoot for PageRoot {
    fn on_click(&mut self, selector: &Selector, listener: ClickListener) -> usize {
        let targets = self.select(selector);
        for el in &targets {
            let bound = el.clone();
            let listener = Rc::clone(&listener);
            let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
                let click = ClickEvent::default();
                listener(&DomElement(bound.clone()), &click);
                if click.default_prevented() {
                    event.prevent_default();
                }
                if click.propagation_stopped() {
                    event.stop_propagation();
                }
            }) as Box<dyn FnMut(web_sys::Event)>);

            if el
                .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
                .is_ok()
            {
                // Listeners live as long as the page.
                closure.forget();
            }
        }
        targets.len()
    }
}

/// Backend handle that invokes `window[name](...args)`.
pub struct GlobalFunction {
    name: String,
}

impl GlobalFunction {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl BackendHandle for GlobalFunction {
    fn call(&self, call: &BackendCall) -> TrackingResult<()> {
        let window = web_sys::window()
            .ok_or_else(|| TrackingError::Backend("no window".into()))?;
        let function = js_sys::Reflect::get(&window, &JsValue::from_str(&self.name))
            .ok()
            .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
            .ok_or_else(|| TrackingError::Backend(format!("{} is not loaded", self.name)))?;

        let args = js_sys::Array::new();
        for arg in call.args() {
            let value = js_sys::JSON::parse(&serde_json::to_string(&arg)?)
                .map_err(|e| TrackingError::Backend(format!("{e:?}")))?;
            args.push(&value);
        }
        function
            .apply(&JsValue::NULL, &args)
            .map_err(|e| TrackingError::Backend(format!("{} threw: {e:?}", self.name)))?;
        Ok(())
    }
}

/// Configure the tracker from a JSON config and attach it to the page body.
#[wasm_bindgen(js_name = initTracking)]
pub fn init_tracking(config_json: &str) -> Result<usize, JsValue> {
    start(config_json).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn start(config_json: &str) -> TrackingResult<usize> {
    let config: AppConfig = serde_json::from_str(config_json)?;
    let handle = Rc::new(GlobalFunction::new(config.backend.global_function()));
    let tracker = Tracker::new(config, handle)?;
    let mut root = PageRoot::body().ok_or_else(|| TrackingError::Config("page has no body".into()))?;
    Ok(tracker.attach(&mut root))
}
