//! Read-only view of the page the adapter observes.
//!
//! [`Element`] is what descriptor factories see; [`InteractionRoot`] is the
//! scope listeners are installed under. [`Document`] is an in-memory page
//! used outside the browser (previews, tests); the wasm32 build provides
//! `web_sys` implementations in the `browser` module.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use url::Url;

use ga_events_core::{TrackingError, TrackingResult};

use crate::selector::Selector;

/// Observable state of a page element at interaction time.
pub trait Element {
    /// Lowercase tag name.
    fn tag(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// The link target as the browser resolves it, or `None` when the
    /// element has no usable `href`.
    fn resolved_href(&self) -> Option<String>;
}

/// The click as seen by a listener. Listeners may cancel it; tracking
/// listeners never do.
#[derive(Debug, Default)]
pub struct ClickEvent {
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl ClickEvent {
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

/// Listener invoked with the element it was bound to.
pub type ClickListener = Rc<dyn Fn(&dyn Element, &ClickEvent)>;

/// A scope that click listeners can be installed under.
pub trait InteractionRoot {
    /// Bind `listener` to every element under this root that currently
    /// matches `selector`. Returns the number of elements bound.
    fn on_click(&mut self, selector: &Selector, listener: ClickListener) -> usize;
}

/// Serializable page description, used to build a [`Document`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageNode {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<PageNode>,
}

impl PageNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, child: PageNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Index of a node in a [`Document`]; ids follow document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

struct NodeData {
    tag: String,
    attrs: BTreeMap<String, String>,
    parent: Option<NodeId>,
}

/// Result of a simulated click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickOutcome {
    pub listeners_run: usize,
    pub default_prevented: bool,
    /// Where the browser would navigate: the nearest anchor's resolved
    /// href, unless a listener cancelled the click.
    pub navigates_to: Option<String>,
}

/// Immutable in-memory page with bound click listeners.
pub struct Document {
    nodes: Vec<NodeData>,
    base_url: Option<Url>,
    listeners: Vec<(NodeId, ClickListener)>,
}

impl Document {
    pub fn from_tree(root: PageNode, base_url: Option<&str>) -> TrackingResult<Self> {
        let base_url = base_url
            .map(|base| {
                Url::parse(base)
                    .map_err(|e| TrackingError::Config(format!("invalid base_url '{base}': {e}")))
            })
            .transpose()?;
        let mut doc = Self {
            nodes: Vec::new(),
            base_url,
            listeners: Vec::new(),
        };
        doc.push_node(root, None);
        Ok(doc)
    }

    fn push_node(&mut self, node: PageNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            tag: node.tag.to_ascii_lowercase(),
            attrs: node.attrs,
            parent,
        });
        for child in node.children {
            self.push_node(child, Some(id));
        }
        id
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { doc: self, id }
    }

    /// First node whose `id` attribute equals `html_id`.
    pub fn find_by_id(&self, html_id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.attrs.get("id").map(String::as_str) == Some(html_id))
            .map(NodeId)
    }

    /// Node ids matching `selector`, in document order, without duplicates.
    /// `:eq(n)` picks the n-th element of its group's matched set.
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        let mut matched = Vec::new();
        for group in selector.groups() {
            let hits: Vec<NodeId> = (0..self.nodes.len())
                .map(NodeId)
                .filter(|&id| {
                    let chain = self.ancestry(id);
                    let refs: Vec<&dyn Element> = chain.iter().map(|n| n as &dyn Element).collect();
                    group.matches_chain(&refs)
                })
                .collect();
            match group.position() {
                Some(index) => matched.extend(hits.get(index).copied()),
                None => matched.extend(hits),
            }
        }
        matched.sort();
        matched.dedup();
        matched
    }

    /// The node followed by its ancestors, nearest first.
    fn ancestry(&self, id: NodeId) -> Vec<NodeRef<'_>> {
        let mut chain = vec![self.node(id)];
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            chain.push(self.node(parent));
            current = self.nodes[parent.0].parent;
        }
        chain
    }

    /// Deliver a click to `target`, bubbling through its ancestors.
    pub fn click(&self, target: NodeId) -> ClickOutcome {
        let event = ClickEvent::default();
        let mut listeners_run = 0;
        for node in self.ancestry(target) {
            for (_, listener) in self.listeners.iter().filter(|(bound, _)| *bound == node.id) {
                listener(&node, &event);
                listeners_run += 1;
            }
            if event.propagation_stopped() {
                break;
            }
        }

        let navigates_to = if event.default_prevented() {
            None
        } else {
            self.ancestry(target)
                .into_iter()
                .find(|n| n.tag() == "a")
                .and_then(|n| n.resolved_href())
        };

        ClickOutcome {
            listeners_run,
            default_prevented: event.default_prevented(),
            navigates_to,
        }
    }
}

impl InteractionRoot for Document {
    fn on_click(&mut self, selector: &Selector, listener: ClickListener) -> usize {
        let targets = self.select(selector);
        for &id in &targets {
            self.listeners.push((id, Rc::clone(&listener)));
        }
        targets.len()
    }
}

/// Borrowed handle to one node of a [`Document`].
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl NodeRef<'_> {
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl Element for NodeRef<'_> {
    fn tag(&self) -> String {
        self.doc.nodes[self.id.0].tag.clone()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.doc.nodes[self.id.0].attrs.get(name).cloned()
    }

    fn resolved_href(&self) -> Option<String> {
        let href = self.attribute("href")?;
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        match &self.doc.base_url {
            Some(base) => base.join(href).ok().map(String::from),
            None => Some(href.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn page() -> PageNode {
        PageNode::new("body")
            .child(
                PageNode::new("div").attr("class", "dataset-resource-text").child(
                    PageNode::new("a").attr("id", "first").attr("href", "/one"),
                ),
            )
            .child(
                PageNode::new("div")
                    .attr("class", "dataset-resource-text")
                    .child(PageNode::new("a").attr("id", "second").attr("href", "/two"))
                    .child(
                        PageNode::new("a")
                            .attr("id", "third")
                            .attr("href", "/three")
                            .child(PageNode::new("span").attr("id", "inner")),
                    ),
            )
    }

    #[test]
    fn test_select_document_order_and_eq() {
        let doc = Document::from_tree(page(), None).unwrap();
        let all = doc.select(&Selector::parse(".dataset-resource-text a").unwrap());
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], doc.find_by_id("first").unwrap());

        let eq = doc.select(&Selector::parse(".dataset-resource-text a:eq(1)").unwrap());
        assert_eq!(eq, vec![doc.find_by_id("second").unwrap()]);

        let out_of_range = doc.select(&Selector::parse("a:eq(9)").unwrap());
        assert!(out_of_range.is_empty());
    }

    #[test]
    fn test_select_groups_deduplicated() {
        let doc = Document::from_tree(page(), None).unwrap();
        let sel = Selector::parse("a#second, .dataset-resource-text a, a#second").unwrap();
        assert_eq!(doc.select(&sel).len(), 3);
    }

    #[test]
    fn test_resolved_href() {
        let doc = Document::from_tree(
            PageNode::new("body")
                .child(PageNode::new("a").attr("id", "rel").attr("href", "/dataset/foo"))
                .child(PageNode::new("a").attr("id", "empty").attr("href", "  "))
                .child(PageNode::new("a").attr("id", "none")),
            Some("https://data.example.org/catalog/"),
        )
        .unwrap();
        let href = |id: &str| doc.node(doc.find_by_id(id).unwrap()).resolved_href();
        assert_eq!(href("rel").as_deref(), Some("https://data.example.org/dataset/foo"));
        assert_eq!(href("empty"), None);
        assert_eq!(href("none"), None);
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(Document::from_tree(PageNode::new("body"), Some("not a url")).is_err());
    }

    #[test]
    fn test_click_bubbles_to_bound_anchor() {
        let mut doc = Document::from_tree(page(), None).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let bound = doc.on_click(
            &Selector::parse("a#third").unwrap(),
            Rc::new(move |el: &dyn Element, _: &ClickEvent| {
                sink.borrow_mut().push(el.attribute("id"))
            }),
        );
        assert_eq!(bound, 1);

        let outcome = doc.click(doc.find_by_id("inner").unwrap());
        assert_eq!(outcome.listeners_run, 1);
        assert!(!outcome.default_prevented);
        assert_eq!(outcome.navigates_to.as_deref(), Some("/three"));
        assert_eq!(*seen.borrow(), vec![Some("third".to_string())]);
    }

    #[test]
    fn test_stop_propagation_skips_ancestors() {
        let mut doc = Document::from_tree(page(), None).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        doc.on_click(
            &Selector::parse(".dataset-resource-text").unwrap(),
            Rc::new(move |_: &dyn Element, _: &ClickEvent| sink.borrow_mut().push("container")),
        );
        let sink = Rc::clone(&seen);
        doc.on_click(
            &Selector::parse("a#third").unwrap(),
            Rc::new(move |_: &dyn Element, event: &ClickEvent| {
                sink.borrow_mut().push("anchor");
                event.stop_propagation();
            }),
        );

        let outcome = doc.click(doc.find_by_id("inner").unwrap());
        assert_eq!(outcome.listeners_run, 1);
        assert_eq!(*seen.borrow(), vec!["anchor"]);
        assert_eq!(outcome.navigates_to.as_deref(), Some("/three"));

        seen.borrow_mut().clear();
        let outcome = doc.click(doc.find_by_id("second").unwrap());
        assert_eq!(outcome.listeners_run, 1);
        assert_eq!(*seen.borrow(), vec!["container"]);
    }

    #[test]
    fn test_prevent_default_blocks_navigation() {
        let mut doc = Document::from_tree(page(), None).unwrap();
        doc.on_click(
            &Selector::parse("a#first").unwrap(),
            Rc::new(|_: &dyn Element, event: &ClickEvent| event.prevent_default()),
        );
        let outcome = doc.click(doc.find_by_id("first").unwrap());
        assert!(outcome.default_prevented);
        assert_eq!(outcome.navigates_to, None);
    }
}
