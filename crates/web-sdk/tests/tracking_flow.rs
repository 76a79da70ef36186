//! Integration test for the full click → descriptor → backend call flow on a
//! data-portal page, under both backend conventions.

use std::rc::Rc;

use ga_events_core::{AppConfig, BackendKind, EventDescriptor};
use ga_events_web::adaptors::{BackendCall, TaggedParams};
use ga_events_web::{Document, PageNode, RecordingBackend, Tracker};

/// A dataset page: one search-result item, a resource list with a
/// download button and resource text links.
fn dataset_page() -> PageNode {
    PageNode::new("body")
        .child(
            PageNode::new("ul").attr("class", "dataset-list").child(
                PageNode::new("li").attr("class", "dataset-item").child(
                    PageNode::new("h3").attr("class", "dataset-heading").child(
                        PageNode::new("a")
                            .attr("id", "dataset-link")
                            .attr("href", "/dataset/foo")
                            .child(PageNode::new("span").attr("id", "dataset-title")),
                    ),
                ),
            ),
        )
        .child(
            PageNode::new("ul").attr("class", "resource-list").child(
                PageNode::new("li")
                    .attr("class", "resource-item")
                    .child(
                        PageNode::new("a")
                            .attr("id", "download")
                            .attr("class", "resource-url-analytics")
                            .attr("href", "https://example.org/data.csv")
                            .attr("resource_id", "42"),
                    )
                    .child(
                        PageNode::new("a")
                            .attr("id", "button-download")
                            .attr("class", "btn btn-primary btn-download")
                            .attr("href", "https://example.org/other.csv"),
                    )
                    .child(
                        PageNode::new("p")
                            .attr("class", "dataset-resource-text")
                            .child(PageNode::new("a").attr("id", "text-0").attr("href", "/dataset/foo/resource/1"))
                            .child(PageNode::new("a").attr("id", "text-1").attr("href", "/dataset/foo/resource/1/view")),
                    ),
            ),
        )
        .child(
            PageNode::new("p")
                .attr("class", "dataset-resource-text")
                .child(PageNode::new("a").attr("id", "empty-0").attr("href", "/x"))
                .child(PageNode::new("a").attr("id", "empty-1").attr("href", "")),
        )
}

fn tracked_page(backend: BackendKind, page: PageNode) -> (Document, Rc<RecordingBackend>) {
    let config = AppConfig {
        tracking_id: "UA-1234-1".into(),
        backend,
        ..AppConfig::default()
    };
    let recorder = Rc::new(RecordingBackend::new());
    let tracker = Tracker::new(config, recorder.clone()).unwrap();
    let mut doc = Document::from_tree(page, None).unwrap();
    tracker.attach(&mut doc);
    (doc, recorder)
}

fn click(doc: &Document, id: &str) {
    let outcome = doc.click(doc.find_by_id(id).unwrap());
    assert!(!outcome.default_prevented, "tracking must not cancel the click on {id}");
}

#[test]
fn test_download_scenario_legacy() {
    let (doc, recorder) = tracked_page(BackendKind::LegacyCommand, dataset_page());
    click(&doc, "download");

    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    let args: Vec<String> = calls[0]
        .args()
        .into_iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        args,
        vec![
            "send",
            "event",
            "Resource",
            "Download",
            "Download",
            "42|https://example.org/data.csv",
        ]
    );
}

#[test]
fn test_download_scenario_tagged() {
    let (doc, recorder) = tracked_page(BackendKind::TaggedEvent, dataset_page());
    click(&doc, "download");

    assert_eq!(
        recorder.calls(),
        vec![BackendCall::Tagged {
            command: "event".into(),
            name: "file_download".into(),
            params: TaggedParams {
                event_category: "Resource".into(),
                event_label: "Download".into(),
                value: "42|https://example.org/data.csv".into(),
            },
        }]
    );
}

#[test]
fn test_btn_download_without_identifier() {
    let (doc, recorder) = tracked_page(BackendKind::TaggedEvent, dataset_page());
    click(&doc, "button-download");

    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].descriptor().value, "https://example.org/other.csv");
}

#[test]
fn test_dataset_heading_click_from_nested_span() {
    let (doc, recorder) = tracked_page(BackendKind::LegacyCommand, dataset_page());
    click(&doc, "dataset-title");

    assert_eq!(
        recorder.calls().iter().map(BackendCall::descriptor).collect::<Vec<_>>(),
        vec![EventDescriptor::new("Dataset", "click", "CKAN_Dataset_view", "/dataset/foo")]
    );
}

#[test]
fn test_resource_text_second_anchor_only() {
    let (doc, recorder) = tracked_page(BackendKind::TaggedEvent, dataset_page());
    click(&doc, "text-0");
    assert!(recorder.is_empty());

    click(&doc, "text-1");
    let calls = recorder.take();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].descriptor(),
        EventDescriptor::new("Resource", "view", "CKAN_Resource_view", "/dataset/foo/resource/1/view")
    );

    // Only the second anchor of the whole matched set is bound.
    click(&doc, "empty-1");
    assert!(recorder.is_empty());
}

#[test]
fn test_empty_href_on_bound_anchor_makes_no_call() {
    let page = PageNode::new("body").child(
        PageNode::new("div")
            .attr("class", "dataset-resource-text")
            .child(PageNode::new("a").attr("id", "a0").attr("href", "/r/0"))
            .child(PageNode::new("a").attr("id", "a1").attr("href", "")),
    );
    let (doc, recorder) = tracked_page(BackendKind::LegacyCommand, page);

    let outcome = doc.click(doc.find_by_id("a1").unwrap());
    assert_eq!(outcome.listeners_run, 1);
    assert!(recorder.is_empty());
}

#[test]
fn test_switching_backend_keeps_content() {
    for id in ["download", "button-download", "dataset-link", "text-1"] {
        let (legacy_doc, legacy) = tracked_page(BackendKind::LegacyCommand, dataset_page());
        let (tagged_doc, tagged) = tracked_page(BackendKind::TaggedEvent, dataset_page());
        click(&legacy_doc, id);
        click(&tagged_doc, id);

        let legacy_calls = legacy.calls();
        let tagged_calls = tagged.calls();
        assert_eq!(legacy_calls.len(), 1, "{id}");
        assert_eq!(tagged_calls.len(), 1, "{id}");

        let legacy_desc = legacy_calls[0].descriptor();
        let tagged_desc = tagged_calls[0].descriptor();
        assert_eq!(legacy_desc.category, tagged_desc.category);
        assert_eq!(legacy_desc.label, tagged_desc.label);
        assert_eq!(legacy_desc.value, tagged_desc.value);
    }
}

#[test]
fn test_relative_hrefs_resolve_against_base() {
    let config = AppConfig {
        tracking_id: "G-TEST12345".into(),
        base_url: Some("https://data.example.org/".into()),
        ..AppConfig::default()
    };
    let recorder = Rc::new(RecordingBackend::new());
    let tracker = Tracker::new(config.clone(), recorder.clone()).unwrap();
    let mut doc = Document::from_tree(dataset_page(), config.base_url.as_deref()).unwrap();
    tracker.attach(&mut doc);

    click(&doc, "dataset-link");
    assert_eq!(
        recorder.calls()[0].descriptor().value,
        "https://data.example.org/dataset/foo"
    );
}
