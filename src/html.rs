//! Generic tree-search helpers over a parsed HTML document. No knowledge
//! of the stain-record schema lives here.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Id prefix of elements injected by the archive's replay tooling.
const ARCHIVE_CHROME_PREFIX: &str = "wm-";

static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "#container #content",
        "#content",
        "main",
        "[role=main]",
        "article",
        "div.container",
    ]
    .iter()
    .map(|css| Selector::parse(css).expect("static selector"))
    .collect()
});

static SEL_H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("static selector"));
static SEL_BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));

/// Text of a node with all whitespace runs (including newlines) collapsed
/// to single spaces and trimmed. Downstream prefix checks rely on this.
pub fn normalized_text(el: ElementRef<'_>) -> String {
    let joined = el.text().collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized text of the direct (non-recursive) `<li>` children of a list.
pub fn list_items(list: ElementRef<'_>) -> Vec<String> {
    list.child_elements()
        .filter(|el| el.value().name() == "li")
        .map(normalized_text)
        .collect()
}

/// Walks forward through the sibling chain from `start`, collecting element
/// nodes, stopping (exclusive) at the first element whose tag is in
/// `boundary`. Archival replay chrome is skipped without ending the scan;
/// text and comment siblings are ignored.
pub fn sibling_blocks_until<'a>(start: ElementRef<'a>, boundary: &[&str]) -> Vec<ElementRef<'a>> {
    let mut out = Vec::new();
    for node in start.next_siblings() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if boundary.contains(&el.value().name()) {
            break;
        }
        if is_archive_chrome(el) {
            continue;
        }
        out.push(el);
    }
    out
}

fn is_archive_chrome(el: ElementRef<'_>) -> bool {
    el.value()
        .attr("id")
        .is_some_and(|id| id.starts_with(ARCHIVE_CHROME_PREFIX))
}

/// Locates the subtree holding the genuine article content. Archived
/// snapshots vary in which wrapper markup survived capture, so this tries
/// the original site's `#container > #content` first, then common wrapper
/// patterns, then the parent `<div>` of the first `<h1>`, then `<body>`,
/// then the whole document.
pub fn find_content_container(doc: &Html) -> ElementRef<'_> {
    for selector in CONTAINER_SELECTORS.iter() {
        if let Some(el) = doc.select(selector).next() {
            return el;
        }
    }

    if let Some(h1) = doc.select(&SEL_H1).next() {
        let mut node = h1.parent();
        while let Some(n) = node {
            if let Some(el) = ElementRef::wrap(n)
                && el.value().name() == "div"
            {
                return el;
            }
            node = n.parent();
        }
    }

    doc.select(&SEL_BODY)
        .next()
        .unwrap_or_else(|| doc.root_element())
}
