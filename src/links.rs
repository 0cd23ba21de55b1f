//! Canonicalizes index-page hrefs into (archive URL, original URL) pairs
//! and collects de-duplicated detail links. The archive origin is taken
//! from the index URL itself; the capture timestamp is read from its path.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::formats::DetailLink;
use crate::html::normalized_text;

/// Used when the index URL carries no recognizable capture timestamp.
const FALLBACK_TIMESTAMP: &str = "20201127204719";

/// Base path of the origin site, for resolving relative hrefs.
const ORIGIN_SITE_BASE: &str = "https://web.extension.illinois.edu/stain/";

/// Literal substring identifying a stain detail page.
const DETAIL_MARKER: &str = "staindetail.cfm";

static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/web/(\d{14})/").expect("static regex"));
static ARCHIVE_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/web/\d{14}/(.+)$").expect("static regex"));
static ARCHIVE_ABS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^/]+/web/\d{14}/(.+)$").expect("static regex"));
static SCHEME_SLASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?):/([^/])").expect("static regex"));

static SEL_ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// Derives (archive_url, original_url) from a raw anchor reference.
/// Returns `None` for empty or unusable references.
///
/// Handled shapes, in order:
/// 1. archive-relative path (`/web/<ts>/<original>`),
/// 2. absolute URL on the archive host itself,
/// 3. absolute URL on any other host (wrapped with the index timestamp),
/// 4. relative reference (resolved against the origin site's base path).
pub fn canonicalize(href: &str, index_url: &str) -> Option<(String, String)> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let ts = index_timestamp(index_url);
    let archive_origin = archive_origin(index_url)?;

    if href.starts_with("/web/") {
        let archive_url = format!("{archive_origin}{href}");
        let original_raw = ARCHIVE_PATH_RE.captures(href).map(|c| c[1].to_owned())?;
        let original_url = fix_scheme_slash(&percent_decode(&original_raw));
        return Some((archive_url, original_url));
    }

    // The archive sometimes emits "https:/host" with a single slash.
    let repaired = fix_scheme_slash(href);
    if repaired.starts_with("http://") || repaired.starts_with("https://") {
        let href_url = Url::parse(&repaired).ok()?;
        let index_host = Url::parse(index_url).ok().and_then(|u| u.host_str().map(str::to_owned));

        if href_url.host_str().map(str::to_owned) == index_host
            && let Some(captures) = ARCHIVE_ABS_RE.captures(&repaired)
        {
            let original_url = fix_scheme_slash(&percent_decode(&captures[1]));
            return Some((repaired.clone(), original_url));
        }

        let archive_url = format!("{archive_origin}/web/{ts}/{repaired}");
        return Some((archive_url, repaired));
    }

    let original_url = Url::parse(ORIGIN_SITE_BASE)
        .ok()?
        .join(href)
        .ok()?
        .to_string();
    let archive_url = format!("{archive_origin}/web/{ts}/{original_url}");
    Some((archive_url, original_url))
}

/// A reference is a detail link if the marker appears in either the raw
/// or the percent-decoded href; snapshots are inconsistent about encoding
/// the query string.
pub fn is_detail_href(href: &str) -> bool {
    if href.is_empty() {
        return false;
    }
    href.contains(DETAIL_MARKER) || percent_decode(href).contains(DETAIL_MARKER)
}

/// Scans every anchor on the index snapshot and returns de-duplicated
/// detail links in document order; the first occurrence of an original
/// URL wins.
pub fn collect_detail_links(index_html: &str, index_url: &str) -> Vec<DetailLink> {
    let doc = Html::parse_document(index_html);

    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for anchor in doc.select(&SEL_ANCHOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if !is_detail_href(href) {
            continue;
        }

        let Some((archive_url, original_url)) = canonicalize(href, index_url) else {
            continue;
        };
        if archive_url.is_empty() || original_url.is_empty() {
            continue;
        }
        if !seen.insert(original_url.clone()) {
            continue;
        }

        links.push(DetailLink {
            name: normalized_text(anchor),
            archive_url,
            original_url,
        });
    }

    tracing::debug!(count = links.len(), "collected detail links");
    links
}

fn index_timestamp(index_url: &str) -> String {
    TIMESTAMP_RE
        .captures(index_url)
        .map(|c| c[1].to_owned())
        .unwrap_or_else(|| FALLBACK_TIMESTAMP.to_owned())
}

fn archive_origin(index_url: &str) -> Option<String> {
    let url = Url::parse(index_url).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}

fn percent_decode(input: &str) -> String {
    urlencoding::decode(input)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| input.to_owned())
}

fn fix_scheme_slash(url: &str) -> String {
    SCHEME_SLASH_RE.replace(url, "$1://$2").into_owned()
}
