//! Mirrors the SVG files of a Wikimedia Commons media category through
//! the MediaWiki API: page through category members, resolve direct asset
//! URLs in batches, download only vector assets, skip what already exists.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::cli::IconsArgs;

const API_ENDPOINT: &str = "https://commons.wikimedia.org/w/api.php";
const USER_AGENT: &str = "LaundrySymbolsFetcher/1.0 (contact: stainscrape@example.org)";
const MAX_ATTEMPTS: u32 = 4;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SVG_MIME: &str = "image/svg+xml";
/// MediaWiki caps imageinfo queries at 50 titles per request.
const INFO_BATCH: usize = 50;

static UNSAFE_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]+"#).expect("static regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "continue", default)]
    continuation: Option<Continuation>,
    #[serde(default)]
    query: Option<QueryPayload>,
}

#[derive(Debug, Deserialize)]
struct Continuation {
    #[serde(default)]
    cmcontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryPayload {
    #[serde(default)]
    categorymembers: Vec<CategoryMember>,
    #[serde(default)]
    pages: HashMap<String, PageInfo>,
}

#[derive(Debug, Deserialize)]
struct CategoryMember {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ImageInfo {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    mime: Option<String>,
}

pub fn run(args: IconsArgs) -> anyhow::Result<()> {
    let out_dir = PathBuf::from(&args.out);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("create download dir: {}", out_dir.display()))?;

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("build http client")?;

    let pause = Duration::from_secs_f64(args.sleep.max(0.0));

    tracing::info!(category = %args.category, "listing category files");
    let mut titles = category_file_titles(&client, &args.category, pause)
        .context("list category members")?;
    if let Some(limit) = args.limit {
        titles.truncate(limit);
    }
    println!("Found {} files in the category.", titles.len());

    let mut downloaded = 0_usize;
    let mut skipped = 0_usize;

    for batch in titles.chunks(INFO_BATCH) {
        let infos = file_info(&client, batch, pause).context("resolve file info")?;

        for (title, info) in infos {
            let Some(url) = info.url else {
                tracing::warn!(%title, "no url for file; skipping");
                skipped += 1;
                continue;
            };
            if !is_svg(info.mime.as_deref(), &url) {
                tracing::debug!(%title, mime = ?info.mime, "not svg; skipping");
                skipped += 1;
                continue;
            }

            let base = title.split_once(':').map_or(title.as_str(), |(_, rest)| rest);
            let out_path = out_dir.join(safe_filename(base));
            if out_path.exists() {
                tracing::debug!(path = %out_path.display(), "already exists; keeping");
                skipped += 1;
                continue;
            }

            println!("[get] {title} -> {}", out_path.display());
            match download(&client, &url, &out_path, pause) {
                Ok(()) => downloaded += 1,
                Err(err) => tracing::error!(%title, ?err, "download failed"),
            }
        }

        thread::sleep(pause);
    }

    println!("Downloaded: {downloaded}, Skipped: {skipped}");
    println!("Saved to: {}", out_dir.display());
    Ok(())
}

/// Titles of all files (namespace 6) in the category, following the
/// API's continuation token across pages.
fn category_file_titles(
    client: &Client,
    category: &str,
    pause: Duration,
) -> anyhow::Result<Vec<String>> {
    let mut titles = Vec::new();
    let mut cmcontinue: Option<String> = None;

    loop {
        let mut params = vec![
            ("action", "query".to_owned()),
            ("list", "categorymembers".to_owned()),
            ("cmtitle", format!("Category:{category}")),
            ("cmtype", "file".to_owned()),
            ("cmlimit", "500".to_owned()),
            ("format", "json".to_owned()),
        ];
        if let Some(token) = &cmcontinue {
            params.push(("cmcontinue", token.clone()));
        }

        let response = api_get(client, &params, pause)?;
        if let Some(query) = response.query {
            titles.extend(query.categorymembers.into_iter().map(|m| m.title));
        }

        cmcontinue = response.continuation.and_then(|c| c.cmcontinue);
        if cmcontinue.is_none() {
            break;
        }
        thread::sleep(pause);
    }

    Ok(titles)
}

/// Direct asset URL and MIME type for up to [`INFO_BATCH`] file titles.
fn file_info(
    client: &Client,
    titles: &[String],
    pause: Duration,
) -> anyhow::Result<Vec<(String, ImageInfo)>> {
    let params = vec![
        ("action", "query".to_owned()),
        ("prop", "imageinfo".to_owned()),
        ("titles", titles.join("|")),
        ("iiprop", "url|size|mime".to_owned()),
        ("format", "json".to_owned()),
    ];

    let response = api_get(client, &params, pause)?;
    let mut out = Vec::new();
    if let Some(query) = response.query {
        for page in query.pages.into_values() {
            let Some(title) = page.title else {
                continue;
            };
            let info = page.imageinfo.into_iter().next().unwrap_or_default();
            out.push((title, info));
        }
    }
    Ok(out)
}

fn api_get(
    client: &Client,
    params: &[(&str, String)],
    pause: Duration,
) -> anyhow::Result<ApiResponse> {
    for attempt in 1..=MAX_ATTEMPTS {
        let result = client
            .get(API_ENDPOINT)
            .query(params)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<ApiResponse>());

        match result {
            Ok(parsed) => return Ok(parsed),
            Err(err) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(attempt, ?err, "api request failed; retrying");
                thread::sleep(pause * attempt);
            }
            Err(err) => return Err(err).context("query mediawiki api"),
        }
    }

    anyhow::bail!("query mediawiki api: retries exhausted")
}

fn download(client: &Client, url: &str, out_path: &Path, pause: Duration) -> anyhow::Result<()> {
    for attempt in 1..=MAX_ATTEMPTS {
        let result = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes());

        match result {
            Ok(bytes) => {
                fs::write(out_path, &bytes)
                    .with_context(|| format!("write asset: {}", out_path.display()))?;
                return Ok(());
            }
            Err(err) if attempt < MAX_ATTEMPTS => {
                tracing::warn!(attempt, ?err, %url, "download failed; retrying");
                thread::sleep(pause * attempt);
            }
            Err(err) => return Err(err).with_context(|| format!("download: {url}")),
        }
    }

    anyhow::bail!("download {url}: retries exhausted")
}

fn is_svg(mime: Option<&str>, url: &str) -> bool {
    mime == Some(SVG_MIME) || url.to_ascii_lowercase().ends_with(".svg")
}

/// Deterministic local filename: unsafe character runs and whitespace
/// runs both collapse to underscores.
fn safe_filename(name: &str) -> String {
    let replaced = UNSAFE_CHARS_RE.replace_all(name.trim(), "_");
    WHITESPACE_RE.replace_all(&replaced, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_filename_replaces_unsafe_runs() {
        assert_eq!(
            safe_filename("  Wash symbol: 40/60 C?.svg "),
            "Wash_symbol__40_60_C_.svg"
        );
        assert_eq!(safe_filename("plain.svg"), "plain.svg");
    }

    #[test]
    fn svg_detection_uses_mime_or_extension() {
        assert!(is_svg(Some("image/svg+xml"), "https://x/file.bin"));
        assert!(is_svg(None, "https://x/Icon.SVG"));
        assert!(!is_svg(Some("image/png"), "https://x/file.png"));
    }

    #[test]
    fn api_response_shapes_deserialize() -> anyhow::Result<()> {
        let listing = r#"{
            "continue": {"cmcontinue": "file|abc", "continue": "-||"},
            "query": {"categorymembers": [{"pageid": 1, "ns": 6, "title": "File:A.svg"}]}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(listing)?;
        let query = parsed.query.expect("query");
        assert_eq!(query.categorymembers[0].title, "File:A.svg");
        assert_eq!(
            parsed.continuation.and_then(|c| c.cmcontinue).as_deref(),
            Some("file|abc")
        );

        let info = r#"{
            "query": {"pages": {"42": {
                "title": "File:A.svg",
                "imageinfo": [{"url": "https://upload/x/A.svg", "mime": "image/svg+xml", "size": 120}]
            }}}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(info)?;
        let pages = parsed.query.expect("query").pages;
        let page = pages.get("42").expect("page");
        assert_eq!(page.imageinfo[0].mime.as_deref(), Some("image/svg+xml"));
        Ok(())
    }
}
