use std::fs;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use predicates::prelude::*;
use stainscrape::formats::StainRecord;

const INDEX_HTML: &str = r#"<!doctype html>
<html>
  <body>
    <div id="container"><div id="content">
      <h1>Stain Solutions</h1>
      <ul>
        <li><a href="staindetail.cfm?ID=7">Red Wine</a></li>
        <li><a href="https://web.extension.illinois.edu/stain/staindetail.cfm?ID=7">Red Wine (duplicate)</a></li>
        <li><a href="staindetail.cfm?ID=8">Coffee</a></li>
        <li><a href="staindetail.cfm?ID=9">Mystery</a></li>
        <li><a href="about.cfm">About</a></li>
      </ul>
    </div></div>
  </body>
</html>
"#;

const RED_WINE_HTML: &str = r#"<!doctype html>
<html>
  <body>
    <div id="wm-ipp-base">archive toolbar</div>
    <div id="container"><div id="content">
      <h1>Red Wine</h1>
      <p>Act fast.</p>
      <p>Caution: never apply heat.</p>
      <h2>Fresh Stain</h2>
      <h3>What You Will Need</h3>
      <ul><li>Cold water</li><li>Salt</li></ul>
      <h3>Steps to Clean</h3>
      <ol><li>Blot.</li><li>Rinse.</li></ol>
      <h4>Or</h4>
      <h3>Steps to Clean</h3>
      <ol><li>Cover with salt.</li><li>Brush away.</li></ol>
    </div></div>
  </body>
</html>
"#;

// A page the parser cannot structure (no title at all).
const MYSTERY_HTML: &str = r#"<!doctype html>
<html><body><div id="content"><p>Nothing useful here.</p></div></body></html>
"#;

fn spawn_archive_server() -> (String, mpsc::Sender<()>, thread::JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let addr = server.server_addr();
    let base_url = format!("http://{addr}");

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let url = request.url().to_string();
            let (status, body) = if url.contains("index.cfm") {
                (200, INDEX_HTML)
            } else if url.contains("ID=7") {
                (200, RED_WINE_HTML)
            } else if url.contains("ID=9") {
                (200, MYSTERY_HTML)
            } else if url.contains("empty.cfm") {
                (200, "<html><body><a href=\"about.cfm\">About</a></body></html>")
            } else {
                // ID=8 and everything else is gone from the archive.
                (404, "not found")
            };

            let response = tiny_http::Response::from_string(body).with_status_code(status);
            let _ = request.respond(response);
        }
    });

    (base_url, shutdown_tx, handle)
}

fn archived(base_url: &str, page: &str) -> String {
    format!("{base_url}/web/20201127204719/https://web.extension.illinois.edu/stain/{page}")
}

#[test]
fn scrape_exports_jsonl_and_csv() -> anyhow::Result<()> {
    let (base_url, shutdown_tx, server_handle) = spawn_archive_server();
    let temp = tempfile::TempDir::new()?;
    let out_prefix = temp.path().join("stain_solutions");
    let out_prefix_str = out_prefix.to_str().expect("utf-8 temp path");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stainscrape");
    cmd.args([
        "scrape",
        "--index",
        &archived(&base_url, "index.cfm"),
        "--sleep",
        "0",
        "--out-prefix",
        out_prefix_str,
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Collected 3 detail links from index."))
    .stdout(predicate::str::contains("[OK]  1/3 Red Wine -> 2 row(s)"))
    .stdout(predicate::str::contains("[MISS] 2/3"))
    .stdout(predicate::str::contains("(no structured content)"))
    .stdout(predicate::str::contains("Done. Parsed 1 stains with content."));

    // JSONL: exactly one record, with the Or-split preserved.
    let jsonl = fs::read_to_string(format!("{out_prefix_str}.jsonl"))?;
    let records: Vec<StainRecord> = jsonl
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("parse jsonl record"))
        .collect();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.title, "Red Wine");
    assert_eq!(record.intro_notes, vec!["Act fast."]);
    assert_eq!(record.cautions, vec!["Caution: never apply heat."]);
    assert_eq!(record.sections.len(), 1);
    assert_eq!(record.sections[0].methods.len(), 2);
    assert_eq!(record.sections[0].methods[0].materials, vec!["Cold water", "Salt"]);
    assert_eq!(
        record.sections[0].methods[1].steps,
        vec!["Cover with salt.", "Brush away."]
    );
    assert_eq!(
        record.source_original_url,
        "https://web.extension.illinois.edu/stain/staindetail.cfm?ID=7"
    );
    assert!(record.source_archive_url.starts_with(&base_url));

    // CSV: header plus one row per method.
    let csv_text = fs::read_to_string(format!("{out_prefix_str}.csv"))?;
    let lines: Vec<&str> = csv_text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "row_id,stain_title,section,method_index,materials,steps,method_notes,method_cautions,\
         intro_notes,top_cautions,source_archive_url,source_original_url,extra"
    );
    assert!(lines[1].starts_with("1-1,Red Wine,Fresh Stain,1,"));
    assert!(lines[2].starts_with("1-2,Red Wine,Fresh Stain,2,"));
    assert!(lines[1].contains("Cold water ; Salt"));
    assert!(lines[2].contains("Cover with salt. || Brush away."));

    let _ = shutdown_tx.send(());
    let _ = server_handle.join();
    Ok(())
}

#[test]
fn limit_caps_processed_links() -> anyhow::Result<()> {
    let (base_url, shutdown_tx, server_handle) = spawn_archive_server();
    let temp = tempfile::TempDir::new()?;
    let out_prefix = temp.path().join("limited");
    let out_prefix_str = out_prefix.to_str().expect("utf-8 temp path");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stainscrape");
    cmd.args([
        "scrape",
        "--index",
        &archived(&base_url, "index.cfm"),
        "--sleep",
        "0",
        "--out-prefix",
        out_prefix_str,
        "--limit",
        "1",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("[OK]  1/1 Red Wine"))
    .stdout(predicate::str::contains("Done. Parsed 1 stains with content."));

    let _ = shutdown_tx.send(());
    let _ = server_handle.join();
    Ok(())
}

#[test]
fn unfetchable_index_is_fatal() {
    let (base_url, shutdown_tx, server_handle) = spawn_archive_server();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stainscrape");
    cmd.args([
        "scrape",
        "--index",
        &archived(&base_url, "missing.cfm"),
        "--sleep",
        "0",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("could not fetch index"));

    let _ = shutdown_tx.send(());
    let _ = server_handle.join();
}

#[test]
fn index_without_detail_links_is_fatal() {
    let (base_url, shutdown_tx, server_handle) = spawn_archive_server();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("stainscrape");
    cmd.args([
        "scrape",
        "--index",
        &archived(&base_url, "empty.cfm"),
        "--sleep",
        "0",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("no detail links found"));

    let _ = shutdown_tx.send(());
    let _ = server_handle.join();
}
