//! Batch orchestrator: index fetch, link collection, then a fully
//! sequential fetch/parse/export loop with fixed inter-request pacing.
//! Output files are written incrementally so a mid-run failure keeps
//! everything already exported.

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::thread;
use std::time::Duration;

use anyhow::Context as _;

use crate::cli::ScrapeArgs;
use crate::export::{CSV_COLUMNS, flatten, minimal_row};
use crate::links::collect_detail_links;
use crate::net::Fetcher;
use crate::parse::parse_detail_page;

pub fn run(args: ScrapeArgs) -> anyhow::Result<()> {
    let fetcher = Fetcher::new().context("build fetch client")?;

    let index_html = fetcher
        .fetch(&args.index)
        .ok_or_else(|| anyhow::anyhow!("could not fetch index: {}", args.index))?;

    let mut detail_links = collect_detail_links(&index_html, &args.index);
    if detail_links.is_empty() {
        anyhow::bail!("no detail links found on the index page");
    }
    println!("Collected {} detail links from index.", detail_links.len());

    if let Some(limit) = args.limit {
        detail_links.truncate(limit);
    }
    let total = detail_links.len();

    let jsonl_path = format!("{}.jsonl", args.out_prefix);
    let csv_path = format!("{}.csv", args.out_prefix);

    let jsonl_file =
        File::create(&jsonl_path).with_context(|| format!("create output: {jsonl_path}"))?;
    let mut jsonl = BufWriter::new(jsonl_file);

    let csv_file =
        File::create(&csv_path).with_context(|| format!("create output: {csv_path}"))?;
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(csv_file);
    csv_writer
        .write_record(CSV_COLUMNS)
        .context("write csv header")?;

    let pause = Duration::from_secs_f64(args.sleep.max(0.0));
    let mut total_ok = 0_usize;

    for (i, link) in detail_links.iter().enumerate() {
        let seq = i + 1;

        let Some(html) = fetcher.fetch(&link.archive_url) else {
            println!("[MISS] {seq}/{total} {}", link.original_url);
            thread::sleep(pause);
            continue;
        };

        let Some(record) = parse_detail_page(&html, &link.archive_url, &link.original_url)
        else {
            println!(
                "[SKIP] {seq}/{total} {} (no structured content)",
                link.original_url
            );
            thread::sleep(pause);
            continue;
        };

        serde_json::to_writer(&mut jsonl, &record).context("write jsonl record")?;
        jsonl.write_all(b"\n").context("write jsonl newline")?;
        jsonl.flush().context("flush jsonl")?;

        let mut rows = flatten(&record, seq);
        if rows.is_empty() {
            rows.push(minimal_row(&record, seq));
        }
        for row in &rows {
            csv_writer.serialize(row).context("write csv row")?;
        }
        csv_writer.flush().context("flush csv")?;

        total_ok += 1;
        println!("[OK]  {seq}/{total} {} -> {} row(s)", record.title, rows.len());
        thread::sleep(pause);
    }

    println!("Done. Parsed {total_ok} stains with content.");
    println!("Wrote: {jsonl_path} and {csv_path}");
    Ok(())
}
