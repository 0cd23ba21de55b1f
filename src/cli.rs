use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl an archived Stain Solutions index and export JSONL + CSV.
    Scrape(ScrapeArgs),
    /// Mirror SVG icons from a Wikimedia Commons category.
    Icons(IconsArgs),
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Archived snapshot URL of the index page, e.g.
    /// https://web.archive.org/web/20201127204719/https://web.extension.illinois.edu/stain/index.cfm
    #[arg(long)]
    pub index: String,

    /// Seconds to sleep between requests (politeness).
    #[arg(long, default_value_t = 0.6)]
    pub sleep: f64,

    /// Output filename prefix (writes <prefix>.jsonl and <prefix>.csv).
    #[arg(long, default_value = "stain_solutions")]
    pub out_prefix: String,

    /// Cap on number of detail links processed (smoke testing).
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct IconsArgs {
    /// Commons category name, without the "Category:" prefix.
    #[arg(long, default_value = "Laundry_symbols")]
    pub category: String,

    /// Output directory for downloaded SVG files.
    #[arg(long, default_value = "laundry_symbols_svgs")]
    pub out: String,

    /// Seconds to sleep between API requests.
    #[arg(long, default_value_t = 0.4)]
    pub sleep: f64,

    /// Cap on number of file titles processed (smoke testing).
    #[arg(long)]
    pub limit: Option<usize>,
}
