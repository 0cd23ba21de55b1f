use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    stainscrape::logging::init().context("init logging")?;

    let cli = stainscrape::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        stainscrape::cli::Command::Scrape(args) => {
            stainscrape::scrape::run(args).context("scrape")?;
        }
        stainscrape::cli::Command::Icons(args) => {
            stainscrape::icons::run(args).context("icons")?;
        }
    }

    Ok(())
}
