mod categorizer;
mod cli;
mod db;
mod dedup;
mod error;
mod export;
mod importer;
mod locale;
mod models;
mod normalizer;
mod schema;
mod settings;
mod sniff;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use settings::{default_config_path, Config};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli::logging::init(cli.verbose, &cli.log_file).and_then(|()| run(&cli)) {
        tracing::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    tracing::info!("---- gobbler {} started ----", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed loading configuration {}", config_path.display()))?;
    tracing::debug!(
        "{} account type(s), {} expense categories, locale {}",
        config.registry.as_ref().map_or(0, |r| r.len()),
        config.rules.len(),
        config.locale.identifier
    );

    let conn = db::open_store(&config.database_path)
        .with_context(|| format!("failed opening {}", config.database_path.display()))?;

    let rules = config.rules_for_paths(cli.reports.as_slice());
    if !cli.reports.is_empty() {
        cli::import::run(&conn, &config, &cli.reports).context("import failed")?;
    }
    cli::categorize::run(&conn, &config, &rules, cli.recategorize)
        .context("categorization failed")?;
    if let Some(output) = &cli.output {
        cli::export::csv(&conn, &config, output).context("CSV export failed")?;
    }
    if let Some(output) = &cli.savetojs {
        cli::export::js(&conn, &config, &rules, output).context("JS export failed")?;
    }

    let total = db::count_transactions(&conn).context("failed counting transactions")?;
    tracing::info!("---- gobbler finished, {total} transactions stored ----");
    Ok(())
}
