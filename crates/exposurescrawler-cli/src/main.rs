use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use exposurescrawler_core::{Config, Credentials};
use exposurescrawler_dbt::Manifest;
use exposurescrawler_engine::{crawl, CrawlOptions, CrawlSummary};
use exposurescrawler_tableau::{MetadataCache, RestClient, TableauClient};

const DEFAULT_CONFIG_FILE: &str = "exposurescrawler.toml";

const CRAWLER_TARGETS: &[&str] = &[
    "exposurescrawler_core",
    "exposurescrawler_dbt",
    "exposurescrawler_tableau",
    "exposurescrawler_engine",
    "dbt_exposures_crawler",
];

/// Crawl Tableau and add its workbooks to a dbt manifest as exposures
#[derive(Parser)]
#[command(name = "dbt-exposures-crawler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The path to the dbt manifest artifact
    #[arg(long, value_name = "PATH")]
    manifest_path: PathBuf,

    /// The name of the dbt package where the exposures should be added.
    /// If in doubt, check the name of your dbt project on dbt_project.yml
    #[arg(long, value_name = "PROJECT_NAME")]
    dbt_package_name: Option<String>,

    /// The name of Tableau projects (folders) to ignore
    #[arg(long = "tableau-ignore-projects", value_name = "PROJECT", value_delimiter = ',')]
    tableau_projects_to_ignore: Vec<String>,

    /// Only match tables from data connections of this type
    #[arg(long, value_name = "TYPE")]
    connection_type: Option<String>,

    /// Write the updated manifest here instead of overwriting the input
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Path to config file (default: exposurescrawler.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine
    dotenvy::dotenv().ok();

    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let options = CrawlOptions::from_config(&config, cli.dbt_package_name.as_deref())?;

    let manifest_path = expand_home(&cli.manifest_path);
    info!(path = %manifest_path.display(), "Loading dbt manifest");
    let mut manifest = Manifest::from_file(&manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    let credentials = Credentials::from_lookup(config.tableau.login_method, env_lookup)
        .context("Tableau credentials are not configured")?;
    let client = RestClient::new(&config.tableau, credentials)?;

    let mut cache = MetadataCache::new();
    let result = crawl(&client, &mut manifest, &options, &mut cache).await;

    if let Err(e) = client.sign_out().await {
        warn!(error = %e, "Failed to sign out of Tableau");
    }

    let summary = result.context("Crawl failed")?;

    let output = cli.output.as_ref().map(|p| expand_home(p)).unwrap_or(manifest_path);
    info!(path = %output.display(), "Writing results to file");
    manifest
        .save(&output)
        .with_context(|| format!("Failed to write manifest {}", output.display()))?;

    print_summary(&summary, &output);

    Ok(())
}

/// Logs go to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let default_directives = std::iter::once("warn".to_string())
        .chain(CRAWLER_TARGETS.iter().map(|target| format!("{}={}", target, level)))
        .collect::<Vec<_>>()
        .join(",");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// File config (explicit, then ./exposurescrawler.toml, then defaults),
/// then environment, then command line flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG_FILE))?
    } else {
        info!("No config file found, using defaults");
        Config::default()
    };

    config.apply_env(env_lookup)?;

    config
        .ignore_projects
        .extend(cli.tableau_projects_to_ignore.iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()));

    if let Some(connection_type) = &cli.connection_type {
        config.tableau.connection_type = connection_type.clone();
    }

    Ok(config)
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

fn print_summary(summary: &CrawlSummary, output: &Path) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Tableau Exposures".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("{}", "Summary:".bold());
    println!("  Known models and sources: {}", summary.known_models);
    println!(
        "  Workbooks with models:    {} custom SQL + {} native SQL = {} merged",
        summary.custom_sql_workbooks, summary.native_sql_workbooks, summary.merged_workbooks
    );
    println!("  Exposures written:        {}", summary.exposures.len().to_string().green());

    if summary.skipped.is_empty() {
        println!("  Skipped (ignored):        0");
    } else {
        println!("  Skipped (ignored):        {}", summary.skipped.len().to_string().yellow());
    }
    println!();

    if summary.exposures.is_empty() {
        println!("{}", "No workbook references a dbt model".yellow());
    } else {
        for exposure in &summary.exposures {
            println!("  {} {}", "+".green(), exposure);
        }
    }

    println!();
    println!("{} {}", "Manifest saved to:".green(), output.display());
}
