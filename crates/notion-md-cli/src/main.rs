use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use notion_md_common::config::DEFAULT_CONFIG_PATH;
use notion_md_common::telemetry::{TelemetryConfig, init_tracing};
use notion_md_common::{Config, ConfigError, NotionClient};
use notion_md_renderer::{SiteGenerator, SiteOptions, SiteSummary};

#[derive(Parser)]
#[command(version, about = "Generate Markdown posts for a static site from a Notion database", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the KDL config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Notion integration token
    #[arg(long, env = "NOTION_SECRET", hide_env_values = true)]
    token: Option<String>,

    /// Database to export, overrides the config file
    #[arg(long, env = "DATABASE_ID")]
    database_id: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a commented default config file
    Init,
}

fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    init_tracing(TelemetryConfig::new(cli.verbose));

    match cli.command {
        Some(Commands::Init) => {
            Config::write_default(&cli.config)?;
            println!("Wrote {}", cli.config.display());
        }
        None => {
            let summary = generate(&cli)?;
            report_github_output(&summary)?;
        }
    }

    Ok(())
}

fn generate(cli: &Cli) -> Result<SiteSummary> {
    let config = Config::load(&cli.config)
        .wrap_err_with(|| format!("could not load {}", cli.config.display()))?;
    let token = cli
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or(ConfigError::Missing("NOTION_SECRET"))?;
    let database_id = cli
        .database_id
        .clone()
        .or_else(|| config.notion.database_id.clone())
        .filter(|id| !id.is_empty())
        .ok_or(ConfigError::Missing("database-id"))?;

    let client = NotionClient::new(token);
    let http = client.http().clone();
    let options = SiteOptions::from_config(&config, database_id);
    SiteGenerator::new(client, options, http).run()
}

/// Under GitHub Actions, expose the publish count as a step output.
fn report_github_output(summary: &SiteSummary) -> Result<()> {
    if std::env::var("GITHUB_ACTIONS").as_deref() != Ok("true") {
        return Ok(());
    }
    let Some(path) = std::env::var_os("GITHUB_OUTPUT") else {
        tracing::warn!("GITHUB_OUTPUT is not set, skipping step output");
        return Ok(());
    };
    append_output(Path::new(&path), "articles_published", summary.published)
}

fn append_output(path: &Path, key: &str, value: impl std::fmt::Display) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not open {}", path.display()))?;
    writeln!(file, "{key}={value}").into_diagnostic()
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
