//! CLI parsing and orchestration. Builds the registry once, dispatches
//! subcommands against it, maps errors to exit codes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config;
use crate::engine::client::HttpClient;
use crate::engine::error::ScrapeError;
use crate::engine::registry::{Registry, RegistryError};
use crate::engine::script::JsSandbox;
use crate::engine::{Limits, Services};
use crate::health::{self, ProbeOptions};
use crate::model::{Chapter, Page, PageData, Series};
use crate::plugins;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scrape(#[from] ScrapeError),

    #[error("{0}")]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    Output(String),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scrape(_) => 2,
            CliRunError::Registry(_) | CliRunError::Output(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "comicscrape")]
#[command(about = "Scrape comic series, chapters, and pages through site plugins")]
#[command(
    after_help = "Config file keys (user_agent, timeout_secs, page_cap, script_timeout_secs, probe_timeout_secs) are read from ./comicscrape.toml or the XDG config directory. CLI flags override config."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress output (errors only).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print verbose error chain.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered plugins.
    List {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Probe each plugin's site and report liveness.
    Probe {
        /// Emit the machine-readable JSON report.
        #[arg(long)]
        json: bool,
        /// Per-site probe timeout in seconds (default 30).
        #[arg(long)]
        probe_timeout: Option<u64>,
    },
    /// List all series of one plugin.
    Series {
        plugin: String,
        #[arg(long)]
        json: bool,
    },
    /// List the chapters of one series.
    Chapters {
        plugin: String,
        /// Series identifier as printed by `series`.
        series_id: String,
        #[arg(long)]
        json: bool,
    },
    /// List the page entries of one chapter.
    Pages {
        plugin: String,
        /// Chapter identifier as printed by `chapters`.
        chapter_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Fetch one image to a file.
    Fetch {
        plugin: String,
        /// Absolute image URL as printed by `pages`.
        url: String,
        /// Referer to attach (the chapter URL), for hosts that need it.
        #[arg(long)]
        referer: Option<String>,
        /// Output file path.
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code
/// and message on failure.
pub async fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(|e| CliRunError::InvalidInput(format!("{:#}", e)))?;

    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    let timeout_secs = args
        .timeout
        .or_else(|| config.as_ref().and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.user_agent.clone()));

    let mut builder = HttpClient::builder().timeout_secs(timeout_secs);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let mut limits = Limits::default();
    if let Some(cap) = config.as_ref().and_then(|c| c.page_cap) {
        limits.page_cap = cap;
    }
    if let Some(secs) = config.as_ref().and_then(|c| c.script_timeout_secs) {
        limits.script_timeout = Duration::from_secs(secs);
    }

    let services = Services::new(client, JsSandbox::new()).with_limits(limits);
    let registry = Registry::build(plugins::catalog()?, &services)?;

    match &args.command {
        Command::List { json } => {
            let descriptors = registry.list();
            if *json {
                println!("{}", to_json(&descriptors)?);
            } else {
                for d in descriptors {
                    println!("{:<16} {:<28} {}", d.id, d.title, d.base_url);
                }
            }
        }
        Command::Probe {
            json,
            probe_timeout,
        } => {
            let probe_secs = probe_timeout
                .or_else(|| config.as_ref().and_then(|c| c.probe_timeout_secs))
                .unwrap_or(health::DEFAULT_PROBE_TIMEOUT_SECS);
            let options = ProbeOptions {
                timeout: Duration::from_secs(probe_secs),
                popularity: HashMap::new(),
                allowed_redirects: HashMap::new(),
            };
            let descriptors = registry.list();

            let bar = if args.quiet {
                None
            } else {
                let bar = indicatif::ProgressBar::new(descriptors.len() as u64);
                bar.set_style(
                    indicatif::ProgressStyle::default_bar()
                        .template("{spinner} probing [{bar:40}] {pos}/{len}")
                        .map_err(|e| CliRunError::Output(e.to_string()))?,
                );
                Some(bar)
            };
            let progress = |done: usize, _total: usize| {
                if let Some(ref b) = bar {
                    b.set_position(done as u64);
                }
            };
            let report = health::probe_all(
                descriptors,
                Arc::clone(&services.client),
                &options,
                Some(&progress),
            )
            .await;
            if let Some(b) = &bar {
                b.finish_and_clear();
            }
            if *json {
                println!(
                    "{}",
                    report
                        .to_json()
                        .map_err(|e| CliRunError::Output(e.to_string()))?
                );
            } else {
                print!("{}", report.render_table());
            }
        }
        Command::Series { plugin, json } => {
            let plugin = lookup(&registry, plugin)?;
            let series = plugin.list_series().await?;
            if *json {
                println!("{}", to_json(&series)?);
            } else {
                for s in series {
                    println!("{:<40} {}", s.id, s.title);
                }
            }
        }
        Command::Chapters {
            plugin,
            series_id,
            json,
        } => {
            let plugin = lookup(&registry, plugin)?;
            let series = Series {
                id: series_id.clone(),
                title: String::new(),
                plugin: plugin.info().id.clone(),
            };
            let chapters = plugin.list_chapters(&series).await?;
            if *json {
                println!("{}", to_json(&chapters)?);
            } else {
                for c in chapters {
                    println!("{:<40} {}", c.id, c.title);
                }
            }
        }
        Command::Pages {
            plugin,
            chapter_id,
            json,
        } => {
            let plugin = lookup(&registry, plugin)?;
            let chapter = Chapter {
                id: chapter_id.clone(),
                title: String::new(),
                series: String::new(),
            };
            let pages = plugin.list_pages(&chapter).await?;
            if *json {
                println!("{}", to_json(&pages)?);
            } else {
                for p in &pages {
                    let location = match &p.data {
                        PageData::Remote(url) => url.as_str(),
                        PageData::Inline(_) => "(inline)",
                    };
                    println!("{:>3}  {:<12} {}", p.index, p.media_type, location);
                }
            }
        }
        Command::Fetch {
            plugin,
            url,
            referer,
            output,
        } => {
            let plugin = lookup(&registry, plugin)?;
            let page = Page {
                index: 0,
                data: PageData::Remote(url.clone()),
                media_type: crate::model::media_type_for_url(url),
                referer: referer.clone(),
            };
            let image = plugin.fetch_image(&page).await?;
            std::fs::write(output, &image.bytes).map_err(|e| {
                CliRunError::Output(format!("cannot write {}: {}", output.display(), e))
            })?;
            if !args.quiet {
                eprintln!(
                    "Wrote {} ({} bytes, {})",
                    output.display(),
                    image.bytes.len(),
                    image.media_type
                );
            }
        }
    }
    Ok(())
}

fn lookup<'r>(
    registry: &'r Registry,
    id: &str,
) -> Result<&'r Arc<crate::engine::compose::Plugin>, CliRunError> {
    registry.get(id).ok_or_else(|| {
        CliRunError::InvalidInput(format!(
            "Unknown plugin '{}'. Use 'comicscrape list' to see registered plugins.",
            id
        ))
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliRunError> {
    serde_json::to_string_pretty(value).map_err(|e| CliRunError::Output(e.to_string()))
}
