use crate::config::credentials::{CREDENTIAL_ENV_VARS, get_credential_value};
use crate::config::{Config, get_config_path, load_config};
use crate::gateway;
use crate::relay::RelayOrchestrator;
use crate::roster::Roster;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

#[derive(Parser)]
#[command(name = "txtpost")]
#[command(about = "Relay SMS messages to Micro.blog and Twitter", version)]
pub struct Cli {
    /// Path to config.json (default: $TXTPOST_HOME/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the SMS webhook gateway
    Serve,
    /// Resolve a sender token against the roster
    Lookup { token: String },
    /// Load and validate configuration and roster
    Check,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    // Log to stderr until the config is read, so loader warnings aren't lost.
    let (subscriber, logging) = logging(BoxMakeWriter::new(std::io::stderr), env_filter());
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;
    let config = load_config(cli.config.as_deref())?;
    logging.redirect(&config)?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Lookup { token } => {
            println!("{}", lookup(&config, &token)?);
            Ok(())
        }
        Commands::Check => {
            let path = match cli.config {
                Some(p) => p,
                None => get_config_path()?,
            };
            print!("{}", check(&config, &path)?);
            Ok(())
        }
    }
}

type FmtLayer = fmt::Layer<Registry, DefaultFields, Format, BoxMakeWriter>;

/// `RUST_LOG` overrides the default `info` level.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Build the subscriber around a swappable output layer.
fn logging(
    writer: BoxMakeWriter,
    filter: EnvFilter,
) -> (impl tracing::Subscriber + Send + Sync, LogHandle) {
    let (layer, handle) = reload::Layer::new(fmt::layer().with_writer(writer));
    let subscriber = Registry::default().with(layer).with(filter);
    (subscriber, LogHandle(handle))
}

struct LogHandle(reload::Handle<FmtLayer, Registry>);

impl LogHandle {
    /// Switch output to `logfile` when configured; otherwise keep stderr.
    fn redirect(&self, config: &Config) -> Result<()> {
        if config.logfile.is_empty() || config.logfile == "stderr" {
            return Ok(());
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.logfile)
            .with_context(|| format!("Failed to open logfile {}", config.logfile))?;
        self.0
            .modify(|layer| {
                *layer.writer_mut() = BoxMakeWriter::new(Mutex::new(file));
                layer.set_ansi(false);
            })
            .context("Failed to redirect logging")?;
        info!("logging to {}", config.logfile);
        Ok(())
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("txtpost {} starting", crate::VERSION);
    let relay = Arc::new(RelayOrchestrator::from_config(&config)?);
    info!(
        "destinations: {}",
        if relay.destination_names().is_empty() {
            "(none)".to_string()
        } else {
            relay.destination_names().join(", ")
        }
    );
    gateway::serve(&config, relay).await
}

fn load_roster(config: &Config) -> Result<Roster> {
    Roster::load(Path::new(&config.roster_file))
}

fn lookup(config: &Config, token: &str) -> Result<String> {
    let name = load_roster(config)?.resolve(token);
    Ok(if name.is_empty() {
        format!("{token}: unknown sender")
    } else {
        format!("{token}: {name}")
    })
}

fn check(config: &Config, path: &Path) -> Result<String> {
    let roster = load_roster(config)?;
    let destinations = config.destination_names();

    let mut out = String::new();
    writeln!(out, "config:       {}", path.display())?;
    writeln!(out, "listen:       {}", config.server.listen)?;
    writeln!(out, "route:        POST {}", config.server.route)?;
    writeln!(out, "media dir:    {}", config.media_root()?.display())?;
    writeln!(
        out,
        "roster:       {} ({} sender(s))",
        config.roster_file,
        roster.len()
    )?;
    writeln!(
        out,
        "destinations: {}",
        if destinations.is_empty() {
            "(none)".to_string()
        } else {
            destinations.join(", ")
        }
    )?;
    for (name, env) in CREDENTIAL_ENV_VARS {
        let Some(value) = get_credential_value(config, name) else {
            continue;
        };
        let state = if value.is_empty() { "missing" } else { "set" };
        let source = if std::env::var(env).is_ok_and(|v| !v.is_empty()) {
            format!(" (from {env})")
        } else {
            String::new()
        };
        writeln!(out, "  {name}: {state}{source}")?;
    }
    writeln!(
        out,
        "reporting:    {}",
        if config.error_reporting.honeybadger_api_key.is_empty() {
            "logs only"
        } else {
            "honeybadger"
        }
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests;
