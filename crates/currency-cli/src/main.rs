use anyhow::Context;
use clap::{Parser, Subcommand};
use currency_cli::{simulate, Scenario};
use currency_core::CurrencyConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "currency", version, about = "Token1 exchange engine simulator")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a JSON scenario against in-memory collaborators and print a report
    Simulate {
        /// Engine configuration (TOML). Defaults apply when absent.
        #[arg(short, long, env = "CURRENCY_CONFIG", default_value = "currency.toml")]
        config: PathBuf,
        /// Scenario file (JSON)
        #[arg(short, long)]
        script: PathBuf,
        /// Pretty-print the report
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Validate a configuration file
    CheckConfig {
        #[arg(short, long, env = "CURRENCY_CONFIG", default_value = "currency.toml")]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "currency_core=debug,currency_cli=debug,info"
    } else {
        "currency_core=info,currency_cli=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Simulate {
            config,
            script,
            pretty,
        } => {
            let config = CurrencyConfig::load(&config)
                .with_context(|| format!("loading config {}", config.display()))?;
            let scenario = Scenario::load(&script)
                .with_context(|| format!("loading scenario {}", script.display()))?;
            let report = simulate(config, &scenario)?;

            let rendered = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{rendered}");

            if !report.invariants_ok {
                anyhow::bail!("ledger invariants violated after scenario");
            }
        }
        Commands::CheckConfig { config } => {
            let loaded = CurrencyConfig::load(&config)
                .with_context(|| format!("loading config {}", config.display()))?;
            info!(
                name = %loaded.name,
                symbol = %loaded.symbol,
                reserve = loaded.reserve.name(),
                "Configuration valid"
            );
            println!("{}", toml::to_string_pretty(&loaded)?);
        }
    }

    Ok(())
}
