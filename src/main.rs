use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cache;
mod config;
mod currency;
mod data;
mod engine;
mod http;
mod orchestrator;
mod portfolio;
mod report;
mod risk;
mod roles;
mod salary;
mod scoring;

use config::AppConfig;
use engine::ConversionRates;

#[derive(Parser)]
#[command(name = "offshore-savings")]
#[command(about = "Estimate the savings of offshore property management staff", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate savings for a saved form
    Calculate {
        /// Form data JSON file
        #[arg(long)]
        input: PathBuf,

        /// Output format (json or md)
        #[arg(long, default_value = "json")]
        format: String,

        /// Fetch salary data from this URL instead of the bundled table
        #[arg(long)]
        salary_url: Option<String>,

        /// Use the static exchange rate table, no network
        #[arg(long)]
        offline: bool,

        /// Pin the PHP->USD rate (requires --usd-local)
        #[arg(long, requires = "usd_local")]
        php_usd: Option<f64>,

        /// Pin the USD->local currency rate (requires --php-usd)
        #[arg(long, requires = "php_usd")]
        usd_local: Option<f64>,
    },

    /// Show a live exchange rate
    Rate {
        #[arg(long, default_value = "PHP")]
        from: String,

        #[arg(long)]
        to: String,
    },

    /// Show salary bands for a role
    Salary {
        #[arg(long)]
        role: String,

        #[arg(long, default_value = "Australia")]
        country: String,

        #[arg(long)]
        salary_url: Option<String>,
    },

    /// List roles and their tasks
    Roles,

    /// Manage the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove cached exchange rates and salary tables
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = cache_dir;
    }

    match cli.command {
        Commands::Calculate {
            input,
            format,
            salary_url,
            offline,
            php_usd,
            usd_local,
        } => {
            tracing::info!(input = ?input, format = %format, offline, "Calculating savings");
            let pinned_rates = php_usd.zip(usd_local).map(|(php_to_usd, usd_to_local)| {
                ConversionRates {
                    php_to_usd,
                    usd_to_local,
                }
            });
            let options = orchestrator::CalculateOptions {
                format: &format,
                salary_url: salary_url.as_deref(),
                offline,
                pinned_rates,
            };
            orchestrator::calculate(&config, &input, &options).await?;
        }
        Commands::Rate { from, to } => {
            tracing::info!(from = %from, to = %to, "Fetching rate");
            orchestrator::show_rate(&config, &from, &to).await?;
        }
        Commands::Salary {
            role,
            country,
            salary_url,
        } => {
            tracing::info!(role = %role, country = %country, "Showing salary");
            orchestrator::show_salary(&config, &role, &country, salary_url.as_deref()).await?;
        }
        Commands::Roles => orchestrator::list_roles(),
        Commands::Cache { action } => match action {
            CacheAction::Clear => {
                tracing::info!(dir = ?config.cache_dir, "Clearing cache");
                orchestrator::clear_cache(&config)?;
            }
        },
    }

    Ok(())
}
