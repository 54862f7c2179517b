mod db;
mod lookup;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rrv-cli")]
#[command(about = "Restaurant review command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search both OpenStreetMap providers and print the merged results
    Search {
        /// Free-text search term
        term: String,
        /// Maximum number of results
        #[arg(long, default_value_t = rrv_search::DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Look up one restaurant by record id (`osm-…` or `nom-…`)
    Details { id: String },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = rrv_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Search { term, limit }) => {
            lookup::run_search(&config, &term, limit).await?;
        }
        Some(Commands::Details { id }) => lookup::run_details(&config, &id).await?,
        Some(Commands::Db {
            command: DbCommands::Ping,
        }) => db::run_ping(&config).await?,
        Some(Commands::Db {
            command: DbCommands::Migrate,
        }) => db::run_migrate(&config).await?,
        None => println!("rrv-cli: run with --help to list commands"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
