mod crawl;
mod serp;
mod store;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "shopcrawl")]
#[command(about = "Crawl product listings, analyze search results, import into the catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl a paginated listing and store every extracted record
    Crawl {
        /// Listing URL; defaults to SHOPCRAWL_CRAWL_BASE_URL
        #[arg(long)]
        base_url: Option<String>,

        /// Maximum number of pages to fetch
        #[arg(long)]
        max_pages: Option<u32>,

        /// Extraction profile name from the profiles file
        #[arg(long)]
        profile: Option<String>,

        /// Print the crawl outcome without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Analyze a search results page for a keyword
    Serp {
        /// Keyword to search for
        #[arg(long, required_unless_present = "html_file")]
        keyword: Option<String>,

        /// Analyze a saved results page instead of fetching one
        #[arg(long)]
        html_file: Option<PathBuf>,
    },
    /// Import stored products that have not been imported yet
    Import {
        /// Only import products crawled from this listing URL
        #[arg(long)]
        source_url: Option<String>,
    },
    /// Print record store counters
    Stats,
    /// List stored products, newest first
    Products {
        #[arg(long)]
        source_url: Option<String>,

        /// Filter on the imported flag (`true` or `false`)
        #[arg(long)]
        imported: Option<bool>,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = shopcrawl_core::load_app_config().context("failed to load configuration")?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Crawl {
            base_url,
            max_pages,
            profile,
            dry_run,
        } => {
            crawl::run_crawl(
                &config,
                base_url.as_deref(),
                max_pages,
                profile.as_deref(),
                dry_run,
            )
            .await
        }
        Commands::Serp { keyword, html_file } => {
            serp::run_serp(&config, keyword.as_deref(), html_file.as_deref()).await
        }
        Commands::Import { source_url } => store::run_import(&config, source_url).await,
        Commands::Stats => store::run_stats(&config).await,
        Commands::Products {
            source_url,
            imported,
        } => store::run_products(&config, source_url, imported).await,
        Commands::Db { command } => match command {
            DbCommands::Ping => store::run_db_ping(&config).await,
            DbCommands::Migrate => store::run_db_migrate(&config).await,
        },
    }
}

/// Pretty-prints `value` as JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
