mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dealscout_deals::PriceProvider;

#[derive(Debug, Parser)]
#[command(name = "dealscout")]
#[command(about = "Evaluate retail product listings against other retailers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract the product record for a listing URL
    Details { url: String },
    /// Find comparable offers at other retailers
    Alternatives { url: String },
    /// Score the listing against its alternatives
    Analyze { url: String },
    /// Run details, alternatives, and analysis in one report
    Evaluate {
        url: String,
        /// Stop after this many seconds and report what was collected
        #[arg(long)]
        deadline_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = dealscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let provider = PriceProvider::new(config);
    let result = run(&provider, cli.command).await;
    provider.close();
    result
}

async fn run(provider: &PriceProvider, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Details { url } => commands::run_details(provider, &url).await,
        Commands::Alternatives { url } => commands::run_alternatives(provider, &url).await,
        Commands::Analyze { url } => commands::run_analyze(provider, &url).await,
        Commands::Evaluate { url, deadline_secs } => {
            commands::run_evaluate(provider, &url, deadline_secs).await
        }
    }
}

#[cfg(test)]
mod tests;
