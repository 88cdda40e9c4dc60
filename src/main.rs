pub mod types;
pub mod config;
pub mod data;
pub mod processing;
pub mod render;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the dataset and serve the dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,

        /// Debug logging and per-request traces
        #[arg(long)]
        debug: bool,
    },
    /// Print the top cities by sales, optionally for one country
    Top {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,

        #[arg(long)]
        country: Option<String>,
    },
}

fn init_tracing(debug: bool) {
    let default_level = if debug {
        "debug,hyper=info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config, debug } => {
            init_tracing(*debug);
            let app_config = config::AppConfig::load_or_default(config)?;

            // The dataset is fetched once, before the listener binds.
            let dataset = data::load_data(&app_config.input).await?;

            server::start_server(app_config, dataset).await?;
        }
        Commands::Top { config, country } => {
            init_tracing(false);
            let app_config = config::AppConfig::load_or_default(config)?;
            let dataset = data::load_data(&app_config.input).await?;

            let selection = types::Selection::from_param(country.as_deref());
            let top = processing::top_cities(&dataset, &selection, app_config.bar.top_n);

            if top.is_empty() {
                println!("No cities found for {:?}", selection);
            }
            for (rank, entry) in top.iter().enumerate() {
                println!("{:>3}. {:<30} {:>15.0}", rank + 1, entry.city, entry.sales);
            }
        }
    }

    Ok(())
}
