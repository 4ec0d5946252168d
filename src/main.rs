use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use concierge::advisory::StaticAdvisories;
use concierge::config::Config;
use concierge::logging;
use concierge::rest::{ApiState, RestApiServer};
use concierge::store::{HttpWorkflowStore, InMemoryStore, WorkflowStore};

#[derive(Parser)]
#[command(name = "concierge")]
#[command(about = "Travel booking workflow engine and store server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reference workflow store server
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List workflows in the remote store
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let _logging_handle = logging::init_logging(&config, cli.debug)?;

    match cli.command {
        Commands::Serve { port } => {
            cmd_serve(&config, port).await?;
        }
        Commands::List => {
            cmd_list(&config).await?;
        }
    }

    Ok(())
}

async fn cmd_serve(config: &Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);

    // Reference advisory table; a production deployment would plug in a
    // live advisory feed here.
    let annotator = StaticAdvisories::new().with_rule(
        "standby",
        "Standby fares are not guaranteed",
        "Book a confirmed fare",
    );

    let state = ApiState::new(Arc::new(InMemoryStore::new()), Arc::new(annotator));
    let server = RestApiServer::new(state);
    let bound_port = server.start(port).await?;
    println!("Workflow store listening on http://0.0.0.0:{bound_port}");

    tokio::signal::ctrl_c().await?;
    server.stop().await;

    Ok(())
}

async fn cmd_list(config: &Config) -> Result<()> {
    let store = HttpWorkflowStore::with_timeout(&config.store.base_url, config.request_timeout());
    let summaries = store.list().await?;

    if summaries.is_empty() {
        println!("No workflows found at {}", config.store.base_url);
        return Ok(());
    }

    println!("{:<38} {:<24} {:>9} {:>10}", "ID", "CUSTOMER", "STEPS", "FINISHED");
    for summary in summaries {
        println!(
            "{:<38} {:<24} {:>4}/{:<4} {:>10}",
            summary.id,
            summary.customer_name,
            summary.completed_steps,
            summary.total_steps,
            summary.finished
        );
    }

    Ok(())
}
