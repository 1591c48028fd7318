use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cassa::config::CassaConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "cassa")]
#[command(version, about = "CASSA VEGAS - two-track workflow board with an AI crew")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    pub yes: bool,

    /// Board database path (overrides cassa.toml / CASSA_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the board server
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Auto-open browser after the server starts
        #[arg(long)]
        open: bool,

        /// Enable dev mode (bind all interfaces, permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// Show the current board
    Board,
    /// List the agent roster
    Agents,
    /// List the build option catalog
    Registry,
    /// Clear the stored board (it reseeds on next load)
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "cassa=debug" } else { "cassa=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = CassaConfig::load()?.with_db_path(cli.db.clone());

    match &cli.command {
        Commands::Serve { port, open, dev } => {
            let config = config.with_port(*port).with_dev_mode(*dev);
            cmd::cmd_serve(config, *open).await?;
        }
        Commands::Board => cmd::cmd_board(&config.db_path).await?,
        Commands::Agents => cmd::cmd_agents()?,
        Commands::Registry => cmd::cmd_registry()?,
        Commands::Reset => cmd::cmd_reset(&config.db_path, cli.yes).await?,
    }

    Ok(())
}
