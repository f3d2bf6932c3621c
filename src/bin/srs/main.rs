mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "srs-cards", about = "Flashcard review scheduler server", version)]
struct Cli {
    /// Config file (default: <config dir>/srs-cards/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Card snapshot file; overrides `data_file` from the config
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print the cards currently due from the snapshot file
    Due {
        /// Output format
        #[arg(long, default_value = "plain")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = srs_cards::ServerConfig::load(cli.config.as_deref())?;
    if let Some(data_file) = cli.data_file {
        config.data_file = Some(data_file);
    }

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            commands::serve::run(config).await?;
        }
        Command::Due { format } => {
            commands::due::run(&config, &format)?;
        }
    }

    Ok(())
}
