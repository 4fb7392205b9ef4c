use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sprig_cli::commands;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sprig")]
#[command(about = "Sprig - decorate server-rendered pages with sections, blocks and navigation", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decorate an HTML page
    Decorate {
        /// HTML file or http(s) URL of the page
        input: String,

        /// Write decorated HTML here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Serve site resources from this directory
        #[arg(long, conflicts_with = "base_url")]
        site_root: Option<PathBuf>,

        /// Fetch site resources relative to this URL
        #[arg(long)]
        base_url: Option<String>,

        /// TOML decorator config
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON file holding session flags across runs
        #[arg(long)]
        session: Option<PathBuf>,

        /// URL the page is served from (overrides the config)
        #[arg(long)]
        page_url: Option<String>,
    },

    /// Report WebP support for the session
    Probe {
        /// JSON file holding session flags across runs
        #[arg(long)]
        session: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Decorate {
            input,
            output,
            site_root,
            base_url,
            config,
            session,
            page_url,
        } => {
            let args = commands::decorate::DecorateArgs {
                input,
                output,
                site_root,
                base_url,
                config,
                session,
                page_url,
            };
            commands::decorate::execute(args).await
        }

        Commands::Probe { session } => commands::probe::execute(session.as_deref()),
    }
}
