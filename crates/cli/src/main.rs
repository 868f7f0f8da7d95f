//! ContentCrew CLI: the main entry point.
//!
//! Commands:
//! - `run`    : Run the full pipeline interactively (default)
//! - `web`    : Start the web dashboard
//! - `plot`   : Write the pipeline flow diagram as HTML
//! - `doctor` : Check configuration and credentials

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "contentcrew",
    about = "ContentCrew — research, brief and write SEO content with human checkpoints",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline in the terminal
    Run,

    /// Start the web dashboard
    Web {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write the flow visualization
    Plot {
        /// Where to write the HTML file
        #[arg(short, long, default_value = "content_flow_visualization.html")]
        output: PathBuf,
    },

    /// Diagnose configuration and credentials
    Doctor {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => commands::run::run().await?,
        Commands::Web { port } => commands::web::run(port).await?,
        Commands::Plot { output } => commands::plot::run(output).await?,
        Commands::Doctor { init } => commands::doctor::run(init).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_run() {
        let cli = Cli::try_parse_from(["contentcrew"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["contentcrew", "web", "--port", "9000", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Web { port: Some(9000) })));

        let cli = Cli::try_parse_from(["contentcrew", "plot"]).unwrap();
        match cli.command {
            Some(Commands::Plot { output }) => {
                assert_eq!(output, PathBuf::from("content_flow_visualization.html"))
            }
            _ => panic!("expected plot"),
        }
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(Cli::try_parse_from(["contentcrew", "deploy"]).is_err());
    }
}
