//! Pavement Control - CLI for pavement condition analysis
//!
//! Owns the process-level state: logging, configuration and the API key.
//! Everything else lives in `pavement_common`.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pavectl")]
#[command(about = "Pavement condition analysis from photos", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/pavement/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a pavement photo
    Analyze {
        /// Image file (jpg, jpeg, png or bmp, max 10 MiB)
        image: PathBuf,

        /// Where the photo was taken
        #[arg(long, default_value = "")]
        location: String,

        /// Notes about the pavement
        #[arg(long, default_value = "")]
        notes: String,

        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,

        /// Do not record the assessment in history
        #[arg(long)]
        no_save: bool,
    },

    /// List recorded assessments, newest first
    History {
        /// Show at most this many
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one assessment
    Show {
        id: Uuid,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete an assessment from history
    Delete { id: Uuid },

    /// Show the configured model order and credential status
    Models,

    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        output::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    let load = || commands::load_config(config_path);

    match cli.command {
        Commands::Analyze {
            image,
            location,
            notes,
            json,
            no_save,
        } => commands::analyze(&load()?, &image, location, notes, json, no_save),
        Commands::History { limit } => commands::history(&load()?, limit),
        Commands::Show { id, json } => commands::show(&load()?, id, json),
        Commands::Delete { id } => commands::delete(&load()?, id),
        Commands::Models => commands::models(&load()?),
        Commands::InitConfig { force } => commands::init_config(config_path, force),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "pavectl", "analyze", "road.jpg", "--location", "Elm St", "--json", "--no-save",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze {
                image,
                location,
                notes,
                json,
                no_save,
            } => {
                assert_eq!(image, PathBuf::from("road.jpg"));
                assert_eq!(location, "Elm St");
                assert!(notes.is_empty());
                assert!(json);
                assert!(no_save);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_show_requires_uuid() {
        assert!(Cli::try_parse_from(["pavectl", "show", "not-a-uuid"]).is_err());
        let id = Uuid::new_v4().to_string();
        assert!(Cli::try_parse_from(["pavectl", "show", id.as_str()]).is_ok());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["pavectl", "models", "--config", "/tmp/p.toml", "-v"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        assert!(cli.verbose);
    }
}
