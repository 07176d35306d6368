mod config;
mod language;
mod prompt;
mod report;
mod session;
mod submit;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use config::Config;
use prompt::Cancelled;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    init_logging();
    if let Err(e) = run_command(Cli::parse()) {
        if e.downcast_ref::<Cancelled>().is_some() {
            println!("{}", e);
        } else {
            eprintln!("{}", format!("Error: {:#}", e).yellow().bold());
        }
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_command(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    submit::submit(cli.args, &config)
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    args: submit::SubmitArgs,
    /// Read this file instead of ~/.iic1103src
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tag_is_hidden_from_help() {
        let help = Cli::command().render_help().to_string();

        assert!(help.contains("--problem"));
        assert!(help.contains("--force"));
        assert!(!help.contains("--tag"));
    }

    #[test]
    fn files_are_required() {
        let result = Cli::try_parse_from(["iic1103-submit", "-f"]);

        assert!(result.is_err());
    }
}
