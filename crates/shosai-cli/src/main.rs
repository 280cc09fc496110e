mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shosai_api::ReaderClient;
use shosai_core::config::AppConfig;

use commands::CliError;

#[derive(Parser, Debug)]
#[command(name = "shosai", version, about = "Read novels from a shosai server")]
struct Args {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List novels on the shelf
    Shelf {
        #[arg(short, long, default_value = "")]
        keyword: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Search the catalogue
    Search {
        keyword: String,
        /// Number of result pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Add a search result to the shelf
    Add { keyword: String, unique_id: String },
    /// Show or prune reading history
    History {
        /// Delete the history entry with this id
        #[arg(long)]
        delete: Option<String>,
    },
    /// Open a novel where reading left off
    Read {
        novel_id: String,
        /// Advance this many chapters after opening
        #[arg(long, default_value_t = 0)]
        next: u32,
        /// Lines of the chapter to print
        #[arg(long, default_value_t = 20)]
        lines: usize,
    },
    /// Print the effective config
    Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (config, config_path) = match load_config(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _log_guard = logging::init(&config.logging, args.verbose);
    tracing::debug!(path = %config_path.display(), "config loaded");

    match run(args.command, &config, &config_path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<(AppConfig, PathBuf), CliError> {
    match path {
        Some(path) => Ok((AppConfig::load_from(path)?, path.to_path_buf())),
        None => Ok((AppConfig::load()?, AppConfig::config_path())),
    }
}

async fn run(
    command: Command,
    config: &AppConfig,
    config_path: &std::path::Path,
) -> Result<(), CliError> {
    let connect = || -> Result<ReaderClient, CliError> {
        Ok(ReaderClient::new(config.server.url()?, config.server.token()))
    };
    let page_size = config.list.page_size;

    match command {
        Command::Config => commands::show_config(config, config_path),
        Command::Shelf { keyword, page } => {
            commands::shelf(&connect()?, &keyword, page, page_size).await
        }
        Command::Search { keyword, pages } => {
            commands::search(&connect()?, &keyword, page_size, pages).await
        }
        Command::Add { keyword, unique_id } => {
            commands::add(&connect()?, &keyword, &unique_id, page_size).await
        }
        Command::History { delete } => {
            commands::history(&connect()?, page_size, delete.as_deref()).await
        }
        Command::Read {
            novel_id,
            next,
            lines,
        } => commands::read(connect()?, config, &novel_id, next, lines).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_read_command() {
        let args = Args::parse_from(["shosai", "-v", "read", "n1", "--next", "2"]);
        assert!(args.verbose);
        match args.command {
            Command::Read {
                novel_id,
                next,
                lines,
            } => {
                assert_eq!(novel_id, "n1");
                assert_eq!(next, 2);
                assert_eq!(lines, 20);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let args = Args::parse_from(["shosai", "config", "--config", "/tmp/x.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/x.toml")));
        assert!(matches!(args.command, Command::Config));
    }

    #[test]
    fn test_args_are_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
