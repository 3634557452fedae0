//! Command-line interface definitions for Mannarella News.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Database settings can be provided via command-line flags or environment
//! variables (a `.env` file in the working directory is loaded first).

use crate::outputs::database::DbConfig;
use crate::outputs::json::DEFAULT_OUTPUT_PATH;
use crate::scrapers::extract::DEFAULT_MAX_PER_SOURCE;
use crate::scrapers::fetch::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Mannarella News scraper.
///
/// # Examples
///
/// ```sh
/// # Write public/news.json
/// mannarella_news json
///
/// # Write somewhere else, with a custom source list
/// mannarella_news --sources sources.yaml json -o /var/www/news.json
///
/// # Insert into MySQL
/// DB_HOST=db.internal DB_PASSWORD=secret mannarella_news db
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML file replacing the built-in source registry
    #[arg(short, long, global = true)]
    pub sources: Option<PathBuf>,

    /// Maximum number of items taken from each source
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_PER_SOURCE)]
    pub max_per_source: usize,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// User-Agent header sent to every source
    #[arg(long, global = true, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Where to save the news (defaults to `json`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Write all scraped items to a JSON file
    Json {
        /// Output file
        #[arg(short, long, default_value = DEFAULT_OUTPUT_PATH)]
        output: PathBuf,
    },
    /// Insert new items into the MySQL `news` table
    Db(DbArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Json {
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

/// MySQL connection settings.
#[derive(Args, Debug, PartialEq)]
pub struct DbArgs {
    /// Database host
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// Database user
    #[arg(long, env = "DB_USER", default_value = "root")]
    pub db_user: String,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", default_value = "", hide_env_values = true)]
    pub db_password: String,

    /// Database name
    #[arg(long, env = "DB_NAME", default_value = "mannarella")]
    pub db_name: String,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value_t = 3306)]
    pub db_port: u16,
}

impl From<DbArgs> for DbConfig {
    fn from(args: DbArgs) -> Self {
        DbConfig {
            host: args.db_host,
            user: args.db_user,
            password: args.db_password,
            name: args.db_name,
            port: args.db_port,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_json() {
        let cli = Cli::parse_from(["mannarella_news"]);

        assert_eq!(cli.command, None);
        assert_eq!(cli.command.unwrap_or_default(), Command::default());
        assert_eq!(cli.max_per_source, 3);
        assert_eq!(cli.timeout_secs, 10);
        assert_eq!(cli.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_json_output_short_flag() {
        let cli = Cli::parse_from(["mannarella_news", "json", "-o", "/tmp/news.json"]);

        assert_eq!(
            cli.command,
            Some(Command::Json {
                output: PathBuf::from("/tmp/news.json")
            })
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "mannarella_news",
            "json",
            "--sources",
            "sources.yaml",
            "--max-per-source",
            "5",
        ]);

        assert_eq!(cli.sources, Some(PathBuf::from("sources.yaml")));
        assert_eq!(cli.max_per_source, 5);
    }

    #[test]
    fn test_db_flags() {
        let cli = Cli::parse_from([
            "mannarella_news",
            "db",
            "--db-host",
            "db.internal",
            "--db-user",
            "scraper",
            "--db-password",
            "secret",
            "--db-name",
            "news",
            "--db-port",
            "3307",
        ]);

        let Some(Command::Db(args)) = cli.command else {
            panic!("expected db subcommand");
        };
        let config = DbConfig::from(args);
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.user, "scraper");
        assert_eq!(config.password, "secret");
        assert_eq!(config.name, "news");
        assert_eq!(config.port, 3307);
    }
}
