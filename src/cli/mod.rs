// src/cli/mod.rs — CLI definition (clap derive)

pub mod console;
pub mod format;
pub mod query;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "livetrack", about = "Track live broadcasts and their recordings", version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Poll the live list and record sessions (default)
    Watch {
        /// Owner ID to watch; repeat for several. Overrides the config file
        #[arg(long = "owner")]
        owners: Vec<i64>,
        /// Seconds between polls
        #[arg(long)]
        interval: Option<u64>,
        /// Do not read console commands from stdin
        #[arg(long)]
        no_console: bool,
    },
    /// Print stored sessions of an owner, newest first
    List {
        owner: i64,
        /// Maximum rows (-1 = all)
        #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
        limit: i64,
    },
    /// Fetch the live list once and print it
    Fetch {
        /// Only show this owner's sessions
        #[arg(long)]
        owner: Option<i64>,
    },
    /// Look up the recording links of sessions
    Playback {
        #[arg(required = true)]
        session_ids: Vec<String>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Watch {
            owners: Vec::new(),
            interval: None,
            no_console: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("livetrack").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_subcommand_means_watch() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert_eq!(cli.command.unwrap_or_default(), Commands::default());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_watch_flags() {
        let cli = parse(&["watch", "--owner", "1", "--owner", "2", "--interval", "5", "--no-console"]);
        assert_eq!(
            cli.command,
            Some(Commands::Watch {
                owners: vec![1, 2],
                interval: Some(5),
                no_console: true,
            })
        );
    }

    #[test]
    fn test_list_limit_defaults_to_all() {
        assert_eq!(
            parse(&["list", "646973"]).command,
            Some(Commands::List {
                owner: 646973,
                limit: -1
            })
        );
        assert_eq!(
            parse(&["list", "646973", "-l", "5"]).command,
            Some(Commands::List {
                owner: 646973,
                limit: 5
            })
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["fetch", "--log-level", "debug", "--config", "/tmp/x.toml"]);
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.config.as_deref(), Some("/tmp/x.toml"));
        assert_eq!(cli.command, Some(Commands::Fetch { owner: None }));
    }

    #[test]
    fn test_playback_requires_an_id() {
        assert!(Cli::try_parse_from(["livetrack", "playback"]).is_err());
    }
}
