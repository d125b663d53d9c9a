// src/cli/console.rs — Line-oriented console running next to the watcher

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::cli::query::Queries;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    List { owner_id: i64 },
    Last { owner_id: i64, count: i64 },
    Playback { session_ids: Vec<String> },
    Fetch { owner_id: Option<i64> },
    Help,
    Quit,
}

const HELP: &str = "\
  list <owner>        stored sessions of an owner
  last <owner> <n>    the n most recent stored sessions of an owner
  playback <id>...    recording links of sessions
  fetch [owner]       fetch the live list now
  help                this text
  quit                stop watching and exit";

/// Parse one input line. `Ok(None)` for a blank line.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (cmd, args.as_slice()) {
        ("list", [owner]) => ConsoleCommand::List {
            owner_id: parse_owner(owner)?,
        },
        ("last", [owner, count]) => ConsoleCommand::Last {
            owner_id: parse_owner(owner)?,
            count: count
                .parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("Invalid count: {count}"))?,
        },
        ("playback", ids) if !ids.is_empty() => ConsoleCommand::Playback {
            session_ids: ids.iter().map(|s| s.to_string()).collect(),
        },
        ("fetch", []) => ConsoleCommand::Fetch { owner_id: None },
        ("fetch", [owner]) => ConsoleCommand::Fetch {
            owner_id: Some(parse_owner(owner)?),
        },
        ("help", _) => ConsoleCommand::Help,
        ("quit" | "exit", _) => ConsoleCommand::Quit,
        ("list" | "last" | "playback" | "fetch", _) => {
            return Err(format!("Wrong arguments for '{cmd}' (try 'help')"))
        }
        _ => return Err(format!("Unknown command: {cmd} (try 'help')")),
    };
    Ok(Some(command))
}

fn parse_owner(s: &str) -> Result<i64, String> {
    s.parse().map_err(|_| format!("Invalid owner ID: {s}"))
}

/// Read stdin on a dedicated thread so a pending read never holds up
/// runtime shutdown.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        use std::io::BufRead;
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

pub struct Console {
    queries: Queries,
}

impl Console {
    pub fn new(queries: Queries) -> Self {
        Self { queries }
    }

    /// Run commands until `quit`, end of input, or shutdown. `quit` raises
    /// the shutdown signal itself.
    pub async fn run(
        self,
        mut lines: mpsc::UnboundedReceiver<String>,
        shutdown: Arc<watch::Sender<bool>>,
    ) {
        let mut stopped = shutdown.subscribe();
        loop {
            let line = tokio::select! {
                line = lines.recv() => line,
                _ = stopped.changed() => break,
            };
            let Some(line) = line else {
                tracing::debug!("Console input closed");
                break;
            };

            match parse_command(&line) {
                Ok(None) => {}
                Ok(Some(ConsoleCommand::Quit)) => {
                    tracing::info!("Quit requested from console");
                    let _ = shutdown.send(true);
                    break;
                }
                Ok(Some(cmd)) => {
                    if let Err(e) = self.execute(cmd).await {
                        eprintln!("  Error: {e:#}");
                    }
                }
                Err(msg) => eprintln!("  {msg}"),
            }
        }
    }

    pub async fn execute(&self, cmd: ConsoleCommand) -> anyhow::Result<()> {
        match cmd {
            ConsoleCommand::List { owner_id } => self.queries.list(owner_id, -1).await,
            ConsoleCommand::Last { owner_id, count } => self.queries.list(owner_id, count).await,
            ConsoleCommand::Playback { session_ids } => self.queries.playback(&session_ids).await,
            ConsoleCommand::Fetch { owner_id } => self.queries.fetch(owner_id).await,
            ConsoleCommand::Help => {
                println!("{HELP}");
                Ok(())
            }
            ConsoleCommand::Quit => Ok(()),
        }
    }
}
