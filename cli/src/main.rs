//! ruff-host CLI - runs the ruff host against a set of project roots.
//!
//! ```text
//! ruff-host [COMMAND] [ROOT...]
//! ```
//!
//! With a command, runs it once and exits. Without one, reads commands from
//! stdin line by line while pumping language server events.

mod terminal;

use std::{
    env,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ruff_host_engine::{
    DiagnosticsSnapshot, HostCommand, RuffHost, command_help_summary, host_config_path,
    load_settings,
};

use crate::terminal::{TerminalSink, TerminalWorkspace};

const PUMP_INTERVAL: Duration = Duration::from_millis(100);

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // Without a log file, prefer no logs over interleaving them with findings.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(config_path) = host_config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("ruff-host.log"));
    }

    candidates.push(PathBuf::from(".ruff-host").join("logs").join("ruff-host.log"));

    candidates
}

#[derive(Debug, PartialEq, Eq)]
struct Args {
    command: Option<HostCommand>,
    roots: Vec<PathBuf>,
}

impl Args {
    /// First argument is a command when it names one; everything else is a root.
    fn parse(mut raw: Vec<String>) -> Self {
        let command = raw
            .first()
            .and_then(|first| first.parse::<HostCommand>().ok());
        if command.is_some() {
            raw.remove(0);
        }
        let mut roots: Vec<PathBuf> = raw.into_iter().map(PathBuf::from).collect();
        if roots.is_empty() {
            roots.push(PathBuf::from("."));
        }
        Self { command, roots }
    }
}

/// A line typed at the interactive prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    Help,
    Status,
    File(&'a str),
    Host(HostCommand),
    Unknown(&'a str),
    Empty,
}

impl<'a> Input<'a> {
    fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        let (head, rest) = raw
            .split_once(char::is_whitespace)
            .map_or((raw, ""), |(head, rest)| (head, rest.trim()));

        match head {
            "" => Input::Empty,
            "q" | "quit" | "exit" => Input::Quit,
            "help" => Input::Help,
            "status" => Input::Status,
            "file" if !rest.is_empty() => Input::File(rest),
            other => other.parse().map_or(Input::Unknown(other), Input::Host),
        }
    }
}

fn help_text() -> String {
    format!("{}\nAlso: file <path>, status, help, quit", command_help_summary())
}

fn print_snapshot(snapshot: &DiagnosticsSnapshot) {
    for (_, items) in snapshot.files() {
        for item in items {
            println!("{}", item.display_line());
        }
    }
    if !snapshot.is_empty() {
        println!("live: {}", snapshot.status_string());
    }
}

async fn send_file(host: &mut RuffHost, path: &Path) {
    let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => host.on_file_changed(&path, &text).await,
        Err(e) => eprintln!("Cannot read {}: {e}", path.display()),
    }
}

async fn run_interactive(host: &mut RuffHost) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticks = tokio::time::interval(PUMP_INTERVAL);
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    eprintln!("{}", help_text());
    loop {
        tokio::select! {
            _ = ticks.tick() => {
                if host.pump() > 0 {
                    print_snapshot(&host.snapshot());
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match Input::parse(&line) {
                    Input::Quit => break,
                    Input::Help => eprintln!("{}", help_text()),
                    Input::Status => {
                        let snapshot = host.snapshot();
                        if snapshot.is_empty() {
                            println!("live: no diagnostics");
                        } else {
                            print_snapshot(&snapshot);
                        }
                    }
                    Input::File(path) => send_file(host, Path::new(path)).await,
                    Input::Host(command) => host.execute(command).await,
                    Input::Unknown(other) => eprintln!("Unknown command: {other}. {}", help_text()),
                    Input::Empty => {}
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse(env::args().skip(1).collect());
    for root in &args.roots {
        if !root.exists() {
            bail!("no such project root: {}", root.display());
        }
    }
    let roots = args
        .roots
        .iter()
        .map(|root| fs::canonicalize(root).unwrap_or_else(|_| root.clone()))
        .collect();

    let config_path = host_config_path();
    let settings = load_settings(config_path.as_deref());

    let workspace = Arc::new(TerminalWorkspace::new(roots));
    let mut host = RuffHost::start(settings, config_path, workspace, Arc::new(TerminalSink)).await;

    let result = match args.command {
        Some(command) => {
            host.execute(command).await;
            host.pump();
            Ok(())
        }
        None => run_interactive(&mut host).await,
    };

    host.dispose().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn args_default_to_current_dir() {
        assert_eq!(
            Args::parse(Vec::new()),
            Args {
                command: None,
                roots: vec![PathBuf::from(".")]
            }
        );
    }

    #[test]
    fn args_command_then_roots() {
        assert_eq!(
            Args::parse(strings(&["lint-project", "src", "tests"])),
            Args {
                command: Some(HostCommand::LintProject),
                roots: vec![PathBuf::from("src"), PathBuf::from("tests")]
            }
        );
    }

    #[test]
    fn args_without_command_are_roots() {
        let args = Args::parse(strings(&["src"]));
        assert!(args.command.is_none());
        assert_eq!(args.roots, vec![PathBuf::from("src")]);
    }

    #[test]
    fn input_parse() {
        assert_eq!(Input::parse("quit"), Input::Quit);
        assert_eq!(Input::parse("  q "), Input::Quit);
        assert_eq!(Input::parse("status"), Input::Status);
        assert_eq!(Input::parse("file src/app.py"), Input::File("src/app.py"));
        assert_eq!(Input::parse("file"), Input::Unknown("file"));
        assert_eq!(
            Input::parse("toggle-noqa"),
            Input::Host(HostCommand::ToggleNoqa)
        );
        assert_eq!(Input::parse("lint"), Input::Unknown("lint"));
        assert_eq!(Input::parse(""), Input::Empty);
    }

    #[test]
    fn help_mentions_quit() {
        assert!(help_text().contains("quit"));
        assert!(help_text().contains("open-global-config"));
    }
}
