//! sortviz CLI - Watch a remote sort service work through your numbers
//!
//! Usage:
//!   sortviz [OPTIONS] [ELEMENTS]
//!
//! Example:
//!   sortviz "5,3,1,4" --algorithm insertion
//!   sortviz --url http://sorter:8080 --list

use anyhow::{Context, Result};
use colored::Colorize;
use sortviz::{
    AlgorithmId, ClientConfig, ClientError, Session, SessionError, SessionListener, SortTrace,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

fn print_usage() {
    eprintln!(
        r#"
{} - Step through a sorting algorithm run by a remote sort service

{}
    sortviz [OPTIONS] [ELEMENTS]

{}
    [ELEMENTS]    Comma separated numbers; omit for interactive mode

{}
    -c, --config <FILE>         TOML config file
    -u, --url <URL>             Sort service base URL (overrides config)
    -a, --algorithm <ID>        Algorithm to use (default: bubble)
    -l, --list                  Print the algorithms the server supports and exit
    -v, --verbose               Log requests
    -vv                         Extra verbose (debug logging)
    -h, --help                  Print this help message

{}
    <numbers>                   Replace the input and submit it
    :algo <ID>                  Select an algorithm
    :list                       Show supported algorithms
    :refresh                    Ask the server for supported algorithms again
    :quit                       Exit
"#,
        "sortviz".bold(),
        "USAGE:".bold(),
        "ARGS:".bold(),
        "OPTIONS:".bold(),
        "INTERACTIVE COMMANDS:".bold(),
    );
}

struct CliArgs {
    config: Option<PathBuf>,
    url: Option<String>,
    algorithm: Option<String>,
    elements: Option<String>,
    list: bool,
    verbose: u8, // 0=warnings, 1=info, 2=debug
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        std::process::exit(0);
    }

    let mut config = None;
    let mut url = None;
    let mut algorithm = None;
    let mut elements = None;
    let mut list = false;
    let mut verbose: u8 = 0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config = Some(PathBuf::from(&args[i]));
                }
            }
            "--url" | "-u" => {
                i += 1;
                if i < args.len() {
                    url = Some(args[i].clone());
                }
            }
            "--algorithm" | "-a" => {
                i += 1;
                if i < args.len() {
                    algorithm = Some(args[i].clone());
                }
            }
            "--list" | "-l" => {
                list = true;
            }
            "--verbose" | "-v" => {
                verbose = verbose.max(1);
            }
            "-vv" => {
                verbose = 2;
            }
            other => {
                elements = Some(other.to_string());
            }
        }
        i += 1;
    }

    CliArgs {
        config,
        url,
        algorithm,
        elements,
        list,
        verbose,
    }
}

/// Reports session failures on stderr
struct TerminalListener;

impl SessionListener for TerminalListener {
    fn capability_fetch_failed(&self, error: &ClientError) {
        eprintln!(
            "{} could not fetch supported algorithms ({} error): {}",
            "Warning:".yellow().bold(),
            error.kind(),
            error
        );
    }

    fn submit_failed(&self, error: &SessionError) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn print_trace(trace: &SortTrace) {
    if trace.is_empty() {
        println!("{}", "(server returned no steps)".dimmed());
        return;
    }

    let width = trace
        .steps
        .iter()
        .flat_map(|s| s.list.iter())
        .map(|v| format_value(*v).len())
        .max()
        .unwrap_or(1);

    let mut previous: Option<&[f64]> = None;
    for step in &trace.steps {
        let cells: Vec<String> = step
            .list
            .iter()
            .enumerate()
            .map(|(idx, value)| {
                let cell = format!("{:>width$}", format_value(*value), width = width);
                let moved = previous.is_some_and(|prev| prev.get(idx) != Some(value));
                if moved {
                    cell.yellow().bold().to_string()
                } else {
                    cell
                }
            })
            .collect();
        println!("{} {}", format!("{:>4} │", step.id).dimmed(), cells.join("  "));
        previous = Some(step.list.as_slice());
    }
}

fn print_supported(session: &Session) {
    let supported = session.supported();
    let selected = session.algorithm();
    if supported.is_empty() {
        println!("{}", "(server advertised no algorithms)".dimmed());
        return;
    }
    for id in supported {
        if Some(&id) == selected.as_ref() {
            println!("  {} {}", "*".green(), id.as_str().green().bold());
        } else {
            println!("    {}", id);
        }
    }
}

async fn submit_and_render(session: &Session, input: &str) -> bool {
    session.set_input_text(input);
    match session.submit().await {
        Ok(_) => {
            print_trace(&session.trace());
            true
        }
        // Already reported by the listener
        Err(_) => false,
    }
}

async fn interactive(session: &Session) -> Result<()> {
    let stdin = std::io::stdin();
    loop {
        let algorithm = session
            .algorithm()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        eprint!("{} ", format!("[{}]>", algorithm).cyan());
        std::io::stderr().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => continue,
            (":quit", _) | (":q", _) => break,
            (":list", _) => print_supported(session),
            (":refresh", _) => {
                if session.initialize().await.is_ok() {
                    print_supported(session);
                }
            }
            (":algo", id) => {
                let id = id.trim();
                if !session.set_algorithm(id) {
                    eprintln!(
                        "{} '{}' is not supported; try :list",
                        "Error:".red().bold(),
                        id
                    );
                }
            }
            _ => {
                submit_and_render(session, line).await;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &args.url {
        config.base_url = url.clone();
    }
    debug!(base_url = %config.base_url, "Using sort service");

    let session = Session::from_config(&config)
        .context("Failed to create HTTP client")?
        .with_listener(Arc::new(TerminalListener));

    // A failed fetch is reported by the listener and leaves no choices
    let _ = session.initialize().await;

    if args.list {
        print_supported(&session);
        return Ok(());
    }

    if let Some(algorithm) = &args.algorithm {
        if !session.set_algorithm(AlgorithmId::new(algorithm.as_str())) {
            eprintln!(
                "{} '{}' is not supported by {}",
                "Error:".red().bold(),
                algorithm,
                config.base_url
            );
            print_supported(&session);
            std::process::exit(1);
        }
    }

    match &args.elements {
        Some(elements) => {
            if !submit_and_render(&session, elements).await {
                std::process::exit(1);
            }
        }
        None => interactive(&session).await?,
    }

    Ok(())
}
