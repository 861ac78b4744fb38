use anyhow::{Context, Result};
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::process::ExitCode;
use tokio::sync::mpsc;
use webscout::api::logging::init_tracing;
use webscout::config::Config;
use webscout::ui::ProgressPrinter;
use webscout::QuerySession;

/// Ask the scraping agent a question and follow its progress.
#[derive(Debug, Parser)]
#[command(name = "scout", version)]
struct Cli {
    /// Query to submit. Without it, queries are read line by line from stdin.
    query: Option<String>,

    /// Backend base URL (overrides WEBSCOUT_API_URL).
    #[arg(long)]
    api_url: Option<String>,

    /// Parse a final line that is not newline-terminated instead of dropping it.
    #[arg(long)]
    flush_trailing_line: bool,

    /// Treat a stream without a complete/error event as a failure.
    #[arg(long)]
    require_terminal_event: bool,

    /// Print the final state as JSON instead of the live progress log.
    #[arg(long)]
    json: bool,

    /// Check that the backend is up and exit.
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::load()?;
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.trim().to_string();
        }
        config.flush_trailing_line |= self.flush_trailing_line;
        config.require_terminal_event |= self.require_terminal_event;
        config.validate()?;
        Ok(config)
    }
}

/// Ctrl-C presses, fed by the one signal listener installed for the process.
type Interrupts = mpsc::UnboundedReceiver<()>;

/// Lines typed at the prompt. Closed at EOF.
type InputLines = mpsc::UnboundedReceiver<std::io::Result<String>>;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing()?;
    let config = cli.config()?;

    let mut session = QuerySession::from_config(&config);

    if cli.check {
        let message = session
            .client()
            .health_check()
            .await
            .with_context(|| format!("backend at '{}' is not healthy", config.api_url))?;
        println!("{message}");
        return Ok(ExitCode::SUCCESS);
    }

    if !cli.json {
        let colors_enabled = std::io::stdout().is_terminal();
        session.add_observer(ProgressPrinter::new(std::io::stdout(), colors_enabled));
    }

    let mut interrupts = listen_for_interrupts().context("failed to install Ctrl-C handler")?;
    let failed = match &cli.query {
        Some(query) => run_one(&mut session, query, &mut interrupts, cli.json).await?,
        None => {
            let mut input = read_stdin_lines();
            run_interactive(&mut session, &mut input, &mut interrupts, cli.json).await?
        }
    };

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Installs the SIGINT handler once. Tokio keeps it for the rest of the
/// process, so every caller has to react to what arrives here.
fn listen_for_interrupts() -> std::io::Result<Interrupts> {
    #[cfg(unix)]
    let mut signals = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    #[cfg(windows)]
    let mut signals = tokio::signal::windows::ctrl_c()?;

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while signals.recv().await.is_some() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    Ok(rx)
}

/// Reads stdin on a plain thread. A blocking read cannot be cancelled, and
/// the thread must not hold up the runtime when the prompt is interrupted.
fn read_stdin_lines() -> InputLines {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Returns whether the query ended with an error. An interrupt cancels the
/// query, which then finishes through the normal update path.
async fn run_one(
    session: &mut QuerySession,
    query: &str,
    interrupts: &mut Interrupts,
    json: bool,
) -> Result<bool> {
    session.submit(query)?;

    loop {
        tokio::select! {
            update = session.next_update() => {
                if update.is_none() {
                    break;
                }
            }
            Some(()) = interrupts.recv() => {
                tracing::info!("interrupted, cancelling query");
                session.cancel();
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&session.view())?);
    }
    Ok(session.state().error.is_some())
}

/// Prompt loop. Ends at EOF or on an interrupt while waiting for input.
async fn run_interactive(
    session: &mut QuerySession,
    input: &mut InputLines,
    interrupts: &mut Interrupts,
    json: bool,
) -> Result<bool> {
    let mut any_failed = false;

    loop {
        print!("Your Query: ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            biased;
            Some(()) = interrupts.recv() => None,
            line = input.recv() => line.transpose()?,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        any_failed |= run_one(session, query, interrupts, json).await?;
        println!();
    }

    Ok(any_failed)
}
