//! pulse — connect social accounts and follow their updates in one feed.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐  WorkerMsg  ┌──────────┐  draw()  ┌──────────┐
//! │ worker.rs │ ──────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (thread)  │ ◄────────── │ (state)  │          │ (render) │
//! └───────────┘   Command   └──────────┘          └──────────┘
//!                                ▲
//!                                │ handle_key_event()
//!                           ┌──────────┐
//!                           │ input.rs │
//!                           └──────────┘
//! ```
//!
//! * **`auth/`** — the `Authorizer` trait, the loopback browser flow, and
//!   the `Connector` that turns a grant into a connected account.
//! * **`source/`** — the `UpdateSource` trait, the `Update` type and the
//!   per-provider Graph API mappings.
//! * **`feed`** — pure merge / purge functions over the update feed.
//! * **`session`** — accounts plus feed, and the lifecycle rules.
//! * **`worker`** — background thread running connects and refreshes one at
//!   a time.
//! * **`app`** / **`ui`** / **`input`** — terminal state, rendering, keys.
//! * **`main`** — wires everything together: parse args, load config, set
//!   up the terminal, and run the event loop.

mod account;
mod app;
mod auth;
mod config;
mod feed;
mod input;
mod provider;
mod session;
mod source;
mod ui;
mod worker;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use app::App;
use auth::{Connector, LoopbackAuthorizer};
use config::Config;
use source::{FacebookSource, InstagramSource, Sources};
use worker::Worker;

#[derive(Parser, Debug)]
#[command(name = "pulse", about = "Follow your social accounts' updates in one terminal feed")]
struct Args {
    /// Config file (default: ~/.config/pulse/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the loopback port used for the OAuth redirect
    #[arg(long, value_name = "PORT")]
    redirect_port: Option<u16>,

    /// Log file, filtered by RUST_LOG (default: ~/.config/pulse/pulse.log)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// Get the config directory (~/.config/pulse)
fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("pulse"))
}

/// Send tracing output to `path`.
///
/// The terminal is in the alternate screen for the whole run, so nothing
/// may be written to stdout or stderr. The returned guard flushes the
/// background writer when dropped.
fn init_logging(path: &Path) -> Result<WorkerGuard> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Log file path has no file name")?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen. When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Build the worker from configuration.
fn build_worker(config: Config) -> Result<Worker> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let facebook = FacebookSource::new(client.clone(), config.facebook.graph_url.clone());
    let instagram = InstagramSource::new(client, config.instagram.graph_url.clone());

    let authorizer = LoopbackAuthorizer::new(
        config.redirect_port,
        Duration::from_secs(config.auth_timeout_secs),
    );
    let connector = Connector::new(Box::new(authorizer), facebook.clone(), config);

    Ok(Worker::new(connector, Sources::new(facebook, instagram)))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let args = Args::parse();

    // -- logging (kept alive until exit so buffered lines are flushed) -------
    let log_path = match args.log_file {
        Some(path) => path,
        None => config_dir()?.join("pulse.log"),
    };
    let _log_guard = init_logging(&log_path)?;

    // -- configuration -------------------------------------------------------
    let config_path = match args.config {
        Some(path) => path,
        None => config_dir()?.join("config.toml"),
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(port) = args.redirect_port {
        config.redirect_port = port;
    }

    // -- start background worker ---------------------------------------------
    let handle = worker::spawn(build_worker(config)?).context("Failed to start worker thread")?;

    // -- terminal setup (RAII — Drop restores on exit or panic) --------------
    install_panic_hook();
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new();

    // -- main event loop -----------------------------------------------------
    // Each ~100 ms tick:
    //   1. Apply any messages from the worker.
    //   2. Forward queued commands to the worker.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(msg) = handle.messages.try_recv() {
            app.handle_worker_msg(msg);
        }

        for command in app.take_commands() {
            if handle.commands.send(command).is_err() {
                tracing::error!("Worker thread is gone, command dropped");
                app.status = "Background worker stopped; restart pulse".into();
            }
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    // `guard` is dropped here, restoring the terminal. Dropping `handle`
    // closes the command channel; an in-flight authorization is abandoned.
    Ok(())
}
