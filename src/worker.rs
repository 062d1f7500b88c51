//! Background network worker.
//!
//! Runs on a dedicated thread with its own single-threaded tokio runtime.
//! Commands from the UI thread are handled strictly one after another, so at
//! most one authorization or refresh is in flight at any time. Each
//! completed step is reported back over an [`mpsc`] channel and applied by
//! the UI thread as a whole.
//!
//! ## For contributors
//!
//! Refresh deliberately fetches accounts sequentially. If fan-out ever
//! matters, the loop in [`Worker::refresh`] is the only place to change.

use std::sync::mpsc;
use std::thread;

use secrecy::SecretString;

use crate::auth::{ConnectError, ConnectOutcome, Connector};
use crate::provider::Provider;
use crate::source::{fetch_updates, FetchTarget, Sources, Update};

/// Work requested by the UI thread.
#[derive(Debug)]
pub enum Command {
    /// Authorize `account_id` against `provider`.
    Connect {
        account_id: String,
        provider: Provider,
    },
    /// Fetch recent items for each target, in order.
    Refresh(Vec<FetchTarget>),
}

/// A blocking, user-visible alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Messages sent from the worker thread to the UI thread.
#[derive(Debug)]
pub enum WorkerMsg {
    /// Authorization succeeded.
    Connected {
        account_id: String,
        token: SecretString,
        display_name: Option<String>,
    },
    /// Authorization did not produce a usable token.
    ConnectFailed { account_id: String, notice: Notice },
    RefreshStarted { accounts: usize },
    /// One account's batch; empty when its fetch failed.
    Updates {
        account_id: String,
        updates: Vec<Update>,
    },
    RefreshFinished,
}

pub struct Worker {
    connector: Connector,
    sources: Sources,
}

impl Worker {
    pub fn new(connector: Connector, sources: Sources) -> Self {
        Self { connector, sources }
    }

    /// Handle one command, reporting progress on `tx`.
    pub async fn handle(&self, command: Command, tx: &mpsc::Sender<WorkerMsg>) {
        match command {
            Command::Connect {
                account_id,
                provider,
            } => self.connect(account_id, provider, tx).await,
            Command::Refresh(targets) => self.refresh(targets, tx).await,
        }
    }

    async fn connect(&self, account_id: String, provider: Provider, tx: &mpsc::Sender<WorkerMsg>) {
        let msg = match self.connector.connect(provider).await {
            Ok(ConnectOutcome::Connected {
                token,
                display_name,
            }) => WorkerMsg::Connected {
                account_id,
                token,
                display_name,
            },
            Ok(ConnectOutcome::ExchangeUnsupported) => WorkerMsg::ConnectFailed {
                account_id,
                notice: Notice::new(
                    "Note",
                    format!(
                        "{provider} token exchange requires a backend server. \
                         Please implement the token exchange on your server."
                    ),
                ),
            },
            Err(e) => {
                tracing::warn!(account = %account_id, provider = %provider, error = %e, "Connection failed");
                WorkerMsg::ConnectFailed {
                    account_id,
                    notice: connect_error_notice(provider, &e),
                }
            }
        };
        send(tx, msg);
    }

    async fn refresh(&self, targets: Vec<FetchTarget>, tx: &mpsc::Sender<WorkerMsg>) {
        send(
            tx,
            WorkerMsg::RefreshStarted {
                accounts: targets.len(),
            },
        );
        for target in &targets {
            let source = self.sources.for_provider(target.provider);
            let updates = fetch_updates(source, target).await;
            send(
                tx,
                WorkerMsg::Updates {
                    account_id: target.account_id.clone(),
                    updates,
                },
            );
        }
        send(tx, WorkerMsg::RefreshFinished);
    }
}

fn send(tx: &mpsc::Sender<WorkerMsg>, msg: WorkerMsg) {
    // A closed channel means the UI has exited; nothing left to report to.
    if tx.send(msg).is_err() {
        tracing::debug!("UI receiver dropped, discarding worker message");
    }
}

/// Turn a connect failure into the alert shown to the user.
pub fn connect_error_notice(provider: Provider, error: &ConnectError) -> Notice {
    match error {
        ConnectError::NotConfigured(_) => Notice::new(
            "Configuration Required",
            format!(
                "Please set up your {provider} {} in the [{}] section of the config file. \
                 Visit https://developers.facebook.com/ to create an app.",
                provider.client_id_label(),
                provider.label().to_lowercase(),
            ),
        ),
        ConnectError::Auth(auth) if auth.is_cancellation() => Notice::new(
            "Cancelled",
            format!("{provider} authorization was cancelled. The account was not connected."),
        ),
        ConnectError::Auth(_) => Notice::new(
            "Error",
            format!("Failed to connect {provider} account. Please try again."),
        ),
    }
}

/// Handles for talking to a running worker.
pub struct WorkerHandle {
    pub commands: mpsc::Sender<Command>,
    pub messages: mpsc::Receiver<WorkerMsg>,
}

/// Spawn the worker thread.
///
/// The thread exits once the command sender is dropped.
pub fn spawn(worker: Worker) -> std::io::Result<WorkerHandle> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
    let (msg_tx, msg_rx) = mpsc::channel();

    thread::Builder::new()
        .name("pulse-worker".into())
        .spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                runtime.block_on(worker.handle(command, &msg_tx));
            }
            tracing::debug!("Command channel closed, worker exiting");
        })?;

    Ok(WorkerHandle {
        commands: cmd_tx,
        messages: msg_rx,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
