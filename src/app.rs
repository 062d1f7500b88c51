use ratatui::widgets::ListState;

use crate::account::ConnectionState;
use crate::session::Session;
use crate::worker::{Command, Notice, WorkerMsg};

/// Which list the navigation keys act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Accounts,
    Feed,
}

pub struct App {
    /// Accounts and the de-duplicated feed.
    pub session: Session,
    pub focus: Focus,
    /// Selection state for the account panel.
    pub accounts_state: ListState,
    /// Selection state for the feed list.
    pub feed_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last status message.
    pub status: String,
    /// Alert that must be dismissed before anything else happens.
    pub notice: Option<Notice>,
    /// Account awaiting a y/n answer to "disconnect?".
    pub pending_disconnect: Option<String>,
    /// Whether a refresh is running on the worker.
    pub refreshing: bool,
    /// Commands for the worker, drained by the main loop.
    outbox: Vec<Command>,
}

impl App {
    pub fn new() -> Self {
        let mut accounts_state = ListState::default();
        accounts_state.select(Some(0));
        Self {
            session: Session::new(),
            focus: Focus::Accounts,
            accounts_state,
            feed_state: ListState::default(),
            quit: false,
            status: "Connect an account to see updates".into(),
            notice: None,
            pending_disconnect: None,
            refreshing: false,
            outbox: Vec::new(),
        }
    }

    /// Hand queued worker commands to the caller.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.outbox)
    }

    fn selected_account_id(&self) -> Option<String> {
        let index = self.accounts_state.selected()?;
        self.session.accounts().get(index).map(|a| a.id.clone())
    }

    // -- account lifecycle ---------------------------------------------------

    /// Connect the selected account, or offer to disconnect it if it is
    /// already connected.
    pub fn activate_account(&mut self) {
        let Some(account_id) = self.selected_account_id() else {
            return;
        };
        match self.session.account(&account_id).map(|a| a.state()) {
            Some(ConnectionState::Connected) => self.request_disconnect(),
            Some(ConnectionState::Connecting) => {
                self.status = "Authorization already in progress".into();
            }
            Some(ConnectionState::Disconnected) => self.connect(&account_id),
            None => {}
        }
    }

    fn connect(&mut self, account_id: &str) {
        match self.session.begin_connect(account_id) {
            Ok(provider) => {
                tracing::info!(account = %account_id, provider = %provider, "Starting authorization");
                self.status = format!("Connecting {provider}… finish in your browser");
                self.outbox.push(Command::Connect {
                    account_id: account_id.to_string(),
                    provider,
                });
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    /// Ask for confirmation before disconnecting the selected account.
    pub fn request_disconnect(&mut self) {
        let Some(account_id) = self.selected_account_id() else {
            return;
        };
        let Some(account) = self.session.account(&account_id) else {
            return;
        };
        if account.state() != ConnectionState::Connected {
            self.status = format!("{} is not connected", account.name);
            return;
        }
        self.status = format!("Disconnect {}? (y/n)", account.name);
        self.pending_disconnect = Some(account_id);
    }

    /// Answer the pending disconnect prompt.
    pub fn confirm_disconnect(&mut self, confirmed: bool) {
        let Some(account_id) = self.pending_disconnect.take() else {
            return;
        };
        if !confirmed {
            self.status = "Disconnect cancelled".into();
            return;
        }
        match self.session.disconnect(&account_id) {
            Ok(removed) => {
                tracing::info!(account = %account_id, removed, "Account disconnected");
                self.status = format!("Disconnected, removed {removed} updates");
                self.clamp_feed_selection();
            }
            Err(e) => self.status = e.to_string(),
        }
    }

    /// Queue a sequential refresh of every connected account.
    pub fn request_refresh(&mut self) {
        let targets = self.session.fetch_targets();
        if targets.is_empty() {
            self.status = "No connected accounts to refresh".into();
            return;
        }
        self.status = if self.session.is_connecting() {
            "Refresh queued behind authorization; finish it in your browser".into()
        } else {
            "Refreshing…".into()
        };
        self.outbox.push(Command::Refresh(targets));
    }

    // -- worker messages -----------------------------------------------------

    pub fn handle_worker_msg(&mut self, msg: WorkerMsg) {
        match msg {
            WorkerMsg::Connected {
                account_id,
                token,
                display_name,
            } => match self.session.complete_connect(&account_id, token, display_name) {
                Ok(target) => {
                    self.status = format!("Connected {}", target.account_name);
                    self.outbox.push(Command::Refresh(vec![target]));
                }
                Err(e) => self.status = e.to_string(),
            },
            WorkerMsg::ConnectFailed { account_id, notice } => {
                self.session.abort_connect(&account_id);
                self.status = notice.title.clone();
                self.notice = Some(notice);
            }
            WorkerMsg::RefreshStarted { accounts } => {
                self.refreshing = true;
                self.status = format!("Refreshing {accounts} account(s)…");
            }
            WorkerMsg::Updates {
                account_id,
                updates,
            } => {
                let fetched = updates.len();
                let added = self.session.apply_updates(updates);
                tracing::debug!(account = %account_id, fetched, added, "Merged updates");
                self.status = format!("Fetched {fetched} items, {added} new");
                if self.feed_state.selected().is_none() && !self.session.feed().is_empty() {
                    self.feed_state.select(Some(0));
                }
                self.clamp_feed_selection();
            }
            WorkerMsg::RefreshFinished => self.refreshing = false,
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Link of the selected update, if the feed is focused and it has one.
    pub fn selected_link(&self) -> Option<&str> {
        if self.focus != Focus::Feed {
            return None;
        }
        let index = self.feed_state.selected()?;
        self.session.feed().get(index)?.link.as_deref()
    }

    // -- navigation ----------------------------------------------------------

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Accounts => Focus::Feed,
            Focus::Feed => Focus::Accounts,
        };
        if self.focus == Focus::Feed && self.feed_state.selected().is_none() {
            self.select_first();
        }
    }

    fn focused(&mut self) -> (&mut ListState, usize) {
        match self.focus {
            Focus::Accounts => (&mut self.accounts_state, self.session.accounts().len()),
            Focus::Feed => (&mut self.feed_state, self.session.feed().len()),
        }
    }

    fn clamp_feed_selection(&mut self) {
        let len = self.session.feed().len();
        match self.feed_state.selected() {
            _ if len == 0 => self.feed_state.select(None),
            Some(i) if i >= len => self.feed_state.select(Some(len - 1)),
            _ => {}
        }
    }

    pub fn select_next(&mut self) {
        let (state, len) = self.focused();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        let (state, len) = self.focused();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        let (state, len) = self.focused();
        if len > 0 {
            state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        let (state, len) = self.focused();
        if len > 0 {
            state.select(Some(len - 1));
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
