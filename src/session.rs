//! Owned screen state: the account list and the feed.
//!
//! All lifecycle transitions go through [`Session`] so the rules (one
//! connect at a time, disconnect purges the account's updates) live in one
//! place and can be tested without a terminal.

use secrecy::SecretString;
use thiserror::Error;

use crate::account::{Account, ConnectionState};
use crate::feed;
use crate::provider::Provider;
use crate::source::{FetchTarget, Update};

/// Why a requested transition was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No account with id {0}")]
    UnknownAccount(String),
    #[error("{0} is already connected")]
    AlreadyConnected(String),
    #[error("Another authorization is already in progress")]
    ConnectInProgress,
}

pub struct Session {
    accounts: Vec<Account>,
    feed: Vec<Update>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// One disconnected slot per provider, and an empty feed.
    pub fn new() -> Self {
        Self {
            accounts: vec![
                Account::new("fb1", Provider::Facebook),
                Account::new("ig1", Provider::Instagram),
            ],
            feed: Vec::new(),
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn feed(&self) -> &[Update] {
        &self.feed
    }

    pub fn account(&self, account_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == account_id)
    }

    fn account_mut(&mut self, account_id: &str) -> Result<&mut Account, SessionError> {
        self.accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| SessionError::UnknownAccount(account_id.to_string()))
    }

    pub fn is_connecting(&self) -> bool {
        self.accounts
            .iter()
            .any(|a| a.state() == ConnectionState::Connecting)
    }

    /// Move `account_id` into [`ConnectionState::Connecting`].
    ///
    /// Returns the provider to authorize against.
    pub fn begin_connect(&mut self, account_id: &str) -> Result<Provider, SessionError> {
        if self.is_connecting() {
            return Err(SessionError::ConnectInProgress);
        }
        let account = self.account_mut(account_id)?;
        if account.state() == ConnectionState::Connected {
            return Err(SessionError::AlreadyConnected(account.name.clone()));
        }
        account.mark_connecting();
        Ok(account.provider)
    }

    /// Store the credential and return the target for the initial fetch.
    pub fn complete_connect(
        &mut self,
        account_id: &str,
        token: SecretString,
        display_name: Option<String>,
    ) -> Result<FetchTarget, SessionError> {
        let account = self.account_mut(account_id)?;
        account.connect(token, display_name);
        account
            .fetch_target()
            .ok_or_else(|| SessionError::UnknownAccount(account_id.to_string()))
    }

    /// Authorization failed or was cancelled; fall back to disconnected.
    pub fn abort_connect(&mut self, account_id: &str) {
        if let Ok(account) = self.account_mut(account_id) {
            if account.state() == ConnectionState::Connecting {
                account.disconnect();
            }
        }
    }

    /// Clear the account's credential and purge its updates from the feed.
    ///
    /// Returns how many updates were removed.
    pub fn disconnect(&mut self, account_id: &str) -> Result<usize, SessionError> {
        self.account_mut(account_id)?.disconnect();
        let before = self.feed.len();
        self.feed = feed::without_account(&self.feed, account_id);
        Ok(before - self.feed.len())
    }

    /// Merge a fetched batch into the feed; returns how many entries were new.
    pub fn apply_updates(&mut self, batch: Vec<Update>) -> usize {
        let previous: std::collections::HashSet<&str> =
            self.feed.iter().map(|u| u.id.as_str()).collect();
        let merged = feed::merge(&self.feed, batch);
        let added = merged
            .iter()
            .filter(|u| !previous.contains(u.id.as_str()))
            .count();
        self.feed = merged;
        added
    }

    /// Fetch targets for every connected account, in list order.
    pub fn fetch_targets(&self) -> Vec<FetchTarget> {
        self.accounts.iter().filter_map(Account::fetch_target).collect()
    }
}
