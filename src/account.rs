//! Connected (or connectable) third-party accounts.

use secrecy::{ExposeSecret, SecretString};

use crate::provider::Provider;
use crate::source::FetchTarget;

/// Where an account is in its connect/disconnect lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Authorization is in flight.
    Connecting,
    Connected,
}

/// A single account slot.
///
/// The access token is only present while the account is connected.
#[derive(Debug)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub provider: Provider,
    token: Option<SecretString>,
    state: ConnectionState,
}

impl Account {
    /// A fresh, disconnected account named after its provider.
    pub fn new(id: impl Into<String>, provider: Provider) -> Self {
        Self {
            id: id.into(),
            name: provider.label().to_string(),
            provider,
            token: None,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.token.is_some()
    }

    pub(crate) fn mark_connecting(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    pub(crate) fn connect(&mut self, token: SecretString, name: Option<String>) {
        if let Some(name) = name {
            self.name = name;
        }
        self.token = Some(token);
        self.state = ConnectionState::Connected;
    }

    /// Clear the credential and return to [`ConnectionState::Disconnected`].
    pub(crate) fn disconnect(&mut self) {
        self.token = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Snapshot what the worker needs to fetch for this account.
    ///
    /// `None` unless the account is connected.
    pub fn fetch_target(&self) -> Option<FetchTarget> {
        if !self.is_connected() {
            return None;
        }
        let token = self.token.as_ref()?;
        Some(FetchTarget {
            account_id: self.id.clone(),
            account_name: self.name.clone(),
            provider: self.provider,
            token: SecretString::from(token.expose_secret().to_owned()),
        })
    }
}
