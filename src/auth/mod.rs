//! OAuth account connection.
//!
//! The browser round-trip itself sits behind the [`Authorizer`] trait: given
//! an [`AuthRequest`] it prompts the user and hands back an [`AuthGrant`] or
//! an [`AuthError`]. [`Connector`] wraps it with the checks that happen
//! before any network activity and with what happens to the grant after.

mod loopback;

pub use loopback::LoopbackAuthorizer;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use crate::config::Config;
use crate::provider::{Provider, ResponseType};
use crate::source::FacebookSource;

/// Everything needed to send the user to a provider's consent screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub provider: Provider,
    pub client_id: String,
    pub authorize_url: String,
    pub scopes: &'static [&'static str],
    pub response_type: ResponseType,
}

/// What the provider handed back on the redirect.
#[derive(Debug)]
pub enum AuthGrant {
    /// Bearer token from the implicit flow.
    Token(SecretString),
    /// Authorization code that still needs a server-side exchange.
    Code(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization was cancelled")]
    Cancelled,
    #[error("Timed out waiting for the authorization redirect")]
    TimedOut,
    #[error("Provider refused authorization: {0}")]
    Denied(String),
    #[error("Redirect carried an unexpected state parameter")]
    StateMismatch,
    #[error("I/O error during authorization: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid authorization URL: {0}")]
    Url(#[from] url::ParseError),
}

impl AuthError {
    /// Whether the user backed out rather than something going wrong.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AuthError::Cancelled | AuthError::TimedOut)
    }
}

/// Prompts the user to authorize and captures the result.
///
/// Only one authorization runs at a time; implementations may assume no
/// concurrent calls.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, request: &AuthRequest) -> Result<AuthGrant, AuthError>;
}

#[derive(Debug, Error)]
pub enum ConnectError {
    /// Client id missing or still the sample placeholder.
    #[error("{0} is not configured")]
    NotConfigured(Provider),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Result of a connect attempt that did not fail outright.
#[derive(Debug)]
pub enum ConnectOutcome {
    Connected {
        token: SecretString,
        /// Profile name, when the provider offered one.
        display_name: Option<String>,
    },
    /// A code came back but turning it into a token needs a backend.
    ExchangeUnsupported,
}

pub struct Connector {
    authorizer: Box<dyn Authorizer>,
    profiles: FacebookSource,
    config: Config,
}

impl Connector {
    pub fn new(authorizer: Box<dyn Authorizer>, profiles: FacebookSource, config: Config) -> Self {
        Self {
            authorizer,
            profiles,
            config,
        }
    }

    /// Build the authorization request, refusing unconfigured providers.
    pub fn request_for(&self, provider: Provider) -> Result<AuthRequest, ConnectError> {
        let client_id = self
            .config
            .client_id(provider)
            .ok_or(ConnectError::NotConfigured(provider))?;

        Ok(AuthRequest {
            provider,
            client_id: client_id.to_string(),
            authorize_url: self.config.provider(provider).authorize_url.clone(),
            scopes: provider.scopes(),
            response_type: provider.response_type(),
        })
    }

    /// Run the full connect flow for `provider`.
    pub async fn connect(&self, provider: Provider) -> Result<ConnectOutcome, ConnectError> {
        let request = self.request_for(provider)?;

        match self.authorizer.authorize(&request).await? {
            AuthGrant::Token(token) => {
                let display_name = match provider {
                    Provider::Facebook => self.lookup_profile_name(&token).await,
                    Provider::Instagram => None,
                };
                tracing::info!(provider = %provider, "Account authorized");
                Ok(ConnectOutcome::Connected {
                    token,
                    display_name,
                })
            }
            AuthGrant::Code(_) => {
                tracing::info!(
                    provider = %provider,
                    "Received authorization code; token exchange needs a server"
                );
                Ok(ConnectOutcome::ExchangeUnsupported)
            }
        }
    }

    async fn lookup_profile_name(&self, token: &SecretString) -> Option<String> {
        match self.profiles.profile_name(token).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "Profile lookup failed, keeping default account name");
                None
            }
        }
    }
}
