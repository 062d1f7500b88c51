//! Provider data sources.
//!
//! This module defines the [`UpdateSource`] trait and the common [`Update`]
//! type. Concrete provider implementations live in sub-modules.
//!
//! ## For contributors — adding a provider
//!
//! 1. Add a variant to [`Provider`].
//! 2. Create a file in this directory with typed payload structs (all fields
//!    optional) and a pure `map_*` function turning them into [`Update`]s.
//! 3. Implement [`UpdateSource`] for it and add it to [`Sources`].
//!
//! The worker, the feed merger and the UI are all provider-agnostic.

mod facebook;
mod instagram;
mod update;

pub use facebook::FacebookSource;
pub use instagram::InstagramSource;
pub use update::{parse_timestamp, relative_time, Update};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::provider::Provider;

/// Errors raised while pulling a provider's recent items.
///
/// Callers on the refresh path never see these: [`fetch_updates`] logs them
/// and contributes an empty batch instead.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, timeout)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Response with a non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body was not the JSON shape we expected
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The configured base URL could not be extended into an endpoint
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Everything a source needs to fetch on behalf of one connected account.
pub struct FetchTarget {
    pub account_id: String,
    pub account_name: String,
    pub provider: Provider,
    pub token: SecretString,
}

impl std::fmt::Debug for FetchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchTarget")
            .field("account_id", &self.account_id)
            .field("account_name", &self.account_name)
            .field("provider", &self.provider)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Trait that every provider source implements.
///
/// Sources are called from the worker thread, so they must be
/// [`Send`] + [`Sync`].
#[async_trait]
pub trait UpdateSource: Send + Sync {
    fn provider(&self) -> Provider;

    /// Fetch the account's most recent items as normalised [`Update`]s.
    async fn fetch(&self, target: &FetchTarget) -> Result<Vec<Update>, FetchError>;
}

/// Fetch updates for `target`, degrading any failure to an empty batch.
pub async fn fetch_updates(source: &dyn UpdateSource, target: &FetchTarget) -> Vec<Update> {
    match source.fetch(target).await {
        Ok(updates) => {
            tracing::debug!(
                account = %target.account_id,
                provider = %source.provider(),
                count = updates.len(),
                "Fetched updates"
            );
            updates
        }
        Err(e) => {
            tracing::warn!(
                account = %target.account_id,
                provider = %source.provider(),
                error = %e,
                "Failed to fetch updates"
            );
            Vec::new()
        }
    }
}

/// One source per provider, sharing a single HTTP client.
pub struct Sources {
    facebook: FacebookSource,
    instagram: InstagramSource,
}

impl Sources {
    pub fn new(facebook: FacebookSource, instagram: InstagramSource) -> Self {
        Self {
            facebook,
            instagram,
        }
    }

    pub fn for_provider(&self, provider: Provider) -> &dyn UpdateSource {
        match provider {
            Provider::Facebook => &self.facebook,
            Provider::Instagram => &self.instagram,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared Graph API plumbing
// ---------------------------------------------------------------------------

/// The `{"data": [...]}` envelope both Graph APIs wrap listings in.
///
/// Entries stay raw JSON until [`Listing::entries`] decodes them one by one,
/// so a single badly typed entry cannot sink the rest. A missing or `null`
/// `data` decodes as an empty listing.
#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    data: Option<Vec<serde_json::Value>>,
}

impl Listing {
    /// Decode every entry as `T`, skipping the ones that do not fit.
    fn entries<T: DeserializeOwned>(self) -> Vec<T> {
        self.data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| match serde_json::from_value(raw) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed listing entry");
                    None
                }
            })
            .collect()
    }
}

/// Append `path` to a configured base URL such as
/// `https://graph.facebook.com/v18.0`, keeping the version segment.
fn endpoint(base: &str, path: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

/// GET `url` with a bearer token and decode the JSON body.
async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: Url,
    token: &SecretString,
) -> Result<T, FetchError> {
    let response = client
        .get(url)
        .bearer_auth(token.expose_secret())
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
