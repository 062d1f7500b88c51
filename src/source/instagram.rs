//! Instagram Graph API source.
//!
//! Maps `/me/media` entries onto [`Update`]s. Reaching this source needs a
//! token obtained through a server-side code exchange, which the connector
//! does not perform.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{endpoint, get_json, parse_timestamp, relative_time, FetchError, FetchTarget, Listing};
use super::{Update, UpdateSource};
use crate::provider::Provider;

const MEDIA_LIMIT: &str = "10";

/// A media object as returned by `/me/media`.
#[derive(Debug, Default, Deserialize)]
pub struct Media {
    pub id: Option<String>,
    pub caption: Option<String>,
    pub timestamp: Option<String>,
    pub permalink: Option<String>,
}

#[derive(Clone)]
pub struct InstagramSource {
    client: reqwest::Client,
    graph_url: String,
}

impl InstagramSource {
    pub fn new(client: reqwest::Client, graph_url: impl Into<String>) -> Self {
        Self {
            client,
            graph_url: graph_url.into(),
        }
    }

    pub fn map_media(media: Vec<Media>, target: &FetchTarget, now: DateTime<Utc>) -> Vec<Update> {
        media
            .into_iter()
            .filter_map(|item| {
                let id = item.id.filter(|id| !id.is_empty())?;
                let created = item.timestamp.as_deref().and_then(parse_timestamp);
                Some(Update {
                    id,
                    account_id: target.account_id.clone(),
                    account: target.account_name.clone(),
                    provider: Provider::Instagram,
                    message: item
                        .caption
                        .filter(|c| !c.trim().is_empty())
                        .unwrap_or_else(|| Provider::Instagram.default_message().to_string()),
                    time: relative_time(created, now),
                    link: item.permalink,
                })
            })
            .collect()
    }
}

#[async_trait]
impl UpdateSource for InstagramSource {
    fn provider(&self) -> Provider {
        Provider::Instagram
    }

    async fn fetch(&self, target: &FetchTarget) -> Result<Vec<Update>, FetchError> {
        let mut url = endpoint(&self.graph_url, "me/media")?;
        url.query_pairs_mut()
            .append_pair("fields", "id,caption,timestamp,permalink")
            .append_pair("limit", MEDIA_LIMIT);

        let listing: Listing = get_json(&self.client, url, &target.token).await?;
        Ok(Self::map_media(listing.entries(), target, Utc::now()))
    }
}
