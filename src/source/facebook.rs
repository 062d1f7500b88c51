//! Facebook Graph API source.
//!
//! Pulls the connected user's recent posts from `/me/posts` and maps each
//! one onto an [`Update`]. The mapping is a pure function so tests can
//! exercise it without the network.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Deserialize;

use super::{endpoint, get_json, parse_timestamp, relative_time, FetchError, FetchTarget, Listing};
use super::{Update, UpdateSource};
use crate::provider::Provider;

/// How many posts to request per fetch.
const POST_LIMIT: &str = "10";

/// A post as returned by `/me/posts`. Every field may be absent.
#[derive(Debug, Default, Deserialize)]
pub struct Post {
    pub id: Option<String>,
    pub message: Option<String>,
    pub created_time: Option<String>,
    pub permalink_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    name: Option<String>,
}

/// Facebook data source.
#[derive(Clone)]
pub struct FacebookSource {
    client: reqwest::Client,
    /// Versioned Graph base URL, e.g. `https://graph.facebook.com/v18.0`.
    graph_url: String,
}

impl FacebookSource {
    pub fn new(client: reqwest::Client, graph_url: impl Into<String>) -> Self {
        Self {
            client,
            graph_url: graph_url.into(),
        }
    }

    /// Look up the display name of the token's owner.
    ///
    /// `Ok(None)` means the profile came back without a usable name.
    pub async fn profile_name(&self, token: &SecretString) -> Result<Option<String>, FetchError> {
        let mut url = endpoint(&self.graph_url, "me")?;
        url.query_pairs_mut().append_pair("fields", "id,name,email");

        let profile: Profile = get_json(&self.client, url, token).await?;
        Ok(profile.name.filter(|n| !n.trim().is_empty()))
    }

    /// Map raw posts onto [`Update`]s.
    ///
    /// Posts without an id are skipped; a missing message becomes the
    /// provider default.
    pub fn map_posts(posts: Vec<Post>, target: &FetchTarget, now: DateTime<Utc>) -> Vec<Update> {
        posts
            .into_iter()
            .filter_map(|post| {
                let id = post.id.filter(|id| !id.is_empty())?;
                let created = post.created_time.as_deref().and_then(parse_timestamp);
                Some(Update {
                    id,
                    account_id: target.account_id.clone(),
                    account: target.account_name.clone(),
                    provider: Provider::Facebook,
                    message: post
                        .message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| Provider::Facebook.default_message().to_string()),
                    time: relative_time(created, now),
                    link: post.permalink_url,
                })
            })
            .collect()
    }
}

#[async_trait]
impl UpdateSource for FacebookSource {
    fn provider(&self) -> Provider {
        Provider::Facebook
    }

    async fn fetch(&self, target: &FetchTarget) -> Result<Vec<Update>, FetchError> {
        let mut url = endpoint(&self.graph_url, "me/posts")?;
        url.query_pairs_mut()
            .append_pair("fields", "message,created_time,permalink_url")
            .append_pair("limit", POST_LIMIT);

        let listing: Listing = get_json(&self.client, url, &target.token).await?;
        Ok(Self::map_posts(listing.entries(), target, Utc::now()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target() -> FetchTarget {
        FetchTarget {
            account_id: "fb1".into(),
            account_name: "Jane Doe".into(),
            provider: Provider::Facebook,
            token: SecretString::from("fb-token".to_string()),
        }
    }

    #[test]
    fn map_posts_fills_every_field() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let posts = vec![Post {
            id: Some("p1".into()),
            message: Some("Hello".into()),
            created_time: Some("2025-06-15T10:00:00+0000".into()),
            permalink_url: Some("https://facebook.com/p1".into()),
        }];

        let updates = FacebookSource::map_posts(posts, &target(), now);

        assert_eq!(
            updates,
            vec![Update {
                id: "p1".into(),
                account_id: "fb1".into(),
                account: "Jane Doe".into(),
                provider: Provider::Facebook,
                message: "Hello".into(),
                time: "2h ago".into(),
                link: Some("https://facebook.com/p1".into()),
            }]
        );
    }

    #[test]
    fn map_posts_defaults_missing_message_and_time() {
        let posts = vec![Post {
            id: Some("p2".into()),
            ..Post::default()
        }];

        let updates = FacebookSource::map_posts(posts, &target(), Utc::now());

        assert_eq!(updates[0].message, "Shared a post");
        assert_eq!(updates[0].time, "recently");
        assert!(updates[0].link.is_none());
    }

    #[test]
    fn map_posts_skips_entries_without_id() {
        let posts = vec![
            Post {
                message: Some("orphan".into()),
                ..Post::default()
            },
            Post {
                id: Some("p3".into()),
                ..Post::default()
            },
        ];

        let updates = FacebookSource::map_posts(posts, &target(), Utc::now());

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "p3");
    }

    #[tokio::test]
    async fn fetch_requests_recent_posts_with_bearer_token() {
        let server = MockServer::start().await;
        let created = (Utc::now() - TimeDelta::minutes(5))
            .format("%Y-%m-%dT%H:%M:%S%z")
            .to_string();
        Mock::given(method("GET"))
            .and(path("/v18.0/me/posts"))
            .and(query_param("limit", "10"))
            .and(query_param("fields", "message,created_time,permalink_url"))
            .and(header("authorization", "Bearer fb-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "p1", "message": "First", "created_time": created },
                    { "id": "p2" }
                ]
            })))
            .mount(&server)
            .await;

        let source = FacebookSource::new(reqwest::Client::new(), format!("{}/v18.0", server.uri()));
        let updates = source.fetch(&target()).await.unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message, "First");
        assert!(updates[0].time.ends_with("m ago"));
        assert_eq!(updates[1].message, "Shared a post");
    }

    #[tokio::test]
    async fn fetch_reports_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "Invalid OAuth access token." }
            })))
            .mount(&server)
            .await;

        let source = FacebookSource::new(reqwest::Client::new(), server.uri());
        let err = source.fetch(&target()).await.unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus(400)));
    }

    #[tokio::test]
    async fn fetch_reports_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let source = FacebookSource::new(reqwest::Client::new(), server.uri());
        let err = source.fetch(&target()).await.unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn badly_typed_post_does_not_drop_the_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "p1", "message": "fine" },
                    { "id": "p2", "message": 42 }
                ]
            })))
            .mount(&server)
            .await;

        let source = FacebookSource::new(reqwest::Client::new(), server.uri());
        let updates = crate::source::fetch_updates(&source, &target()).await;

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "p1");
        assert_eq!(updates[0].message, "fine");
    }

    #[tokio::test]
    async fn null_data_is_an_empty_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": null })),
            )
            .mount(&server)
            .await;

        let source = FacebookSource::new(reqwest::Client::new(), server.uri());
        let updates = source.fetch(&target()).await.unwrap();

        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn fetch_updates_swallows_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = FacebookSource::new(reqwest::Client::new(), server.uri());
        let updates = crate::source::fetch_updates(&source, &target()).await;

        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn profile_name_reads_name_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(query_param("fields", "id,name,email"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "42", "name": "Jane Doe"
            })))
            .mount(&server)
            .await;

        let source = FacebookSource::new(reqwest::Client::new(), server.uri());
        let name = source
            .profile_name(&SecretString::from("fb-token".to_string()))
            .await
            .unwrap();

        assert_eq!(name.as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn profile_without_name_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "42" })))
            .mount(&server)
            .await;

        let source = FacebookSource::new(reqwest::Client::new(), server.uri());
        let name = source
            .profile_name(&SecretString::from("fb-token".to_string()))
            .await
            .unwrap();

        assert!(name.is_none());
    }
}
