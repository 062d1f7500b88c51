//! Browser authorization with a loopback redirect.
//!
//! Opens the provider's consent page in the system browser and listens on
//! `127.0.0.1` for the redirect. Implicit-flow tokens arrive in the URL
//! fragment, which browsers never send to the server, so a bare hit on the
//! callback path is answered with a small page that replays the fragment as
//! a query string.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::SecretString;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use super::{AuthError, AuthGrant, AuthRequest, Authorizer};
use crate::provider::ResponseType;

/// Path the provider redirects back to.
const CALLBACK_PATH: &str = "/social-auth";

/// Requests larger than this are cut off; the request line is all we need.
const MAX_REQUEST_BYTES: usize = 8 * 1024;

/// How long an accepted connection may take to send its request line.
///
/// Browsers open spare connections that never send anything; those are
/// dropped after this so the real redirect is not stuck behind them.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(5);

const RELAY_PAGE: &str = "<!doctype html><html><body><p>Completing sign-in…</p><script>\
if (location.hash.length > 1) {\
  location.replace(location.pathname + '?' + location.hash.substring(1));\
} else {\
  document.body.textContent = 'No authorization response found. You can close this window.';\
}\
</script></body></html>";

const DONE_PAGE: &str =
    "<!doctype html><html><body><p>Account connected. You can close this window.</p></body></html>";

const FAILED_PAGE: &str =
    "<!doctype html><html><body><p>Authorization did not complete. You can close this window.</p></body></html>";

/// Opens an authorization URL for the user.
pub type Launcher = Box<dyn Fn(&Url) -> std::io::Result<()> + Send + Sync>;

pub struct LoopbackAuthorizer {
    /// Port to listen on; `0` picks a free one.
    port: u16,
    /// How long to wait for the redirect before giving up.
    timeout: Duration,
    /// Per-connection limit on reading the request head.
    read_timeout: Duration,
    launcher: Launcher,
}

impl LoopbackAuthorizer {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self {
            port,
            timeout,
            read_timeout: REQUEST_READ_TIMEOUT,
            launcher: Box::new(|url: &Url| open::that(url.as_str())),
        }
    }

    /// Replace the system-browser launcher.
    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }
}

#[async_trait]
impl Authorizer for LoopbackAuthorizer {
    async fn authorize(&self, request: &AuthRequest) -> Result<AuthGrant, AuthError> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, self.port)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}{CALLBACK_PATH}");
        let state = random_state();
        let url = authorization_url(request, &redirect_uri, &state)?;

        tracing::info!(
            provider = %request.provider,
            redirect_uri = %redirect_uri,
            "Opening authorization page"
        );
        (self.launcher)(&url)?;

        tokio::time::timeout(
            self.timeout,
            wait_for_callback(&listener, request.response_type, &state, self.read_timeout),
        )
        .await
        .map_err(|_| AuthError::TimedOut)?
    }
}

/// Build the consent-page URL for `request`.
pub fn authorization_url(
    request: &AuthRequest,
    redirect_uri: &str,
    state: &str,
) -> Result<Url, url::ParseError> {
    let scope = request.scopes.join(",");
    Url::parse_with_params(
        &request.authorize_url,
        &[
            ("client_id", request.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", request.response_type.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
        ],
    )
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Accept connections until one carries an authorization result.
async fn wait_for_callback(
    listener: &TcpListener,
    response_type: ResponseType,
    state: &str,
    read_timeout: Duration,
) -> Result<AuthGrant, AuthError> {
    loop {
        let (mut stream, peer) = listener.accept().await?;

        let read = tokio::time::timeout(read_timeout, read_request_target(&mut stream)).await;
        let target = match read {
            Ok(Ok(Some(target))) => target,
            Ok(Ok(None)) => {
                respond(&mut stream, "400 Bad Request", "Bad request").await;
                continue;
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Failed to read redirect request");
                continue;
            }
            Err(_) => {
                tracing::debug!(peer = %peer, "Dropping idle connection to redirect listener");
                continue;
            }
        };

        let url = match Url::parse("http://127.0.0.1").and_then(|base| base.join(&target)) {
            Ok(url) if url.path() == CALLBACK_PATH => url,
            _ => {
                respond(&mut stream, "404 Not Found", "Not found").await;
                continue;
            }
        };

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        match parse_callback(&params, response_type, state) {
            None => respond(&mut stream, "200 OK", RELAY_PAGE).await,
            Some(result) => {
                let page = if result.is_ok() { DONE_PAGE } else { FAILED_PAGE };
                respond(&mut stream, "200 OK", page).await;
                return result;
            }
        }
    }
}

/// Interpret the redirect's query parameters.
///
/// `None` means the request carried no result yet (the fragment has not
/// been replayed), so the relay page should be served.
fn parse_callback(
    params: &HashMap<String, String>,
    response_type: ResponseType,
    expected_state: &str,
) -> Option<Result<AuthGrant, AuthError>> {
    if let Some(error) = params.get("error") {
        if error == "access_denied" {
            return Some(Err(AuthError::Cancelled));
        }
        let reason = params.get("error_description").unwrap_or(error);
        return Some(Err(AuthError::Denied(reason.clone())));
    }

    let grant = match response_type {
        ResponseType::Token => params
            .get("access_token")
            .map(|t| AuthGrant::Token(SecretString::from(t.clone()))),
        ResponseType::Code => params.get("code").map(|c| AuthGrant::Code(c.clone())),
    }?;

    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Some(Err(AuthError::StateMismatch));
    }
    Some(Ok(grant))
}

/// Read an HTTP request head and return the target of a `GET`.
async fn read_request_target(stream: &mut TcpStream) -> std::io::Result<Option<String>> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    while !buf.windows(4).any(|w| w == b"\r\n\r\n") && buf.len() < MAX_REQUEST_BYTES {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    match (request_line.next(), request_line.next()) {
        (Some("GET"), Some(target)) => Ok(Some(target.to_string())),
        _ => Ok(None),
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!(error = %e, "Failed to answer redirect request");
    }
    let _ = stream.shutdown().await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use secrecy::ExposeSecret;

    fn request(provider: Provider) -> AuthRequest {
        AuthRequest {
            provider,
            client_id: "app-123".into(),
            authorize_url: "https://www.facebook.com/v18.0/dialog/oauth".into(),
            scopes: provider.scopes(),
            response_type: provider.response_type(),
        }
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Issue a raw GET against the loopback listener, like a browser would.
    async fn browser_get(port: u16, target: &str) -> String {
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();
        let request = format!("GET {target} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    fn redirect_and_state(url: &Url) -> (u16, String) {
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let redirect = Url::parse(&pairs["redirect_uri"]).unwrap();
        (redirect.port().unwrap(), pairs["state"].clone())
    }

    #[test]
    fn authorization_url_carries_all_parameters() {
        let url = authorization_url(
            &request(Provider::Facebook),
            "http://127.0.0.1:8765/social-auth",
            "xyz",
        )
        .unwrap();
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("www.facebook.com"));
        assert_eq!(pairs["client_id"], "app-123");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:8765/social-auth");
        assert_eq!(pairs["response_type"], "token");
        assert_eq!(pairs["scope"], "public_profile,email,user_posts");
        assert_eq!(pairs["state"], "xyz");
    }

    #[test]
    fn random_state_is_alphanumeric_and_fresh() {
        let a = random_state();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, random_state());
    }

    #[test]
    fn callback_without_result_asks_for_relay() {
        assert!(parse_callback(&params(&[]), ResponseType::Token, "s").is_none());
    }

    #[test]
    fn callback_with_token_and_state() {
        let result = parse_callback(
            &params(&[("access_token", "tok"), ("state", "s")]),
            ResponseType::Token,
            "s",
        );
        match result {
            Some(Ok(AuthGrant::Token(token))) => assert_eq!(token.expose_secret(), "tok"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn callback_with_wrong_state_is_rejected() {
        let result = parse_callback(
            &params(&[("code", "c"), ("state", "other")]),
            ResponseType::Code,
            "s",
        );
        assert!(matches!(result, Some(Err(AuthError::StateMismatch))));
    }

    #[test]
    fn access_denied_is_cancellation() {
        let result = parse_callback(
            &params(&[("error", "access_denied"), ("state", "s")]),
            ResponseType::Token,
            "s",
        );
        assert!(matches!(result, Some(Err(AuthError::Cancelled))));
    }

    #[test]
    fn other_errors_carry_description() {
        let result = parse_callback(
            &params(&[("error", "server_error"), ("error_description", "Try later")]),
            ResponseType::Code,
            "s",
        );
        match result {
            Some(Err(AuthError::Denied(reason))) => assert_eq!(reason, "Try later"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn implicit_flow_relays_fragment_then_returns_token() {
        let authorizer = LoopbackAuthorizer::new(0, Duration::from_secs(5)).with_launcher(
            Box::new(|url: &Url| {
                let (port, state) = redirect_and_state(url);
                tokio::spawn(async move {
                    let relay = browser_get(port, "/favicon.ico").await;
                    assert!(relay.starts_with("HTTP/1.1 404"));

                    let relay = browser_get(port, CALLBACK_PATH).await;
                    assert!(relay.contains("location.hash"));

                    let done = browser_get(
                        port,
                        &format!("{CALLBACK_PATH}?access_token=abc&expires_in=3600&state={state}"),
                    )
                    .await;
                    assert!(done.contains("Account connected"));
                });
                Ok(())
            }),
        );

        let grant = authorizer.authorize(&request(Provider::Facebook)).await.unwrap();

        match grant {
            AuthGrant::Token(token) => assert_eq!(token.expose_secret(), "abc"),
            other => panic!("expected token, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn code_flow_returns_code() {
        let authorizer = LoopbackAuthorizer::new(0, Duration::from_secs(5)).with_launcher(
            Box::new(|url: &Url| {
                let (port, state) = redirect_and_state(url);
                tokio::spawn(async move {
                    browser_get(port, &format!("{CALLBACK_PATH}?code=xyz&state={state}")).await;
                });
                Ok(())
            }),
        );

        let grant = authorizer.authorize(&request(Provider::Instagram)).await.unwrap();

        assert!(matches!(grant, AuthGrant::Code(code) if code == "xyz"));
    }

    #[tokio::test]
    async fn idle_connection_does_not_block_the_redirect() {
        let authorizer = LoopbackAuthorizer {
            read_timeout: Duration::from_millis(100),
            ..LoopbackAuthorizer::new(0, Duration::from_secs(5))
        }
        .with_launcher(Box::new(|url: &Url| {
            let (port, state) = redirect_and_state(url);
            tokio::spawn(async move {
                // A preconnect that never sends a request, accepted first.
                let idle = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();
                browser_get(port, &format!("{CALLBACK_PATH}?code=xyz&state={state}")).await;
                drop(idle);
            });
            Ok(())
        }));

        let grant = authorizer.authorize(&request(Provider::Instagram)).await.unwrap();

        assert!(matches!(grant, AuthGrant::Code(code) if code == "xyz"));
    }

    #[tokio::test]
    async fn gives_up_after_timeout() {
        let authorizer = LoopbackAuthorizer::new(0, Duration::from_millis(50))
            .with_launcher(Box::new(|_: &Url| Ok(())));

        let err = authorizer
            .authorize(&request(Provider::Facebook))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::TimedOut));
    }

    #[tokio::test]
    async fn launcher_failure_is_reported() {
        let authorizer = LoopbackAuthorizer::new(0, Duration::from_secs(5)).with_launcher(
            Box::new(|_: &Url| Err(std::io::Error::other("no browser"))),
        );

        let err = authorizer
            .authorize(&request(Provider::Facebook))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Io(_)));
    }
}
