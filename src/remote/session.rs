use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::OnceCell;

use super::transport::{HttpTransport, TransportError};

/// Cookie names that carry the service's login session.
pub const SESSION_COOKIE_NAMES: [&str; 3] = ["pfu", "pfp", "pfh"];

const LOGIN_PATH: &str = "/user/login";

/// Errors that prevent a session from being established.
///
/// Every variant is fatal for a generation cycle.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Neither a session cookie nor a username is configured
    #[error("No session cookie or username configured")]
    MissingCredentials,
    /// Login answered with something other than the expected redirect
    #[error("Login rejected: status {status}")]
    Rejected { status: u16 },
    /// Login redirected but set none of the session cookies
    #[error("Login returned status {status} without session cookies")]
    NoSessionCookies { status: u16 },
    /// Login request never got an HTTP answer
    #[error("Login request failed: {0}")]
    Transport(TransportError),
}

impl AuthError {
    /// HTTP status of the login response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Rejected { status } | AuthError::NoSessionCookies { status } => {
                Some(*status)
            }
            AuthError::Transport(e) => e.status(),
            AuthError::MissingCredentials => None,
        }
    }
}

/// An authenticated session: the minimal `Cookie` header value.
///
/// The credential is kept in a [`SecretString`] and masked in `Debug` output.
#[derive(Clone)]
pub struct Session {
    cookie: SecretString,
}

impl Session {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: SecretString::from(cookie.into()),
        }
    }

    /// Value for the `Cookie` request header.
    pub fn cookie_header(&self) -> &str {
        self.cookie.expose_secret()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cookie", &"[REDACTED]")
            .finish()
    }
}

/// Where a session comes from.
#[derive(Clone)]
pub enum Credentials {
    /// A pre-authenticated cookie string, used as-is
    Cookie(SecretString),
    /// Account credentials for the login exchange
    Login {
        username: String,
        password: SecretString,
    },
    /// Nothing configured; resolving fails without touching the network
    Missing,
}

impl Credentials {
    /// Picks the credential source: a supplied cookie wins over a login.
    pub fn from_parts(
        cookie: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Self {
        if let Some(cookie) = cookie.map(str::trim).filter(|c| !c.is_empty()) {
            return Credentials::Cookie(SecretString::from(cookie.to_owned()));
        }
        match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(username) => Credentials::Login {
                username: username.to_owned(),
                password: SecretString::from(password.unwrap_or_default().to_owned()),
            },
            None => Credentials::Missing,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Cookie(_) => f.write_str("Cookie([REDACTED])"),
            Credentials::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Credentials::Missing => f.write_str("Missing"),
        }
    }
}

/// Resolves the session credential once and hands out the same value afterwards.
///
/// Concurrent callers share a single login attempt. A failed attempt is not
/// memoized, so the next call tries again.
pub struct SessionManager {
    transport: HttpTransport,
    credentials: Credentials,
    session: OnceCell<Session>,
}

impl SessionManager {
    pub fn new(transport: HttpTransport, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            session: OnceCell::new(),
        }
    }

    /// Returns the session, logging in on first use if needed.
    pub async fn resolve(&self) -> Result<Session, AuthError> {
        self.session
            .get_or_try_init(|| self.establish())
            .await
            .cloned()
    }

    async fn establish(&self) -> Result<Session, AuthError> {
        match &self.credentials {
            Credentials::Cookie(cookie) => {
                tracing::debug!("Using pre-authenticated session cookie");
                Ok(Session {
                    cookie: cookie.clone(),
                })
            }
            Credentials::Login { username, password } => {
                login(&self.transport, username, password.expose_secret()).await
            }
            Credentials::Missing => Err(AuthError::MissingCredentials),
        }
    }
}

/// Performs the login exchange.
///
/// The service answers a successful login with a 302 carrying the session
/// cookies; that redirect is the success signal. Anything else is a failure.
async fn login(
    transport: &HttpTransport,
    username: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let url = transport
        .endpoint(LOGIN_PATH)
        .map_err(AuthError::Transport)?;

    tracing::info!(username = %username, "Logging in");

    let err = match transport
        .post_form(&url, &[("username", username), ("password", password)])
        .await
    {
        Ok(response) => {
            return Err(AuthError::Rejected {
                status: response.status,
            })
        }
        Err(err) => err,
    };

    match err.status() {
        Some(302) => {}
        Some(status) => return Err(AuthError::Rejected { status }),
        None => return Err(AuthError::Transport(err)),
    }

    let cookie = session_cookie(err.set_cookies());
    if cookie.is_empty() {
        return Err(AuthError::NoSessionCookies { status: 302 });
    }

    tracing::info!("Login succeeded");
    Ok(Session::new(cookie))
}

/// Builds the session credential from a set of `Set-Cookie` header values.
///
/// Keeps only `name=value` pairs whose name is one of
/// [`SESSION_COOKIE_NAMES`], drops every attribute, and joins the pairs with
/// `"; "`. Values may hold several cookies joined by commas. A name seen twice
/// keeps its first position and its last value.
pub fn session_cookie<'a>(set_cookies: impl IntoIterator<Item = &'a str>) -> String {
    let mut pairs: Vec<(&str, &str)> = Vec::new();

    for header in set_cookies {
        // Comma-joined cookies; `Expires=Wed, 21 Oct ...` fragments split here
        // too, but never start with a recognized `name=`.
        for segment in header.split(',') {
            let pair = segment.split(';').next().unwrap_or_default().trim();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if !SESSION_COOKIE_NAMES.contains(&name) {
                continue;
            }
            let value = value.trim();
            match pairs.iter_mut().find(|(n, _)| *n == name) {
                Some(existing) => existing.1 = value,
                None => pairs.push((name, value)),
            }
        }
    }

    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use proptest::prelude::*;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpTransport {
        let config = Config {
            base_url: server.uri(),
            ..Config::default()
        };
        HttpTransport::new(&config).unwrap()
    }

    fn login_credentials() -> Credentials {
        Credentials::from_parts(None, Some("reader@example.com"), Some("hunter2"))
    }

    // --- Cookie extraction ---

    #[test]
    fn test_comma_joined_cookies_keep_only_recognized() {
        let cookie = session_cookie(["pfp=abc; Path=/, foo=bar; Path=/"]);
        assert_eq!(cookie, "pfp=abc");
    }

    #[test]
    fn test_separate_headers_joined_in_order() {
        let cookie = session_cookie([
            "pfu=123; Path=/; HttpOnly",
            "tracking=xyz; Path=/",
            "pfp=abc; Path=/; Secure",
            "pfh=def; Expires=Wed, 21 Oct 2037 07:28:00 GMT; Path=/",
        ]);
        assert_eq!(cookie, "pfu=123; pfp=abc; pfh=def");
    }

    #[test]
    fn test_repeated_name_keeps_last_value() {
        let cookie = session_cookie(["pfu=old; Path=/", "pfp=x", "pfu=new; Path=/"]);
        assert_eq!(cookie, "pfu=new; pfp=x");
    }

    #[test]
    fn test_no_recognized_cookies() {
        assert_eq!(session_cookie(["foo=bar", "baz=qux; Path=/"]), "");
        assert_eq!(session_cookie(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_name_match_is_exact() {
        assert_eq!(session_cookie(["pfpx=1", "xpfp=2", "PFP=3"]), "");
    }

    proptest! {
        #[test]
        fn prop_unrecognized_names_never_leak(
            name in "[a-z]{1,8}",
            value in "[A-Za-z0-9]{0,12}",
        ) {
            prop_assume!(!SESSION_COOKIE_NAMES.contains(&name.as_str()));
            let header = format!("pfp=keep; Path=/, {name}={value}; Path=/");
            prop_assert_eq!(session_cookie([header.as_str()]), "pfp=keep");
        }
    }

    // --- Credentials ---

    #[test]
    fn test_cookie_wins_over_login() {
        let creds = Credentials::from_parts(Some("pfu=1"), Some("me"), Some("pw"));
        assert!(matches!(creds, Credentials::Cookie(_)));
    }

    #[test]
    fn test_blank_values_are_missing() {
        let creds = Credentials::from_parts(Some("  "), Some(""), None);
        assert!(matches!(creds, Credentials::Missing));
    }

    #[test]
    fn test_debug_masks_secrets() {
        let creds = Credentials::from_parts(None, Some("me"), Some("super-secret"));
        let debug = format!("{creds:?}");
        assert!(debug.contains("me"));
        assert!(!debug.contains("super-secret"));

        let session = Session::new("pfp=secret-cookie");
        assert!(!format!("{session:?}").contains("secret-cookie"));
    }

    // --- Resolution ---

    #[tokio::test]
    async fn test_supplied_cookie_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(302))
            .expect(0)
            .mount(&server)
            .await;

        let manager = SessionManager::new(
            transport_for(&server),
            Credentials::from_parts(Some("pfu=1; pfp=2"), None, None),
        );
        let session = manager.resolve().await.unwrap();
        assert_eq!(session.cookie_header(), "pfu=1; pfp=2");
    }

    #[tokio::test]
    async fn test_login_redirect_yields_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .and(body_string("username=reader%40example.com&password=hunter2"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", "/u")
                    .insert_header("Set-Cookie", "pfp=abc; Path=/, foo=bar; Path=/"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let manager = SessionManager::new(transport_for(&server), login_credentials());
        let session = manager.resolve().await.unwrap();
        assert_eq!(session.cookie_header(), "pfp=abc");
    }

    #[tokio::test]
    async fn test_session_is_resolved_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/login"))
            .respond_with(ResponseTemplate::new(302).insert_header("Set-Cookie", "pfu=1; Path=/"))
            .expect(1)
            .mount(&server)
            .await;

        let manager = SessionManager::new(transport_for(&server), login_credentials());
        let first = manager.resolve().await.unwrap();
        let second = manager.resolve().await.unwrap();
        assert_eq!(first.cookie_header(), second.cookie_header());
    }

    #[tokio::test]
    async fn test_login_without_session_cookies_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(302).insert_header("Set-Cookie", "foo=bar"))
            .mount(&server)
            .await;

        let manager = SessionManager::new(transport_for(&server), login_credentials());
        let err = manager.resolve().await.unwrap_err();
        assert!(matches!(err, AuthError::NoSessionCookies { status: 302 }));
    }

    #[tokio::test]
    async fn test_login_success_page_is_rejected() {
        // Wrong password: the service re-renders the form with 200
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<form>"))
            .mount(&server)
            .await;

        let manager = SessionManager::new(transport_for(&server), login_credentials());
        let err = manager.resolve().await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 200 }));
        assert_eq!(err.status(), Some(200));
    }

    #[tokio::test]
    async fn test_login_server_error_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let manager = SessionManager::new(transport_for(&server), login_credentials());
        let err = manager.resolve().await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 503 }));
    }

    #[tokio::test]
    async fn test_other_redirects_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(301).insert_header("Set-Cookie", "pfu=1"))
            .mount(&server)
            .await;

        let manager = SessionManager::new(transport_for(&server), login_credentials());
        let err = manager.resolve().await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 301 }));
    }

    #[tokio::test]
    async fn test_failed_login_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(302).insert_header("Set-Cookie", "pfh=ok"))
            .mount(&server)
            .await;

        let manager = SessionManager::new(transport_for(&server), login_credentials());
        assert!(manager.resolve().await.is_err());
        assert_eq!(manager.resolve().await.unwrap().cookie_header(), "pfh=ok");
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let manager = SessionManager::new(
            HttpTransport::new(&Config::default()).unwrap(),
            Credentials::Missing,
        );
        let err = manager.resolve().await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
        assert!(err.status().is_none());
    }
}
