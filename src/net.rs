// src/net.rs
// Archive HTTP client. Every page fetch goes through the rate limiter,
// and a rate-limited body is absorbed by a cooldown-and-retry loop
// instead of surfacing as an error.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::limit::RateLimiter;
use crate::dom::Page;
use crate::params::{
    DEFAULT_ROOT, FETCH_INTERVAL_MS, RATE_LIMIT_COOLDOWN_SECS, RATE_LIMIT_SENTINEL,
};

/// What a transport hands back: the text body and the URL we actually
/// ended up at after redirects (login checks the latter).
pub struct TransportResponse {
    pub body: String,
    pub final_url: String,
}

/// GET/POST capability the client is built on. The production transport
/// is [`HttpTransport`]; tests substitute a scripted one.
pub trait Transport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<TransportResponse>;
    fn post(&self, url: &str, form: &[(String, String)]) -> Result<TransportResponse>;
}

/// Cookie-carrying blocking HTTP transport.
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(root: &Url) -> Result<Self> {
        let jar = Arc::new(reqwest::cookie::Jar::default());
        // The archive hides adult-rated works unless this cookie is set.
        jar.add_cookie_str("view_adult=true", root);
        let http = reqwest::blocking::Client::builder()
            .user_agent(user_agent())
            .cookie_provider(jar)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { http })
    }
}

fn user_agent() -> String {
    format!("bot ao_scrape/{}", env!("CARGO_PKG_VERSION"))
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<TransportResponse> {
        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .map_err(|e| Error::Transport(e.to_string()))?;
        let final_url = response.url().to_string();
        let body = response
            .text()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(TransportResponse { body, final_url })
    }

    fn post(&self, url: &str, form: &[(String, String)]) -> Result<TransportResponse> {
        let response = self
            .http
            .post(url)
            .form(form)
            .send()
            .map_err(|e| Error::Transport(e.to_string()))?;
        let final_url = response.url().to_string();
        let body = response
            .text()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(TransportResponse { body, final_url })
    }
}

#[derive(Clone)]
pub struct ClientConfig {
    pub root: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub fetch_interval: Duration,
    pub cooldown: Duration,
    /// None retries rate limits forever; Some(n) gives up with
    /// [`Error::RateLimited`] after n rate-limited attempts.
    pub retry_limit: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
            username: None,
            password: None,
            fetch_interval: Duration::from_millis(FETCH_INTERVAL_MS),
            cooldown: Duration::from_secs(RATE_LIMIT_COOLDOWN_SECS),
            retry_limit: None,
        }
    }
}

pub struct ArchiveClient {
    root: Url,
    transport: Box<dyn Transport>,
    limiter: RateLimiter,
    cooldown: Duration,
    retry_limit: Option<u32>,
}

impl ArchiveClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let root = Url::parse(&config.root)?;
        let transport = Box::new(HttpTransport::new(&root)?);
        Self::with_transport(config, transport)
    }

    /// Build the client around an externally supplied transport.
    pub fn with_transport(config: ClientConfig, transport: Box<dyn Transport>) -> Result<Self> {
        let client = Self {
            root: Url::parse(&config.root)?,
            transport,
            limiter: RateLimiter::new(config.fetch_interval),
            cooldown: config.cooldown,
            retry_limit: config.retry_limit,
        };
        match (&config.username, &config.password) {
            (Some(user), Some(pass)) => client.login(user, pass)?,
            (None, None) => {}
            _ => {
                return Err(Error::Config(
                    "provide both username and password, or neither".to_string(),
                ));
            }
        }
        Ok(client)
    }

    /// Fetches a page from the archive as a parsed tree.
    ///
    /// Recovers automatically from rate limiting by the remote: a body that
    /// starts with the sentinel triggers a long cooldown and a fresh attempt
    /// (itself gated by the regular interval). Transport failures are not
    /// retried.
    pub fn fetch_page(&self, path: &str, params: &[(String, String)]) -> Result<Page> {
        let url = self.root.join(path)?;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.limiter.acquire();
            let response = self.transport.get(url.as_str(), params)?;
            if response.body.starts_with(RATE_LIMIT_SENTINEL) {
                info!("rate limited, remorseful pause (attempt {attempt})");
                if let Some(limit) = self.retry_limit {
                    if attempt >= limit {
                        return Err(Error::RateLimited { attempts: attempt });
                    }
                }
                thread::sleep(self.cooldown);
                continue;
            }
            return Ok(Page::parse(&response.body));
        }
    }

    /// Log in with username and password, storing the session cookie in
    /// the transport. Goes straight to the transport: login is a one-off,
    /// not part of the crawl cadence.
    fn login(&self, username: &str, password: &str) -> Result<()> {
        debug!("logging in as {username}");
        let token_url = self.root.join("/token_dispenser.json")?;
        let token_response = self.transport.get(token_url.as_str(), &[])?;
        let token: serde_json::Value = serde_json::from_str(&token_response.body)
            .map_err(|e| Error::Auth(format!("token dispenser: {e}")))?;
        let token = token
            .get("token")
            .and_then(|t| t.as_str())
            .ok_or_else(|| Error::Auth("token dispenser gave no token".to_string()))?
            .to_string();

        let login_url = self.root.join("/users/login")?;
        let response = self.transport.post(
            login_url.as_str(),
            &[
                ("authenticity_token".to_string(), token),
                ("user[login]".to_string(), username.to_string()),
                ("user[password]".to_string(), password.to_string()),
            ],
        )?;

        // The archive answers with a redirect; where we land tells the story.
        if response.final_url == self.root.join(&format!("/users/{username}"))?.as_str() {
            return Ok(());
        }
        let page = Page::parse(&response.body);
        if response.final_url == login_url.as_str() {
            let reason = page
                .first(".flash.alert")
                .map(|n| n.text())
                .unwrap_or_else(|| "[unspecified]".to_string());
            return Err(Error::Auth(format!("bad username or password: {reason}")));
        }
        let reason = page
            .first(".error-auth_error p")
            .map(|n| n.text())
            .unwrap_or_else(|| "[unspecified]".to_string());
        Err(Error::Auth(format!("credential or session failure: {reason}")))
    }
}
