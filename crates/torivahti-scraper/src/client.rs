//! HTTP client for Tori.fi listing pages, item pages, and images.
//!
//! Every page fetch gets a randomized pre-request delay (jitter) to avoid a
//! fixed-interval request pattern, and transparent retries with exponential
//! backoff (`backoff_base * 2^attempt` seconds between attempts). Image
//! downloads reuse the retry wrapper without jitter and additionally require
//! the body to decode as a raster image before the file is written.

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use torivahti_core::{LoginSettings, Settings};

use crate::error::FetchError;

const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const SITE_ROOT: &str = "https://www.tori.fi/";
const LOGIN_URL: &str = "https://www.tori.fi/api/auth/login";

/// Per-call fetch parameters, read from a [`Settings`] snapshot so that a
/// settings update takes effect on the next cycle, never mid-request.
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub timeout_secs: u64,
    /// Additional attempts after the first failure.
    pub max_retries: u32,
}

impl From<&Settings> for FetchPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout_secs: settings.request_timeout_seconds,
            max_retries: settings.max_retries,
        }
    }
}

pub struct ToriClient {
    client: Client,
    /// Base delay in seconds for exponential backoff: `base * 2^attempt`.
    backoff_base_secs: u64,
    /// Upper bound for the pre-request jitter. Zero disables jitter.
    jitter_max_ms: u64,
    /// Prefix item ids are appended to when fetching detail pages.
    /// Overridable so tests can point it at a local server.
    item_base: String,
    logged_in: std::sync::atomic::AtomicBool,
}

impl ToriClient {
    /// Creates a client with the production backoff base (1 s) and jitter
    /// window (0–3 s).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timing(1, 3_000)
    }

    /// Creates a client with explicit timing knobs. Tests pass zeros to
    /// keep the suite fast.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn with_timing(backoff_base_secs: u64, jitter_max_ms: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(BROWSER_UA)
            .connect_timeout(Duration::from_secs(10))
            .cookie_store(true)
            .build()?;
        Ok(Self {
            client,
            backoff_base_secs,
            jitter_max_ms,
            item_base: torivahti_core::item::ITEM_URL_BASE.to_owned(),
            logged_in: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Overrides the detail-page base URL. Item ids are appended verbatim.
    #[must_use]
    pub fn with_item_base(mut self, base: impl Into<String>) -> Self {
        self.item_base = base.into();
        self
    }

    /// Fetches a listing page, optionally at an explicit page index.
    /// Jittered and retried.
    ///
    /// # Errors
    ///
    /// Returns the classified [`FetchError`] of the final attempt.
    pub async fn fetch_listing_page(
        &self,
        policy: FetchPolicy,
        listing_url: &str,
        page: Option<u32>,
    ) -> Result<String, FetchError> {
        let url = crate::pagination::listing_page_url(listing_url, page);
        self.add_jitter().await;
        self.fetch_text_with_retries(policy, &url).await
    }

    /// Fetches a single item's detail page. Jittered and retried.
    ///
    /// # Errors
    ///
    /// Returns the classified [`FetchError`] of the final attempt.
    pub async fn fetch_item_page(
        &self,
        policy: FetchPolicy,
        item_id: &str,
    ) -> Result<String, FetchError> {
        let url = format!("{}{}", self.item_base, item_id);
        self.add_jitter().await;
        self.fetch_text_with_retries(policy, &url).await
    }

    /// Downloads `url` to `path`. Retried like a page fetch, but the body
    /// must decode as a supported raster image before anything is written;
    /// undecodable bytes fail the download even on HTTP 200.
    ///
    /// # Errors
    ///
    /// [`FetchError::InvalidImage`] for bodies that do not decode, the
    /// classified network error otherwise.
    pub async fn download_image(
        &self,
        policy: FetchPolicy,
        url: &str,
        path: &Path,
    ) -> Result<(), FetchError> {
        let bytes = self.fetch_bytes_with_retries(policy, url).await?;
        if image::load_from_memory(&bytes).is_err() {
            return Err(FetchError::InvalidImage {
                url: url.to_owned(),
            });
        }
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| FetchError::Io {
                path: path.display().to_string(),
                source,
            })
    }

    /// One-time authenticated-session bootstrap. When login is enabled and
    /// both credentials are present, fetches the site root (for session
    /// cookies) and posts the credentials. Any failure logs a warning and
    /// leaves the client unauthenticated; this never blocks startup.
    pub async fn login_if_configured(&self, policy: FetchPolicy, login: &LoginSettings) -> bool {
        self.login_at(policy, SITE_ROOT, LOGIN_URL, login).await
    }

    pub(crate) async fn login_at(
        &self,
        policy: FetchPolicy,
        site_root: &str,
        login_url: &str,
        login: &LoginSettings,
    ) -> bool {
        if !login.enabled {
            return false;
        }
        let username = login.username.trim();
        let password = login.password.trim();
        if username.is_empty() || password.is_empty() {
            tracing::warn!("login enabled but credentials missing");
            return false;
        }

        let timeout = Duration::from_secs(policy.timeout_secs);
        // Warm up the session; tokens/cookies land in the cookie store.
        if let Err(e) = self.client.get(site_root).timeout(timeout).send().await {
            tracing::warn!(error = %e, "login warm-up request failed; continuing unauthenticated");
            return false;
        }

        match self
            .client
            .post(login_url)
            .timeout(timeout)
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                self.logged_in
                    .store(true, std::sync::atomic::Ordering::Relaxed);
                tracing::info!("logged in to Tori.fi");
                true
            }
            Ok(response) => {
                tracing::warn!(status = %response.status(), "login failed; continuing unauthenticated");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "login request failed; continuing unauthenticated");
                false
            }
        }
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(std::sync::atomic::Ordering::Relaxed)
    }

    async fn add_jitter(&self) {
        if self.jitter_max_ms == 0 {
            return;
        }
        let delay_ms = rand::rng().random_range(0..=self.jitter_max_ms);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    async fn fetch_text_with_retries(
        &self,
        policy: FetchPolicy,
        url: &str,
    ) -> Result<String, FetchError> {
        self.fetch_with_retries(policy, url, |response| async move {
            response.text().await
        })
        .await
    }

    async fn fetch_bytes_with_retries(
        &self,
        policy: FetchPolicy,
        url: &str,
    ) -> Result<Vec<u8>, FetchError> {
        self.fetch_with_retries(policy, url, |response| async move {
            response.bytes().await.map(|b| b.to_vec())
        })
        .await
    }

    /// GET `url` with up to `policy.max_retries` additional attempts.
    /// The wait before retry n is `backoff_base_secs * 2^(n-1)` seconds.
    /// Every network-level failure of a GET is considered transient here;
    /// the caller decides whether the final error is fatal to its unit of
    /// work.
    async fn fetch_with_retries<T, F, Fut>(
        &self,
        policy: FetchPolicy,
        url: &str,
        read_body: F,
    ) -> Result<T, FetchError>
    where
        F: Fn(reqwest::Response) -> Fut,
        Fut: std::future::Future<Output = Result<T, reqwest::Error>>,
    {
        let timeout = Duration::from_secs(policy.timeout_secs);
        let mut attempt = 0u32;
        loop {
            let result = self.fetch_once(url, timeout, &read_body).await;
            match result {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= policy.max_retries {
                        tracing::error!(url, attempts = attempt + 1, error = %err, "all fetch attempts failed");
                        return Err(err);
                    }
                    let delay_secs = self
                        .backoff_base_secs
                        .saturating_mul(1u64 << attempt.min(62));
                    tracing::warn!(
                        url,
                        attempt = attempt + 1,
                        delay_secs,
                        error = %err,
                        "fetch attempt failed — retrying after backoff"
                    );
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_once<T, F, Fut>(
        &self,
        url: &str,
        timeout: Duration,
        read_body: &F,
    ) -> Result<T, FetchError>
    where
        F: Fn(reqwest::Response) -> Fut,
        Fut: std::future::Future<Output = Result<T, reqwest::Error>>,
    {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        read_body(response)
            .await
            .map_err(|e| FetchError::from_reqwest(e, url))
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
