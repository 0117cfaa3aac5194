use std::collections::HashMap;
use std::time::Duration;

use futures_util::StreamExt;
use jobpulse_core::Source;
use pulse_logging::pulse_debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;

use crate::decode::decode_page;
use crate::profile::SourceProfile;
use crate::{PageDocument, PageError, PageFailureKind, PageOutcome, PageToken, SearchQuery};

/// Body fragments that identify an anti-bot interstitial instead of results.
const BLOCK_MARKERS: &[&str] = &["captcha", "authwall", "challenge-platform", "cf-chl-"];

/// Retrieves raw result pages for a source. Implementations may drive plain
/// HTTP or a browser session.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        source: Source,
        query: &SearchQuery,
        page: PageToken,
    ) -> Result<PageOutcome, PageError>;
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub user_agent: String,
    /// Replaces a board's default origin, e.g. for a mirror or a test server.
    pub base_urls: HashMap<Source, String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 5 * 1024 * 1024,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            base_urls: HashMap::new(),
        }
    }
}

impl FetchSettings {
    pub fn with_base_url(mut self, source: Source, base: impl Into<String>) -> Self {
        self.base_urls.insert(source, base.into());
        self
    }
}

/// Plain HTTP page source for boards that render results server-side.
#[derive(Debug, Clone)]
pub struct ReqwestPageClient {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestPageClient {
    pub fn new(settings: FetchSettings) -> Result<Self, PageError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        let agent = HeaderValue::from_str(&settings.user_agent)
            .map_err(|err| PageError::new(PageFailureKind::Network, err.to_string()))?;
        headers.insert(USER_AGENT, agent);

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| PageError::new(PageFailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    async fn download(&self, url: reqwest::Url) -> Result<PageDocument, PageError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PageError::new(PageFailureKind::Blocked, status.to_string()));
        }
        if !status.is_success() {
            return Err(PageError::new(
                PageFailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(PageError::new(
                    PageFailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(PageError::new(
                    PageFailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let decoded = decode_page(&bytes, content_type.as_deref());
        if decoded.lossy {
            pulse_debug!(
                "Page {} had invalid {} sequences",
                final_url,
                decoded.encoding_label
            );
        }
        Ok(PageDocument {
            url: final_url,
            body: decoded.text,
        })
    }
}

#[async_trait::async_trait]
impl PageSource for ReqwestPageClient {
    async fn fetch_page(
        &self,
        source: Source,
        query: &SearchQuery,
        page: PageToken,
    ) -> Result<PageOutcome, PageError> {
        let profile = SourceProfile::for_source(source);
        let base = self.settings.base_urls.get(&source).map(String::as_str);
        let url = match profile.page_url(base, query, page) {
            Ok(Some(url)) => url,
            Ok(None) => return Ok(PageOutcome::NoMorePages),
            Err(err) => return Err(PageError::new(PageFailureKind::InvalidUrl, err.to_string())),
        };

        pulse_debug!("GET {} page={} url={}", source, page.0, url);
        let document = self.download(url).await?;

        if profile.split_cards(&document.body).is_empty() {
            if looks_blocked(&document.body) {
                return Err(PageError::new(
                    PageFailureKind::Blocked,
                    format!("anti-bot page at {}", document.url),
                ));
            }
            return Ok(PageOutcome::NoMorePages);
        }
        Ok(PageOutcome::Page(document))
    }
}

fn looks_blocked(body: &str) -> bool {
    let lowered = body.to_lowercase();
    BLOCK_MARKERS.iter().any(|marker| lowered.contains(marker))
}

fn map_reqwest_error(err: reqwest::Error) -> PageError {
    if err.is_timeout() {
        return PageError::new(PageFailureKind::Timeout, err.to_string());
    }
    PageError::new(PageFailureKind::Network, err.to_string())
}
