use crate::error::{Result, SourceError};
use crate::DocumentSource;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use webqa_vector_store::describe_transport_error;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const UNTITLED_PAGE: &str = "Untitled Page";

const SKIPPED_TAGS: [&str; 3] = ["script", "style", "noscript"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Pages with less visible text than this are rejected
    pub min_page_chars: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_page_chars: 50,
        }
    }
}

/// Title and visible text of a fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub url: String,
    pub title: String,
    pub raw_text: String,
}

/// Fetches a single page over HTTP(S) and extracts its visible text.
pub struct WebsiteLoader {
    client: Client,
    config: SourceConfig,
}

impl WebsiteLoader {
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::InvalidInput(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub const fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        let parsed = parse_url(url)?;
        log::info!("Fetching {parsed}");

        let response = self
            .client
            .get(parsed.clone())
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await
            .map_err(|e| SourceError::Unreachable(describe_transport_error(&e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SourceError::BadResponse {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Unreachable(format!("failed to read response body: {e}")))?;

        let (title, raw_text) = extract_page(&body);
        let chars = raw_text.chars().count();
        if chars < self.config.min_page_chars {
            return Err(SourceError::EmptyContent(format!(
                "the website does not contain sufficient textual content ({chars} characters)"
            )));
        }
        log::debug!("Extracted {chars} characters from '{title}'");

        // Chunks cite the URL as the caller wrote it, not its normalized form.
        Ok(FetchedDocument {
            url: url.to_string(),
            title,
            raw_text,
        })
    }
}

#[async_trait]
impl DocumentSource for WebsiteLoader {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        WebsiteLoader::fetch(self, url).await
    }
}

/// Accepts absolute http(s) URLs with a host.
pub fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| SourceError::InvalidInput(format!("invalid URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SourceError::InvalidInput(format!(
            "unsupported URL scheme '{}' (expected http or https)",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(SourceError::InvalidInput(format!("URL '{raw}' has no host")));
    }
    Ok(url)
}

/// `(title, visible text)` with whitespace collapsed; script-like content is skipped.
#[must_use]
pub fn extract_page(html: &str) -> (String, String) {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "title")
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED_PAGE.to_string());

    let mut raw = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_TAGS.contains(&el.name()))
        });
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }

    (title, collapse_whitespace(&raw))
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
