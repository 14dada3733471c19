//! Fetches a URL and reduces the page to a title plus readable text, enough
//! material for a model to summarize.

use std::sync::LazyLock;

use async_trait::async_trait;
use dn_core::traits::PageFetcher;
use dn_core::types::Page;
use errors::{DigestError, DigestResult};
use regex::Regex;
use reqwest::Client;

/// Cap on extracted text; anything longer buys no better summary.
const MAX_TEXT_CHARS: usize = 12_000;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new() -> DigestResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .user_agent("daybook")
            .build()
            .map_err(DigestError::Http)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> DigestResult<Page> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::NoteStoreApi {
                status: status.as_u16(),
                message: format!("fetching {url}"),
            });
        }
        let html = response.text().await?;
        Ok(reduce(url, &html))
    }
}

fn reduce(url: &str, html: &str) -> Page {
    let title = TITLE_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| WHITESPACE_RE.replace_all(m.as_str().trim(), " ").into_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| url.to_string());

    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    let mut text = WHITESPACE_RE
        .replace_all(without_tags.trim(), " ")
        .into_owned();
    if text.len() > MAX_TEXT_CHARS {
        let mut cut = MAX_TEXT_CHARS;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }

    Page { title, text }
}
