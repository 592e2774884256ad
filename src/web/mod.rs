//! Web page downloading.
//!
//! Fetches pages over HTTP, reduces them to plain text, and saves the text
//! under the download directory. Failures are reported in the returned
//! [`PageDownload`], never as errors.

mod extract;

pub use extract::PageExtractor;

use crate::config::Settings;
use crate::error::{KimiError, Result};
use chrono::{Local, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, instrument};

/// Classic public-domain texts offered by `download_free_books`.
const FREE_BOOKS: [(&str, &str); 5] = [
    (
        "Alice's Adventures in Wonderland",
        "https://www.gutenberg.org/files/11/11-0.txt",
    ),
    (
        "Pride and Prejudice",
        "https://www.gutenberg.org/files/1342/1342-0.txt",
    ),
    (
        "A Tale of Two Cities",
        "https://www.gutenberg.org/files/98/98-0.txt",
    ),
    (
        "War and Peace",
        "https://www.gutenberg.org/files/2600/2600-0.txt",
    ),
    (
        "Shakespeare's Sonnets",
        "https://www.gutenberg.org/cache/epub/1041/pg1041.txt",
    ),
];

/// Result of downloading one URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDownload {
    pub success: bool,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub saved: Option<SavedPage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where a downloaded page was written and what it contained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedPage {
    pub file_path: String,
    pub file_name: String,
    /// Preview of the extracted text.
    pub content: String,
    /// Length of the full extracted text in characters.
    pub content_length: usize,
}

/// Downloads web pages as text files.
pub struct WebDownloader {
    client: reqwest::Client,
    extractor: PageExtractor,
    download_dir: PathBuf,
    pacing: Duration,
    preview_chars: usize,
}

impl WebDownloader {
    /// Create a downloader writing into `download_dir` (created if missing).
    pub fn new(
        download_dir: PathBuf,
        user_agent: &str,
        timeout: Duration,
        pacing: Duration,
        preview_chars: usize,
    ) -> Result<Self> {
        std::fs::create_dir_all(&download_dir)?;

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            extractor: PageExtractor::new(),
            download_dir,
            pacing,
            preview_chars,
        })
    }

    /// Create a downloader from the `[web]` settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.download_dir(),
            &settings.web.user_agent,
            Duration::from_secs(settings.web.timeout_seconds),
            Duration::from_secs(settings.web.pacing_seconds),
            settings.web.preview_chars,
        )
    }

    /// Directory downloaded pages are written to.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Download one page and save its text.
    #[instrument(skip(self))]
    pub async fn download_webpage(&self, url: &str) -> PageDownload {
        info!("Downloading {}", url);

        match self.fetch_and_save(url).await {
            Ok(saved) => {
                info!("Downloaded {} -> {}", url, saved.file_path);
                PageDownload {
                    success: true,
                    url: url.to_string(),
                    title: None,
                    saved: Some(saved),
                    error: None,
                }
            }
            Err(e) => {
                error!("Download failed {}: {}", url, e);
                PageDownload {
                    success: false,
                    url: url.to_string(),
                    title: None,
                    saved: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Download several pages one after another, pausing after each request.
    pub async fn batch_download(&self, urls: &[String]) -> Vec<PageDownload> {
        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            results.push(self.download_webpage(url).await);
            tokio::time::sleep(self.pacing).await;
        }
        results
    }

    /// Download the first `count` classic texts from Project Gutenberg.
    pub async fn download_free_books(&self, count: usize) -> Vec<PageDownload> {
        let mut results = Vec::new();
        for (title, url) in FREE_BOOKS.iter().take(count) {
            info!("Downloading classic text: {}", title);
            let mut result = self.download_webpage(url).await;
            result.title = Some(title.to_string());
            results.push(result);
        }
        results
    }

    async fn fetch_and_save(&self, url: &str) -> Result<SavedPage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| KimiError::InvalidInput(format!("invalid URL '{}': {}", url, e)))?;
        let host = parsed.host_str().unwrap_or("page").replace('.', "_");

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(KimiError::Fetch(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await?;

        let text = if is_html(&content_type, &body) {
            self.extractor.extract(&body)
        } else {
            self.extractor.clean(&body)
        };

        let file_name = format!("{}_{}.txt", host, Utc::now().timestamp());
        let file_path = self.download_dir.join(&file_name);
        let contents = format!(
            "URL: {}\nDownloaded: {}\n{}\n\n{}",
            url,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            "=".repeat(80),
            text
        );
        tokio::fs::write(&file_path, contents).await?;

        Ok(SavedPage {
            file_path: file_path.to_string_lossy().into_owned(),
            file_name,
            content: preview(&text, self.preview_chars),
            content_length: text.chars().count(),
        })
    }
}

fn is_html(content_type: &str, body: &str) -> bool {
    if content_type.contains("html") {
        return true;
    }
    content_type.is_empty() && body.trim_start().starts_with('<')
}

/// First `max_chars` characters, with "..." when truncated.
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
