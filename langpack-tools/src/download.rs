//! Fetch the reference language pack published by the target application.

use crate::error::{Result, ToolError};
use crate::io::write_json;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_PAGE_URL: &str = "https://www.figma.com";

/// Reference English bundle linked from the application page
pub const DEFAULT_ASSET_PATTERN: &str =
    r"https://www\.figma\.com/webpack-artifacts/assets/figma_app_beta-[a-f0-9]+\.min\.en\.json(?:\.br)?";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// First URL in `html` matching `pattern`, without a trailing `.br`.
pub fn find_asset_url(html: &str, pattern: &Regex) -> Option<String> {
    let found = pattern.find(html)?.as_str();
    Some(found.strip_suffix(".br").unwrap_or(found).to_string())
}

/// Last path segment of `url`, ignoring any query string.
pub fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "language-pack.json".to_string(),
    }
}

pub struct Downloader {
    client: reqwest::Client,
    pattern: Regex,
}

impl Downloader {
    pub fn new(pattern: &str, timeout: Duration) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| ToolError::Download(format!("invalid asset pattern: {}", e)))?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::Download(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, pattern })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::Download(format!("{}: {}", url, e)))?;
        response
            .error_for_status()
            .map_err(|e| ToolError::Download(format!("{}: {}", url, e)))
    }

    /// Locate the asset URL on `page_url`.
    pub async fn locate(&self, page_url: &str) -> Result<String> {
        info!("Fetching {}", page_url);
        let html = self
            .get(page_url)
            .await?
            .text()
            .await
            .map_err(|e| ToolError::Download(format!("{}: {}", page_url, e)))?;

        find_asset_url(&html, &self.pattern).ok_or_else(|| {
            ToolError::Download(format!("no asset matching {} on {}", self.pattern, page_url))
        })
    }

    /// Download the asset linked from `page_url`, check it parses as JSON and
    /// save it pretty-printed under `output_dir`. Returns the written path.
    pub async fn download(&self, page_url: &str, output_dir: &Path) -> Result<PathBuf> {
        let asset_url = self.locate(page_url).await?;
        info!("Downloading {}", asset_url);

        let bytes = self
            .get(&asset_url)
            .await?
            .bytes()
            .await
            .map_err(|e| ToolError::Download(format!("{}: {}", asset_url, e)))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| ToolError::invalid_json(PathBuf::from(&asset_url), e))?;

        let output = output_dir.join(file_name_from_url(&asset_url));
        write_json(&output, &value)?;
        info!("Saved {}", output.display());
        Ok(output)
    }
}
