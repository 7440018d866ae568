//! Access to the storage metadata service.
//!
//! All HTTP traffic goes through [`DataSource`]; the navigator and the TUI
//! only ever see decoded [`ExploreResult`] and [`Summary`] values.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{ExploreResult, SortKey, Summary};

const USER_AGENT: &str = concat!("storage-explorer/", env!("CARGO_PKG_VERSION"));

/// Directory listing and summary provider.
pub trait DataSource: Send + Sync {
    fn explore(&self, path: &str, sort: SortKey) -> Result<ExploreResult>;

    fn summary(&self, path: &str) -> Result<Summary>;
}

/// Encode a navigation path as a single URL segment. The root is the empty segment.
pub fn encode_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        String::new()
    } else {
        urlencoding::encode(path).into_owned()
    }
}

pub struct HttpDataSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpDataSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: reqwest::blocking::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn explore_url(&self, path: &str, sort: SortKey) -> String {
        format!(
            "{}/explore/{}?sort={}",
            self.base_url,
            encode_path(path),
            sort.as_query()
        )
    }

    pub fn summary_url(&self, path: &str) -> String {
        format!("{}/summary/{}", self.base_url, encode_path(path))
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url, "GET");
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }
        let body = response.bytes()?;
        decode_body(&body)
    }
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::EmptyBody);
    }
    Ok(serde_json::from_slice(body)?)
}

impl DataSource for HttpDataSource {
    fn explore(&self, path: &str, sort: SortKey) -> Result<ExploreResult> {
        self.get_json(&self.explore_url(path, sort))
    }

    fn summary(&self, path: &str) -> Result<Summary> {
        self.get_json::<Summary>(&self.summary_url(path))?.validate()
    }
}
