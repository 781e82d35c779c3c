use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::domain::FeedEntry;
use crate::error::HarvestError;

pub trait FeedSource: Send + Sync {
    fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>, HarvestError>;
}

pub trait ArchiveSource: Send + Sync {
    /// Streams the archive at `url` into `destination`.
    fn download(&self, url: &str, destination: &Path) -> Result<(), HarvestError>;
}

#[derive(Clone)]
pub struct PlaziHttpClient {
    client: Client,
}

impl PlaziHttpClient {
    pub fn new() -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("plazi-harvest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HarvestError::FeedHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| HarvestError::FeedHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl FeedSource for PlaziHttpClient {
    fn fetch_feed(&self, url: &str) -> Result<Vec<FeedEntry>, HarvestError> {
        debug!(url, "requesting feed");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HarvestError::FeedHttp(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = status_and_body(response, "feed request failed");
            return Err(HarvestError::FeedStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| HarvestError::FeedHttp(err.to_string()))?;
        parse_feed(&body)
    }
}

impl ArchiveSource for PlaziHttpClient {
    fn download(&self, url: &str, destination: &Path) -> Result<(), HarvestError> {
        debug!(url, destination = %destination.display(), "downloading archive");
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HarvestError::ArchiveHttp(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = status_and_body(response, "archive request failed");
            return Err(HarvestError::ArchiveStatus { status, message });
        }
        let mut file =
            File::create(destination).map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| HarvestError::ArchiveHttp(err.to_string()))?;
        Ok(())
    }
}

/// The feed body is a JSON array of entries.
pub fn parse_feed(body: &str) -> Result<Vec<FeedEntry>, HarvestError> {
    serde_json::from_str(body).map_err(|err| HarvestError::FeedParse(err.to_string()))
}

fn status_and_body(response: Response, fallback: &str) -> (u16, String) {
    let status = response.status().as_u16();
    let message = response.text().unwrap_or_else(|_| fallback.to_string());
    (status, message)
}
