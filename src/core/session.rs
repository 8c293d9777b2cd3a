//! HTTP session with a forever-cache for the content host

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error};

use crate::core::config::ChefConfig;
use crate::core::errors::{ChefError, Result};

/// User-Agent string for page requests
const USER_AGENT: &str = concat!("engageny-chef/", env!("CARGO_PKG_VERSION"));

/// A fetched response body
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: Vec<u8>,
    pub from_cache: bool,
}

impl Fetched {
    /// Body decoded as (lossy) UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Page fetcher; successful responses from the content host are kept on disk
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: reqwest::Client,
    cache_dir: PathBuf,
    forever_host: Option<String>,
}

impl HttpSession {
    pub fn new(config: &ChefConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ChefError::NetworkError {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            cache_dir: config.web_cache_dir.clone(),
            forever_host: config.content_host(),
        })
    }

    fn is_cacheable(&self, url: &str) -> bool {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        matches!((host, &self.forever_host), (Some(h), Some(f)) if &h == f)
    }

    fn cache_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        self.cache_dir.join(name)
    }

    /// GET `url`, from the web cache when possible
    pub async fn get(&self, url: &str) -> Result<Fetched> {
        let cacheable = self.is_cacheable(url);
        let cache_path = self.cache_path(url);

        if cacheable {
            if let Ok(body) = tokio::fs::read(&cache_path).await {
                return Ok(Fetched {
                    status: 200,
                    body,
                    from_cache: true,
                });
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ChefError::NetworkError {
                message: format!("{url}: {e}"),
            })?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        if status != 200 {
            error!("STATUS: {}, URL: {}", status, url);
        } else {
            debug!("NOT CACHED: {}", url);
            if cacheable {
                store(&cache_path, &body).await?;
            }
        }

        Ok(Fetched {
            status,
            body,
            from_cache: false,
        })
    }
}

async fn store(path: &Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ChefError::FileError {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
    }
    // Readers only ever see complete bodies
    let partial = path.with_extension("part");
    tokio::fs::write(&partial, body)
        .await
        .map_err(|e| ChefError::FileError {
            path: partial.display().to_string(),
            message: e.to_string(),
        })?;
    tokio::fs::rename(&partial, path)
        .await
        .map_err(|e| ChefError::FileError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}
