//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::core::errors::{ChefError, Result};

/// Environment variable pointing at the translation credentials file
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Configuration for the chef
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChefConfig {
    pub base_url: String,
    pub start_path: String,
    pub data_dir: PathBuf,
    pub web_cache_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub translate_endpoint: String,
    pub source_language: String,
    pub model: String,
    pub format: String,
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    #[serde(skip)]
    pub credentials_path: Option<PathBuf>,
}

impl Default for ChefConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.engageny.org".to_string(),
            start_path: "/common-core-curriculum".to_string(),
            data_dir: PathBuf::from("chefdata"),
            web_cache_dir: PathBuf::from(".webcache"),
            cache_dir: PathBuf::from("chefdata"),
            translate_endpoint: "https://translation.googleapis.com/language/translate/v2"
                .to_string(),
            source_language: "en".to_string(),
            model: "nmt".to_string(),
            format: "text".to_string(),
            max_concurrent: 4,
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_ms: 30000,
            credentials_path: None,
        }
    }
}

impl ChefConfig {
    /// Load configuration from `chef.{toml,json,yaml}` and `CHEF_*` variables
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("chef").required(false))
            .add_source(config::Environment::with_prefix("CHEF").try_parsing(true))
            .build()
            .map_err(|e| ChefError::ConfigError {
                message: e.to_string(),
            })?;

        let mut config: Self = settings.try_deserialize().map_err(|e| ChefError::ConfigError {
            message: e.to_string(),
        })?;
        config.credentials_path = std::env::var_os(CREDENTIALS_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        debug!("Loaded configuration: {:?}", config);
        config.validate()?;
        info!("Content host: {}", config.base_url);
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ChefError::ConfigError {
                message: "base_url is required".to_string(),
            });
        }

        if url::Url::parse(&self.base_url).is_err() {
            return Err(ChefError::ConfigError {
                message: format!("base_url `{}` is not a valid URL", self.base_url),
            });
        }

        if self.translate_endpoint.is_empty() {
            return Err(ChefError::ConfigError {
                message: "translate_endpoint is required".to_string(),
            });
        }

        if self.max_concurrent == 0 {
            return Err(ChefError::ConfigError {
                message: "max_concurrent must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Page the crawl starts from
    pub fn start_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.start_path)
    }

    /// Host whose pages are cached forever
    pub fn content_host(&self) -> Option<String> {
        url::Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    /// Directory holding the crawl and scrape JSON trees
    pub fn trees_dir(&self) -> PathBuf {
        self.data_dir.join("trees")
    }

    /// Directory PDFs are extracted into
    pub fn pdfs_dir(&self) -> PathBuf {
        self.data_dir.join("pdfs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let config = ChefConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_base_url() {
        let config = ChefConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_concurrency() {
        let config = ChefConfig {
            max_concurrent: 0,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_locations() {
        let config = ChefConfig::default();
        assert_eq!(
            config.start_url(),
            "https://www.engageny.org/common-core-curriculum"
        );
        assert_eq!(config.content_host().as_deref(), Some("www.engageny.org"));
        assert_eq!(config.trees_dir(), PathBuf::from("chefdata/trees"));
        assert_eq!(config.pdfs_dir(), PathBuf::from("chefdata/pdfs"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ChefConfig = serde_json::from_str(r#"{"max_retries": 7}"#).unwrap();
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.model, "nmt");
        assert!(config.credentials_path.is_none());
    }
}
