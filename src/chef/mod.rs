//! The EngageNY chef: crawl the curriculum site, then scrape it into a channel tree

pub mod archive;
pub mod crawl;
pub mod page;
pub mod paths;
pub mod scrape;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::core::client::{CachingTranslator, Translate};
use crate::core::config::ChefConfig;
use crate::core::errors::{ChefError, Result};
use crate::core::models::{CacheStats, Language};
use crate::core::session::HttpSession;

/// Which part of the pipeline to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Stage {
    /// Crawl, then scrape
    #[default]
    All,
    /// Only build the web resource tree
    Crawl,
    /// Only build the channel tree from an existing web resource tree
    Scrape,
}

/// What a run produced
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub web_resource_tree: Option<PathBuf>,
    pub json_tree: Option<PathBuf>,
    /// Topic and document nodes in the channel tree
    pub nodes: usize,
    pub cache: CacheStats,
}

pub struct EngageNyChef<T> {
    config: Arc<ChefConfig>,
    session: HttpSession,
    translator: CachingTranslator<T>,
    lang: Language,
}

impl<T: Translate> EngageNyChef<T> {
    pub fn new(
        config: Arc<ChefConfig>,
        lang: Language,
        translator: CachingTranslator<T>,
    ) -> Result<Self> {
        let session = HttpSession::new(&config)?;
        Ok(Self {
            config,
            session,
            translator,
            lang,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.translator.stats()
    }

    /// Run the requested stages and flush the translation cache
    pub async fn run(&self, stage: Stage) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        if matches!(stage, Stage::All | Stage::Crawl) {
            self.crawl().await?;
            summary.web_resource_tree = Some(self.web_resource_tree_path());
        }

        if matches!(stage, Stage::All | Stage::Scrape) {
            let tree = self.scrape().await?;
            summary.nodes = tree.children.iter().map(|c| c.count()).sum();
            summary.json_tree = Some(self.json_tree_path());
        }

        self.translator.close().await?;
        summary.cache = self.cache_stats();
        info!(
            "Translation cache: {} hits, {} misses",
            summary.cache.hits, summary.cache.misses
        );
        Ok(summary)
    }

    /// Location of the crawl output
    pub fn web_resource_tree_path(&self) -> PathBuf {
        self.config.trees_dir().join(crawl::CRAWLING_STAGE_OUTPUT)
    }

    /// Location of the scrape output for the run's language
    pub fn json_tree_path(&self) -> PathBuf {
        self.config.trees_dir().join(format!(
            "{}_{}.json",
            scrape::SCRAPING_STAGE_OUTPUT,
            self.lang.code()
        ))
    }

    /// Body of `url`; error pages are parsed like any other page
    async fn fetch_page(&self, url: &str) -> Result<String> {
        Ok(self.session.get(url).await?.text())
    }
}

/// Write `value` as pretty JSON, creating parent directories
pub(crate) async fn write_json<S: Serialize>(path: &Path, value: &S) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ChefError::FileError {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
    }

    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| ChefError::FileError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}
