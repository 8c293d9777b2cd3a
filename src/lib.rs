//! EngageNY chef - crawl engageny.org, translate its metadata and package it
//! as a JSON channel tree.
//!
//! The pipeline has two stages: the crawl builds a web resource tree from the
//! curriculum tables of contents, the scrape visits every page of that tree
//! and writes the translated channel tree for one target language.

#![forbid(unsafe_code)]

pub mod chef;
pub mod cli;
pub mod core;
pub mod utils;

// Re-export key types for convenience
pub use chef::{EngageNyChef, RunSummary, Stage};
pub use crate::core::{
    cache::TranslationCache,
    client::{CachingTranslator, GoogleTranslator, Translate},
    config::ChefConfig,
    credentials::Credentials,
    errors::{ChefError, Result},
    models::{ChannelTree, ContentNode, Language, Translation, WebResourceTree},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
