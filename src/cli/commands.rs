//! CLI argument definitions and the run handler

use clap::Parser;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::chef::{EngageNyChef, Stage};
use crate::core::cache::TranslationCache;
use crate::core::client::{CachingTranslator, GoogleTranslator};
use crate::core::config::ChefConfig;
use crate::core::credentials::Credentials;
use crate::core::errors::{ChefError, Result};
use crate::core::models::Language;
use crate::utils::text::mask_secret;

/// Option keys the chef understands
const KNOWN_OPTIONS: &[&str] = &["lang"];

/// EngageNY chef: crawl engageny.org and build a translated channel tree
#[derive(Parser, Debug, Clone)]
#[command(name = "engageny-chef", version, about, long_about = None)]
pub struct ChefArgs {
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Discard the web cache and the translation cache of the language before running
    #[arg(long)]
    pub reset: bool,

    /// Studio token, or a file containing it
    #[arg(long)]
    pub token: Option<String>,

    /// Pipeline stage to run
    #[arg(long, value_enum, default_value_t = Stage::All)]
    pub stage: Stage,

    /// Extra options as key=value, e.g. lang=es
    #[arg(value_name = "KEY=VALUE")]
    pub options: Vec<String>,
}

/// Split `key=value` options; the last value of a repeated key wins
pub fn parse_options(options: &[String]) -> Result<BTreeMap<String, String>> {
    let mut parsed = BTreeMap::new();
    for option in options {
        let Some((key, value)) = option.split_once('=') else {
            return Err(ChefError::InvalidOption {
                option: option.clone(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ChefError::InvalidOption {
                option: option.clone(),
            });
        }
        if !KNOWN_OPTIONS.contains(&key) {
            warn!("Ignoring unknown option {}", key);
        }
        parsed.insert(key.to_string(), value.trim().to_string());
    }
    Ok(parsed)
}

/// The token itself, or the trimmed content of the file it names
pub fn resolve_token(token: &str) -> Result<String> {
    let path = Path::new(token);
    let resolved = if path.is_file() {
        std::fs::read_to_string(path)
            .map_err(|e| ChefError::FileError {
                path: token.to_string(),
                message: e.to_string(),
            })?
            .trim()
            .to_string()
    } else {
        token.trim().to_string()
    };

    if resolved.is_empty() {
        return Err(ChefError::ConfigError {
            message: "--token must not be empty".to_string(),
        });
    }
    Ok(resolved)
}

/// Remove the web cache and the language's translation cache
pub fn reset_caches(config: &ChefConfig, lang: &Language) -> Result<()> {
    if config.web_cache_dir.exists() {
        std::fs::remove_dir_all(&config.web_cache_dir).map_err(|e| ChefError::FileError {
            path: config.web_cache_dir.display().to_string(),
            message: e.to_string(),
        })?;
        info!("Removed web cache {}", config.web_cache_dir.display());
    }

    let cache_file = TranslationCache::file_path(&config.cache_dir, lang.code());
    if cache_file.exists() {
        std::fs::remove_file(&cache_file).map_err(|e| ChefError::FileError {
            path: cache_file.display().to_string(),
            message: e.to_string(),
        })?;
        info!("Removed translation cache {}", cache_file.display());
    }
    Ok(())
}

/// Validate the invocation, then run the requested stages
pub async fn handle_run(args: ChefArgs) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let start_time = Instant::now();

    let options = parse_options(&args.options)?;
    let lang = Language::parse(options.get("lang").map(String::as_str))?;

    if let Some(token) = args.token.as_deref() {
        let token = resolve_token(token)?;
        info!("Studio token accepted: {}", mask_secret(&token));
    }

    let config = ChefConfig::load()?;
    let credentials = Credentials::from_path(config.credentials_path.as_deref())?;

    if args.reset {
        reset_caches(&config, &lang)?;
    }

    info!("Starting EngageNY chef");
    info!("Language: {}", lang);
    info!("Stage: {:?}", args.stage);

    let translator = GoogleTranslator::new(&config, &lang, credentials)?;
    let cache = TranslationCache::open(&config.cache_dir, lang.code())?;
    let chef = EngageNyChef::new(
        Arc::new(config),
        lang,
        CachingTranslator::new(translator, cache),
    )?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Running {:?} stage", args.stage));

    let summary = match chef.run(args.stage).await {
        Ok(summary) => summary,
        Err(e) => {
            pb.abandon_with_message("Failed");
            return Err(e.into());
        }
    };
    pb.finish_with_message("Completed");

    let duration = start_time.elapsed();
    info!("Completed in {:?}", duration);

    println!("\n✅ EngageNY chef finished!");
    if let Some(path) = &summary.web_resource_tree {
        println!("   Web resource tree: {}", path.display());
    }
    if let Some(path) = &summary.json_tree {
        println!("   Channel tree: {} ({} nodes)", path.display(), summary.nodes);
    }
    println!(
        "   Translation cache: {} hits, {} misses",
        summary.cache.hits, summary.cache.misses
    );
    println!("   Time: {:?}", duration);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> ChefArgs {
        ChefArgs::try_parse_from(std::iter::once("engageny-chef").chain(argv.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_token_and_lang_are_accepted() {
        let parsed = args(&["--token=abc123", "lang=es"]);
        assert_eq!(parsed.token.as_deref(), Some("abc123"));
        assert_eq!(parsed.options, vec!["lang=es".to_string()]);
        assert_eq!(parsed.stage, Stage::All);
        assert!(!parsed.reset);

        let parsed = args(&["-v", "--reset", "--stage", "crawl", "lang=zh-CN"]);
        assert!(parsed.verbose);
        assert!(parsed.reset);
        assert_eq!(parsed.stage, Stage::Crawl);
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options(&["lang=ES".to_string(), "extra=1".to_string()]).unwrap();
        assert_eq!(options.get("lang").map(String::as_str), Some("ES"));
        assert_eq!(options.len(), 2);

        let err = parse_options(&["lang".to_string()]).unwrap_err();
        assert!(matches!(err, ChefError::InvalidOption { .. }));
        assert!(parse_options(&["=es".to_string()]).is_err());
    }

    #[test]
    fn test_resolve_token() {
        assert_eq!(resolve_token("abc").unwrap(), "abc");
        assert!(resolve_token("  ").is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.txt");
        std::fs::write(&path, "from-file\n").unwrap();
        assert_eq!(resolve_token(path.to_str().unwrap()).unwrap(), "from-file");
    }

    #[test]
    fn test_reset_caches() {
        let dir = tempfile::tempdir().unwrap();
        let config = ChefConfig {
            web_cache_dir: dir.path().join(".webcache"),
            cache_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let lang = Language::parse(Some("es")).unwrap();
        std::fs::create_dir_all(&config.web_cache_dir).unwrap();
        std::fs::write(config.web_cache_dir.join("page"), "x").unwrap();
        let es_cache = TranslationCache::file_path(dir.path(), "es");
        let ar_cache = TranslationCache::file_path(dir.path(), "ar");
        std::fs::write(&es_cache, "").unwrap();
        std::fs::write(&ar_cache, "").unwrap();

        reset_caches(&config, &lang).unwrap();
        assert!(!config.web_cache_dir.exists());
        assert!(!es_cache.exists());
        assert!(ar_cache.exists());
    }

    #[tokio::test]
    async fn test_missing_lang_fails_first() {
        let err = handle_run(args(&["--token=abc"])).await.unwrap_err();
        let err = err.downcast::<ChefError>().unwrap();
        assert_eq!(
            err.to_string(),
            "`lang` is a required argument, choose from one of: ar, bn, en, es, zh-cn, zh-tw"
        );
    }

    #[tokio::test]
    async fn test_unsupported_lang() {
        let err = handle_run(args(&["lang=fr"])).await.unwrap_err();
        assert!(matches!(
            err.downcast::<ChefError>().unwrap(),
            ChefError::UnsupportedLanguage { .. }
        ));
    }
}
