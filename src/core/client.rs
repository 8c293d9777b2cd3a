//! Async translation client with retry logic, plus the caching wrapper

use serde::Deserialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::cache::TranslationCache;
use crate::core::config::ChefConfig;
use crate::core::credentials::{Credentials, TokenProvider};
use crate::core::errors::{ChefError, Result};
use crate::core::models::{CacheStats, Language, Translation};

/// Longest string the translation API accepts in one request
pub const MAX_LENGTH: usize = 5000;

/// Wait before retry number `attempt` (1-based): the server's Retry-After
/// when it sent one, exponential backoff from `base_ms` otherwise
fn retry_delay(base_ms: u64, attempt: u32, error: &ChefError) -> Duration {
    match error {
        ChefError::RateLimitError {
            retry_after: Some(secs),
        } => Duration::from_secs(*secs),
        _ => Duration::from_millis(
            base_ms.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1))),
        ),
    }
}

/// Anything that can translate a string into the run's target language
pub trait Translate: Send + Sync {
    fn translate(&self, text: &str) -> impl Future<Output = Result<Translation>> + Send;
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

/// Cloud Translation v2 client
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    config: Arc<ChefConfig>,
    target_lang: String,
    semaphore: Arc<Semaphore>,
    tokens: Arc<TokenProvider>,
}

impl GoogleTranslator {
    /// Create a new translator for `target`
    pub fn new(config: &ChefConfig, target: &Language, credentials: Credentials) -> Result<Self> {
        config.validate()?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        let tokens = Arc::new(TokenProvider::new(client.clone(), credentials));

        Ok(Self {
            client,
            config: Arc::new(config.clone()),
            target_lang: target.api_code(),
            semaphore,
            tokens,
        })
    }

    /// Split `text` into pieces the API accepts
    pub fn chunks(text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(MAX_LENGTH)
            .map(|chunk| chunk.iter().collect())
            .collect()
    }

    fn is_nop(&self) -> bool {
        self.config.source_language.eq_ignore_ascii_case(&self.target_lang)
    }

    /// Translate several strings, preserving order
    pub async fn translate_many(&self, texts: &[String]) -> Result<Vec<Translation>> {
        if self.is_nop() {
            return Ok(texts
                .iter()
                .map(|t| Translation::nop(t.as_str(), &self.config.source_language))
                .collect());
        }

        let pending: Vec<String> = texts.iter().filter(|t| !t.is_empty()).cloned().collect();
        let mut translated = if pending.is_empty() {
            Vec::new()
        } else {
            self.translate_with_retry(&pending).await?
        }
        .into_iter();

        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            if text.is_empty() {
                results.push(Translation::nop("", &self.config.source_language));
                continue;
            }
            let translation = translated.next().ok_or_else(|| ChefError::InvalidResponseError {
                message: format!("expected {} translations", pending.len()),
            })?;
            results.push(translation);
        }

        Ok(results)
    }

    async fn translate_with_retry(&self, texts: &[String]) -> Result<Vec<Translation>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ChefError::InternalError(e.to_string()))?;

        let mut attempt = 0;
        let mut delay = None;
        loop {
            if let Some(delay) = delay.take() {
                debug!(
                    "Retry attempt {} for {} strings in {:?}",
                    attempt,
                    texts.len(),
                    delay
                );
                sleep(delay).await;
            }

            match self.send_request(texts).await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("Successfully translated after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    warn!("Translation request failed: {}", e);
                    attempt += 1;
                    delay = Some(retry_delay(self.config.retry_delay_ms, attempt, &e));
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_request(&self, texts: &[String]) -> Result<Vec<Translation>> {
        let token = self.tokens.access_token().await?;
        let body = serde_json::json!({
            "q": texts,
            "target": self.target_lang,
            "source": self.config.source_language,
            "format": self.config.format,
            "model": self.config.model,
        });

        let response = self
            .client
            .post(&self.config.translate_endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChefError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status();

        if status.is_success() {
            let parsed: TranslateResponse =
                response
                    .json()
                    .await
                    .map_err(|e| ChefError::InvalidResponseError {
                        message: e.to_string(),
                    })?;

            if parsed.data.translations.len() != texts.len() {
                return Err(ChefError::InvalidResponseError {
                    message: format!(
                        "sent {} strings, received {} translations",
                        texts.len(),
                        parsed.data.translations.len()
                    ),
                });
            }
            return Ok(parsed.data.translations);
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            return Err(ChefError::RateLimitError { retry_after });
        }

        let message = response.text().await.unwrap_or_default();
        Err(ChefError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

impl Translate for GoogleTranslator {
    /// Text longer than [`MAX_LENGTH`] is sent in pieces and joined back
    async fn translate(&self, text: &str) -> Result<Translation> {
        if text.chars().count() <= MAX_LENGTH {
            let mut results = self.translate_many(&[text.to_string()]).await?;
            return results.pop().ok_or_else(|| ChefError::InvalidResponseError {
                message: "empty translation response".to_string(),
            });
        }

        let pieces = Self::chunks(text);
        debug!("Translating {} chars in {} pieces", text.chars().count(), pieces.len());
        let results = self.translate_many(&pieces).await?;
        let first = results.first().cloned();
        Ok(Translation {
            translated_text: results.into_iter().map(|t| t.translated_text).collect(),
            detected_source_language: first
                .as_ref()
                .and_then(|t| t.detected_source_language.clone()),
            model: first.and_then(|t| t.model),
        })
    }
}

/// Serves repeated strings from the translation cache
#[derive(Debug)]
pub struct CachingTranslator<T> {
    translator: T,
    cache: Mutex<TranslationCache>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Translate> CachingTranslator<T> {
    pub fn new(translator: T, cache: TranslationCache) -> Self {
        Self {
            translator,
            cache: Mutex::new(cache),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Hit/miss counts since creation
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Flush the underlying cache
    pub async fn close(&self) -> Result<()> {
        self.cache.lock().await.close()
    }
}

impl<T: Translate> Translate for CachingTranslator<T> {
    async fn translate(&self, text: &str) -> Result<Translation> {
        if let Some(found) = self.cache.lock().await.get(text).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(found);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let translated = self.translator.translate(text).await?;
        self.cache.lock().await.add(text, translated.clone())?;
        Ok(translated)
    }
}
