//! Persistent, per-language translation cache
//!
//! Entries live in an append-only JSON Lines log. Opening the cache replays the
//! log; a torn last line (interrupted write) is skipped.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::errors::{ChefError, Result};
use crate::core::models::Translation;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum LogRecord {
    Put { key: String, value: Translation },
    Remove { key: String },
}

/// On-disk key/value store of translations, keyed by SHA-256 of the source text
#[derive(Debug)]
pub struct TranslationCache {
    path: PathBuf,
    entries: HashMap<String, Translation>,
    writer: BufWriter<File>,
}

impl TranslationCache {
    /// Cache file for `lang` inside `dir`
    pub fn file_path(dir: &Path, lang: &str) -> PathBuf {
        dir.join(format!("translation-cache-{}.jsonl", lang))
    }

    /// Open (or create) the cache for `lang` inside `dir`
    pub fn open(dir: &Path, lang: &str) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|e| ChefError::FileError {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;

        let path = Self::file_path(dir, lang);
        let (entries, torn) = if path.exists() {
            Self::replay(&path)?
        } else {
            (HashMap::new(), false)
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        if torn {
            // Terminate the partial record so the next append starts on its own line
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        info!("Translation cache {} holds {} entries", path.display(), entries.len());

        Ok(Self {
            path,
            entries,
            writer,
        })
    }

    fn replay(path: &Path) -> Result<(HashMap<String, Translation>, bool)> {
        let content = std::fs::read_to_string(path)?;
        let torn = !content.is_empty() && !content.ends_with('\n');
        let mut entries = HashMap::new();

        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogRecord>(line) {
                Ok(LogRecord::Put { key, value }) => {
                    entries.insert(key, value);
                }
                Ok(LogRecord::Remove { key }) => {
                    entries.remove(&key);
                }
                Err(e) => warn!("Skipping corrupt cache line {} in {}: {}", number + 1, path.display(), e),
            }
        }

        Ok((entries, torn))
    }

    fn genkey(text: &str) -> String {
        let digest = Sha256::digest(text.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    fn append(&mut self, record: &LogRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Store the translation of `text`
    pub fn add(&mut self, text: &str, translation: Translation) -> Result<()> {
        let key = Self::genkey(text);
        self.append(&LogRecord::Put {
            key: key.clone(),
            value: translation.clone(),
        })?;
        self.entries.insert(key, translation);
        Ok(())
    }

    /// Forget the translation of `text`
    pub fn remove(&mut self, text: &str) -> Result<()> {
        let key = Self::genkey(text);
        if self.entries.remove(&key).is_some() {
            self.append(&LogRecord::Remove { key })?;
        }
        Ok(())
    }

    /// Look up the translation of `text`
    pub fn get(&self, text: &str) -> Option<&Translation> {
        self.entries.get(&Self::genkey(text))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush pending writes
    pub fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        debug!("Closed translation cache {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(text: &str) -> Translation {
        Translation {
            translated_text: text.to_string(),
            detected_source_language: Some("en".to_string()),
            model: Some("nmt".to_string()),
        }
    }

    #[test]
    fn test_add() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = TranslationCache::open(dir.path(), "es").unwrap();

        db.add("hola", translation("carnal!")).unwrap();
        let found = db.get("hola").unwrap();
        assert_eq!(found.translated_text, "carnal!");
        assert!(db.get("adios").is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut db = TranslationCache::open(dir.path(), "es").unwrap();
            db.add("one", translation("uno")).unwrap();
            db.add("two", translation("dos")).unwrap();
            db.remove("one").unwrap();
            db.close().unwrap();
        }

        let db = TranslationCache::open(dir.path(), "es").unwrap();
        assert_eq!(db.len(), 1);
        assert!(db.get("one").is_none());
        assert_eq!(db.get("two").unwrap().translated_text, "dos");
    }

    #[test]
    fn test_languages_are_separate() {
        let dir = tempfile::tempdir().unwrap();
        let mut es = TranslationCache::open(dir.path(), "es").unwrap();
        es.add("one", translation("uno")).unwrap();

        let ar = TranslationCache::open(dir.path(), "ar").unwrap();
        assert!(ar.is_empty());
        assert_ne!(es.path(), ar.path());
    }

    #[test]
    fn test_torn_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut db = TranslationCache::open(dir.path(), "bn").unwrap();
            db.add("one", translation("1")).unwrap();
        }
        let path = TranslationCache::file_path(dir.path(), "bn");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"op":"put","key":"abc","val"#).unwrap();

        {
            let mut db = TranslationCache::open(dir.path(), "bn").unwrap();
            assert_eq!(db.len(), 1);
            db.add("two", translation("2")).unwrap();
        }

        let db = TranslationCache::open(dir.path(), "bn").unwrap();
        assert_eq!(db.len(), 2);
        assert_eq!(db.get("two").unwrap().translated_text, "2");
    }

    #[test]
    fn test_key_is_sha256_hex() {
        assert_eq!(
            TranslationCache::genkey(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
