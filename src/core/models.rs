//! Core data models: languages, translations and the two JSON trees

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::errors::{ChefError, Result};

/// Language codes the chef can produce a channel for
pub const SUPPORTED_LANGUAGES: &[&str] = &["ar", "bn", "en", "es", "zh-cn", "zh-tw"];

/// Kind tag of the crawl output
pub const WEB_RESOURCE_TREE_KIND: &str = "EngageNYWebResourceTree";

/// Target language of a chef run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language(String);

impl Language {
    /// Validate the `lang` option (case-insensitive)
    pub fn parse(lang: Option<&str>) -> Result<Self> {
        let supported = SUPPORTED_LANGUAGES.join(", ");
        let lang = match lang.map(str::trim).filter(|l| !l.is_empty()) {
            Some(lang) => lang.to_lowercase(),
            None => return Err(ChefError::MissingLanguage { supported }),
        };

        if !SUPPORTED_LANGUAGES.contains(&lang.as_str()) {
            return Err(ChefError::UnsupportedLanguage { lang, supported });
        }

        Ok(Self(lang))
    }

    /// Lower-case code as given on the command line
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Code in the form the translation API expects
    pub fn api_code(&self) -> String {
        match self.0.split_once('-') {
            Some((lang, region)) => format!("{}-{}", lang, region.to_uppercase()),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One translated string as returned by the translation API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub translated_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_source_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Translation {
    /// Untranslated passthrough, used when source and target match
    pub fn nop(text: impl Into<String>, source_lang: &str) -> Self {
        Self {
            translated_text: text.into(),
            detected_source_language: Some(source_lang.to_string()),
            model: Some("nop".to_string()),
        }
    }
}

/// Translation cache hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

// ---------------------------------------------------------------------------
// Web resource tree (crawl output)
// ---------------------------------------------------------------------------

/// Recipe of what the scrape stage downloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResourceTree {
    pub kind: String,
    pub title: String,
    pub language: String,
    pub children: Subjects,
}

impl WebResourceTree {
    /// Assemble the tree from both subject hierarchies
    pub fn new(ela: Vec<ElaGrade>, math: Vec<MathGrade>) -> Self {
        Self {
            kind: WEB_RESOURCE_TREE_KIND.to_string(),
            title: "Engage NY Web Resource Tree (ELS and CCSSM)".to_string(),
            language: "en".to_string(),
            children: Subjects {
                math: MathSubject { grades: math },
                ela: ElaSubject { grades: ela },
            },
        }
    }

    /// Reject JSON that is not a crawl output
    pub fn check_kind(&self) -> Result<()> {
        if self.kind != WEB_RESOURCE_TREE_KIND {
            return Err(ChefError::InvalidTree {
                message: format!(
                    "expected kind {}, found {}",
                    WEB_RESOURCE_TREE_KIND, self.kind
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subjects {
    pub math: MathSubject,
    pub ela: ElaSubject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathSubject {
    pub grades: Vec<MathGrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElaSubject {
    pub grades: Vec<ElaGrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElaGrade {
    pub kind: String,
    pub url: String,
    pub title: String,
    pub strands_or_modules: Vec<StrandOrModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandOrModule {
    pub kind: String,
    pub title: String,
    pub url: String,
    pub domains_or_units: Vec<DomainOrUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainOrUnit {
    pub kind: String,
    pub title: String,
    pub url: String,
    pub lessons_or_documents: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathGrade {
    pub kind: String,
    pub url: String,
    pub title: String,
    pub modules: Vec<MathModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathModule {
    pub kind: String,
    pub title: String,
    pub url: String,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub kind: String,
    pub title: String,
    pub url: String,
    pub lessons: Vec<Link>,
}

/// Leaf of the web resource tree: a lesson or document page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub kind: String,
    pub title: String,
    pub url: String,
}

// ---------------------------------------------------------------------------
// Channel tree (scrape output)
// ---------------------------------------------------------------------------

/// License attached to every document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub license_id: String,
    pub copyright_holder: String,
    pub description: String,
}

impl License {
    /// CC BY-NC-SA, held by Engage NY
    pub fn engageny() -> Self {
        Self {
            license_id: "CC BY-NC-SA".to_string(),
            copyright_holder: "Engage NY".to_string(),
            description: String::new(),
        }
    }
}

/// Root of the JSON tree handed to the content platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelTree {
    pub source_domain: String,
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub language: String,
    pub thumbnail: String,
    pub children: Vec<ContentNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentNode {
    Topic(TopicNode),
    Document(DocumentNode),
}

impl ContentNode {
    pub fn title(&self) -> &str {
        match self {
            ContentNode::Topic(t) => &t.title,
            ContentNode::Document(d) => &d.title,
        }
    }

    /// Number of nodes in this subtree, itself included
    pub fn count(&self) -> usize {
        match self {
            ContentNode::Topic(t) => 1 + t.children.iter().map(ContentNode::count).sum::<usize>(),
            ContentNode::Document(_) => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicNode {
    pub source_id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub children: Vec<ContentNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_fields: Option<ExtraFields>,
}

impl TopicNode {
    pub fn new(source_id: impl Into<String>, title: String, description: String) -> Self {
        Self {
            source_id: source_id.into(),
            title,
            description,
            thumbnail: None,
            license: None,
            language: None,
            children: Vec::new(),
            extra_fields: None,
        }
    }
}

/// Links to translated bundles of a math module, as (language, url)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraFields {
    pub translations: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub source_id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub license: License,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub files: Vec<FileRef>,
}

impl DocumentNode {
    /// Document backed by a single PDF at `path`
    pub fn pdf(
        source_id: impl Into<String>,
        title: String,
        description: String,
        path: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            title,
            description,
            thumbnail: None,
            license: License::engageny(),
            author: None,
            language: None,
            files: vec![FileRef {
                file_type: "document".to_string(),
                path: path.into(),
                language: None,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
    pub file_type: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}
