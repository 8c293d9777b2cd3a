//! Scrape stage: turn the web resource tree into the channel tree

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, instrument, warn};

use crate::chef::archive::{download_zip_file, ExtractedPdf};
use crate::chef::page::{Anchor, PageInfo};
use crate::chef::paths::{
    bundle_item_title, is_module_file, make_fully_qualified_url, module_file, strip_byte_size,
    strip_token, suffix, unit_file, NamedFile,
};
use crate::chef::{write_json, EngageNyChef};
use crate::core::client::{Translate, MAX_LENGTH};
use crate::core::errors::{ChefError, Result};
use crate::core::models::{
    ChannelTree, ContentNode, DocumentNode, DomainOrUnit, ElaGrade, ExtraFields, License, Link,
    MathGrade, MathModule, StrandOrModule, Topic, TopicNode, WebResourceTree,
};
use crate::utils::text::truncate_chars;

/// Prefix of the scrape output file name; the language code is appended
pub const SCRAPING_STAGE_OUTPUT: &str = "ricecooker_json_tree";

const CHANNEL_DESCRIPTION: &str = "EngageNY Common Core Curriculum Content... ELA and CCSSM combined";
const CHANNEL_THUMBNAIL: &str = "./content/engageny_logo.png";
const AUTHOR: &str = "Engage NY";

static PDF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/file/.+/(?P<filename>.+\.pdf).*").unwrap());
static ELA_MODULE_ZIP_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/file/\d+/download/.*-\w+-pdf.zip).*$").unwrap());
static SUPPORTED_TRANSLATIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Spanish|Simplified-Chinese|Traditional-Chinese|Arabic|Bengali|Haitian-Creole)-pdf.zip")
        .unwrap()
});

const MODULE_OVERVIEW_NAMES: [&str; 3] = ["module", "overview", "module-overview"];

/// Title of a resource link, falling back to the full text when it has no size suffix
fn title_from_link_text(text: &str) -> &str {
    strip_byte_size(text).unwrap_or_else(|| {
        warn!("No byte size in link text: {}", text);
        text
    })
}

/// Overview document first, then the rest in name order
fn overview_first(mut files: Vec<(String, DocumentNode)>, overview_names: &[&str]) -> Vec<ContentNode> {
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let overview = overview_names
        .iter()
        .find_map(|name| files.iter().rev().find(|(n, _)| n == name))
        .map(|(_, doc)| doc.clone());

    overview
        .into_iter()
        .chain(
            files
                .into_iter()
                .filter(|(name, _)| !overview_names.contains(&name.as_str()))
                .map(|(_, doc)| doc),
        )
        .map(ContentNode::Document)
        .collect()
}

/// `(language, url)` for each translated bundle linked from the resources pane
pub fn translations(info: &PageInfo, base_url: &str) -> Vec<(String, String)> {
    info.resources_matching(&SUPPORTED_TRANSLATIONS_RE)
        .into_iter()
        .filter_map(|anchor| {
            let caps = SUPPORTED_TRANSLATIONS_RE.captures(&anchor.href)?;
            Some((
                caps[1].replace('-', " "),
                make_fully_qualified_url(base_url, &anchor.href),
            ))
        })
        .collect()
}

impl<T: Translate> EngageNyChef<T> {
    /// Scrape every page of the web resource tree and store the channel tree
    #[instrument(skip_all, fields(lang = %self.lang))]
    pub async fn scrape(&self) -> Result<ChannelTree> {
        let web_resource_tree = self.load_web_resource_tree().await?;
        let channel_tree = self.build_channel_tree(&web_resource_tree).await?;

        let path = self.json_tree_path();
        write_json(&path, &channel_tree).await?;
        info!("Finished building {}", path.display());
        Ok(channel_tree)
    }

    /// Read the crawl output from disk
    pub async fn load_web_resource_tree(&self) -> Result<WebResourceTree> {
        let path = self.web_resource_tree_path();
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ChefError::FileError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let tree: WebResourceTree = serde_json::from_str(&content)?;
        tree.check_kind()?;
        Ok(tree)
    }

    /// Translate `msg`, keeping only what the translation API accepts
    pub async fn translate_text(&self, msg: &str) -> Result<String> {
        if msg.chars().count() >= MAX_LENGTH {
            warn!("Message is longer than the translation API limit, only its start is translated");
        }
        let translation = self
            .translator
            .translate(truncate_chars(msg, MAX_LENGTH))
            .await?;
        debug!(?translation);
        Ok(translation.translated_text)
    }

    async fn maybe_translate(&self, msg: &str, translate: bool) -> Result<String> {
        if translate {
            self.translate_text(msg).await
        } else {
            Ok(msg.to_string())
        }
    }

    async fn build_channel_tree(&self, web_resource_tree: &WebResourceTree) -> Result<ChannelTree> {
        let mut channel_tree = ChannelTree {
            source_domain: "engageny.org".to_string(),
            source_id: format!("engageny_{}", self.lang.code()),
            title: self.translate_text(&web_resource_tree.title).await?,
            description: self.translate_text(CHANNEL_DESCRIPTION).await?,
            language: self.lang.code().to_string(),
            thumbnail: CHANNEL_THUMBNAIL.to_string(),
            children: Vec::new(),
        };

        for grade in &web_resource_tree.children.ela.grades {
            let node = self.scrape_ela_grade(grade).await?;
            channel_tree.children.push(ContentNode::Topic(node));
        }
        for grade in &web_resource_tree.children.math.grades {
            let node = self.scrape_math_grade(grade).await?;
            channel_tree.children.push(ContentNode::Topic(node));
        }

        Ok(channel_tree)
    }

    async fn page_info(&self, url: &str) -> Result<PageInfo> {
        let html = self.fetch_page(url).await?;
        Ok(PageInfo::parse(&html))
    }

    async fn document_from_named_file(&self, file: NamedFile, path: &str) -> Result<(String, DocumentNode)> {
        let title = self.translate_text(&file.title).await?;
        Ok((
            file.name,
            DocumentNode::pdf(path, title.clone(), title, path),
        ))
    }

    /// A document per PDF link of the downloadable-resources pane
    async fn pdfs_from_downloadable_resources(&self, info: &PageInfo) -> Result<Vec<ContentNode>> {
        let mut documents = Vec::new();
        for anchor in info.resources_matching(&PDF_RE) {
            let url = make_fully_qualified_url(&self.config.base_url, &anchor.href);
            let title = self.translate_text(title_from_link_text(&anchor.text)).await?;
            let description = self.translate_text(&anchor.text).await?;
            documents.push(ContentNode::Document(DocumentNode::pdf(
                url.clone(),
                title,
                description,
                url,
            )));
        }
        Ok(documents)
    }

    // ELA

    async fn scrape_ela_grade(&self, grade: &ElaGrade) -> Result<TopicNode> {
        info!("Scraping {}", grade.title);
        let info = self.page_info(&grade.url).await?;
        let mut node = TopicNode::new(
            grade.url.clone(),
            self.translate_text(&grade.title).await?,
            self.translate_text(&info.description).await?,
        );

        for strand_or_module in &grade.strands_or_modules {
            let child = self.scrape_ela_strand_or_module(strand_or_module).await?;
            node.children.push(ContentNode::Topic(child));
        }
        Ok(node)
    }

    async fn scrape_ela_strand_or_module(&self, strand_or_module: &StrandOrModule) -> Result<TopicNode> {
        let url = &strand_or_module.url;
        let info = self.page_info(url).await?;
        let mut node = TopicNode::new(
            url.clone(),
            self.translate_text(&strand_or_module.title).await?,
            self.translate_text(&info.description).await?,
        );
        node.thumbnail = info.thumbnail.clone();

        let mut files = Vec::new();
        if info.resources.is_some() {
            match info.resources_matching(&ELA_MODULE_ZIP_FILE_RE).first() {
                Some(module_zip) => {
                    let zip_url = make_fully_qualified_url(&self.config.base_url, &module_zip.href);
                    if let Some(extracted) =
                        download_zip_file(&self.session, &zip_url, &self.config.pdfs_dir()).await?
                    {
                        let mut module_files = Vec::new();
                        for pdf in &extracted {
                            let key = pdf.bundle_path();
                            if !is_module_file(&key) {
                                continue;
                            }
                            if let Some(file) = module_file(&key) {
                                module_files.push(self.document_from_named_file(file, &pdf.path).await?);
                            }
                        }
                        node.children
                            .extend(overview_first(module_files, &MODULE_OVERVIEW_NAMES));
                        files = extracted;
                    }
                }
                None => {
                    let documents = self.pdfs_from_downloadable_resources(&info).await?;
                    node.children.extend(documents);
                }
            }
        }

        for domain_or_unit in &strand_or_module.domains_or_units {
            let child = self.scrape_ela_domain_or_unit(domain_or_unit, &files).await?;
            node.children.push(ContentNode::Topic(child));
        }
        Ok(node)
    }

    async fn scrape_ela_domain_or_unit(
        &self,
        domain_or_unit: &DomainOrUnit,
        files: &[ExtractedPdf],
    ) -> Result<TopicNode> {
        let url = &domain_or_unit.url;
        let title = &domain_or_unit.title;
        let info = self.page_info(url).await?;
        let mut node = TopicNode::new(
            url.clone(),
            self.translate_text(title).await?,
            self.translate_text(&info.description).await?,
        );
        node.thumbnail = info.thumbnail.clone();
        node.license = Some(License::engageny());

        if files.is_empty() {
            let documents = self.pdfs_from_downloadable_resources(&info).await?;
            node.children.extend(documents);
        } else {
            let mut unit_files = Vec::new();
            for pdf in files.iter().filter(|f| f.member.contains(title.as_str())) {
                if let Some(file) = unit_file(&pdf.bundle_path()) {
                    unit_files.push(self.document_from_named_file(file, &pdf.path).await?);
                }
            }
            node.children.extend(overview_first(unit_files, &["unit"]));
        }

        for lesson_or_document in &domain_or_unit.lessons_or_documents {
            if let Some(lesson) = self.scrape_lesson(lesson_or_document, false, "en").await? {
                node.children.push(ContentNode::Topic(lesson));
            }
        }
        Ok(node)
    }

    // Math

    async fn scrape_math_grade(&self, grade: &MathGrade) -> Result<TopicNode> {
        info!("Scraping {}", grade.title);
        let info = self.page_info(&grade.url).await?;
        let mut node = TopicNode::new(
            grade.url.clone(),
            self.translate_text(&grade.title).await?,
            self.translate_text(&info.description).await?,
        );

        for module in &grade.modules {
            let child = self.scrape_math_module(module).await?;
            node.children.push(ContentNode::Topic(child));
        }
        Ok(node)
    }

    async fn scrape_math_module(&self, module: &MathModule) -> Result<TopicNode> {
        let url = &module.url;
        let info = self.page_info(url).await?;
        let base_url = &self.config.base_url;
        let mut children = Vec::new();

        let mut overview_added = false;
        match &info.overview {
            Some(anchor) => {
                let overview_path = make_fully_qualified_url(base_url, &anchor.href);
                if suffix(&overview_path) == ".pdf" {
                    let mut overview = DocumentNode::pdf(
                        url.clone(),
                        self.translate_text(&format!("{} Overview", module.title)).await?,
                        self.translate_text(&info.description).await?,
                        overview_path,
                    );
                    overview.thumbnail = info.thumbnail.clone();
                    children.push(ContentNode::Document(overview));
                    overview_added = true;
                }
            }
            None => debug!("No module overview on {}", url),
        }

        let mut assessment_bundle = None;
        for anchor in &info.assessments {
            let path = make_fully_qualified_url(base_url, &anchor.href);
            if suffix(&path) == ".pdf" {
                children.push(ContentNode::Document(self.assessment_document(anchor, path).await?));
            } else {
                assessment_bundle = Some(path);
            }
        }
        if info.assessments.is_empty() {
            debug!("No module assessments on {}", url);
        }

        if let Some(bundle_url) = assessment_bundle {
            info!("Fetching assessment bundle {}", bundle_url);
            let extracted =
                download_zip_file(&self.session, &bundle_url, &self.config.pdfs_dir()).await?;
            match extracted {
                Some(files) if !files.is_empty() => {
                    for pdf in files.iter().rev() {
                        if overview_added && pdf.member.ends_with("overview.pdf") {
                            continue;
                        }
                        let Some(title) = bundle_item_title(&pdf.bundle_path()) else {
                            warn!("Unrecognised bundle item name: {}", pdf.member);
                            continue;
                        };
                        let title = self.translate_text(&title).await?;
                        children.push(ContentNode::Document(DocumentNode::pdf(
                            pdf.path.clone(),
                            title.clone(),
                            title,
                            pdf.path.clone(),
                        )));
                    }
                }
                _ => warn!("Assessment bundle {} yielded no files", bundle_url),
            }
        }

        let mut node = TopicNode::new(
            url.clone(),
            self.translate_text(&module.title).await?,
            self.translate_text(&info.description).await?,
        );
        node.children = children;
        node.extra_fields = Some(ExtraFields {
            translations: translations(&info, base_url),
        });

        for topic in &module.topics {
            let child = self.scrape_math_topic(topic).await?;
            node.children.push(ContentNode::Topic(child));
        }
        Ok(node)
    }

    async fn assessment_document(&self, anchor: &Anchor, path: String) -> Result<DocumentNode> {
        let title = self.translate_text(title_from_link_text(&anchor.text)).await?;
        let description = self
            .translate_text(anchor.title.as_deref().unwrap_or_default())
            .await?;
        Ok(DocumentNode::pdf(path.clone(), title, description, path))
    }

    async fn scrape_math_topic(&self, topic: &Topic) -> Result<TopicNode> {
        let url = &topic.url;
        let info = self.page_info(url).await?;
        let mut children = Vec::new();

        if let Some(anchor) = &info.overview {
            let document_url = make_fully_qualified_url(&self.config.base_url, &anchor.href);
            let mut overview = DocumentNode::pdf(
                document_url.clone(),
                self.translate_text(&format!("{} Overview", topic.title)).await?,
                self.translate_text(&info.description).await?,
                document_url,
            );
            overview.thumbnail = info.thumbnail.clone();
            children.push(ContentNode::Document(overview));
        }

        let lang = self.lang.code().to_string();
        for lesson in &topic.lessons {
            if let Some(node) = self.scrape_lesson(lesson, true, &lang).await? {
                children.push(ContentNode::Topic(node));
            }
        }

        let mut node = TopicNode::new(
            url.clone(),
            self.translate_text(&topic.title).await?,
            self.translate_text(&info.description).await?,
        );
        node.children = children;
        Ok(node)
    }

    /// Lesson topic with a document per PDF of its resources table.
    ///
    /// `None` when the page has no downloadable-resources pane.
    async fn scrape_lesson(&self, lesson: &Link, translate: bool, language: &str) -> Result<Option<TopicNode>> {
        let lesson_url = &lesson.url;
        let info = self.page_info(lesson_url).await?;
        if info.resources.is_none() {
            debug!("No downloadable resources on {}", lesson_url);
            return Ok(None);
        }

        let mut node = TopicNode::new(
            lesson_url.clone(),
            self.maybe_translate(&lesson.title, translate).await?,
            self.maybe_translate(&info.description, translate).await?,
        );
        node.language = Some(language.to_string());
        node.thumbnail = info.thumbnail.clone();

        for doc_link in &info.resource_rows {
            let sanitized = strip_token(&doc_link.href);
            let doc_path = make_fully_qualified_url(&self.config.base_url, sanitized);
            if !doc_path.contains("pdf") {
                continue;
            }

            let mut document = DocumentNode::pdf(
                format!("{}:{}", lesson_url, sanitized),
                self.maybe_translate(title_from_link_text(&doc_link.text), translate)
                    .await?,
                self.maybe_translate(&doc_link.text, translate).await?,
                doc_path,
            );
            document.author = Some(AUTHOR.to_string());
            document.language = Some(language.to_string());
            for file in &mut document.files {
                file.language = Some(language.to_string());
            }
            node.children.push(ContentNode::Document(document));
        }

        Ok(Some(node))
    }
}
