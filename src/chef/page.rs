//! Extraction of the pieces of an engageny.org page the chef uses
//!
//! Everything is copied out of the parsed document so no `Html` is held
//! across an `.await`.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::chef::paths::{strip_token, suffix};

static MODULE_ASSESSMENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<segmentsonly>(.)+-as{1,2}es{1,2}ments?.(zip|pdf))(.)*").unwrap()
});

static MODULE_OVERVIEW_DOCUMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<segmentsonly>/file/(.)+-overview(.)*.(pdf|zip))(.)*$").unwrap()
});

pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static CSS selector")
}

/// Element text with carriage returns dropped, newlines as spaces, trimmed
pub fn get_text(el: Option<ElementRef<'_>>) -> String {
    match el {
        None => String::new(),
        Some(el) => el
            .text()
            .collect::<String>()
            .replace('\r', "")
            .replace('\n', " ")
            .trim()
            .to_string(),
    }
}

/// Whether any class token (or the whole class attribute) matches `re`
pub fn class_matches(el: ElementRef<'_>, re: &Regex) -> bool {
    let value = el.value();
    value.classes().any(|c| re.is_match(c))
        || value.attr("class").map(|c| re.is_match(c)).unwrap_or(false)
}

/// An `<a>` element reduced to what the chef needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
    pub title: Option<String>,
}

impl Anchor {
    pub fn from_element(el: ElementRef<'_>) -> Option<Self> {
        let href = el.value().attr("href")?.to_string();
        Some(Self {
            href,
            text: get_text(Some(el)),
            title: el.value().attr("title").map(str::to_string),
        })
    }
}

/// Descendant anchors of `root` whose href matches `re`
pub fn anchors_matching(root: ElementRef<'_>, re: &Regex) -> Vec<Anchor> {
    root.select(&selector("a[href]"))
        .filter_map(Anchor::from_element)
        .filter(|a| re.is_match(&a.href))
        .collect()
}

/// First descendant anchor of `root` whose href matches `re`
pub fn first_anchor_matching(root: ElementRef<'_>, re: &Regex) -> Option<Anchor> {
    root.select(&selector("a[href]"))
        .filter_map(Anchor::from_element)
        .find(|a| re.is_match(&a.href))
}

/// Page summary used by the scrape stage
#[derive(Debug, Clone, Default)]
pub struct PageInfo {
    pub description: String,
    pub thumbnail: Option<String>,
    /// Anchors of the downloadable-resources pane, `None` when the pane is absent
    pub resources: Option<Vec<Anchor>>,
    /// Second-cell link of each row of the pane's table
    pub resource_rows: Vec<Anchor>,
    pub overview: Option<Anchor>,
    pub assessments: Vec<Anchor>,
}

impl PageInfo {
    pub fn parse(html: &str) -> Self {
        let doc = Html::parse_document(html);
        let root = doc.root_element();

        let pane = root
            .select(&selector("div.pane-downloadable-resources"))
            .next();
        let resources = pane.map(|p| {
            p.select(&selector("a[href]"))
                .filter_map(Anchor::from_element)
                .collect()
        });
        let resource_rows = pane.map(resource_rows).unwrap_or_default();

        Self {
            description: get_text(root.select(&selector("div.content-body")).next()),
            thumbnail: thumbnail_url(&doc),
            resources,
            resource_rows,
            overview: first_anchor_matching(root, &MODULE_OVERVIEW_DOCUMENT_RE),
            assessments: anchors_matching(root, &MODULE_ASSESSMENTS_RE),
        }
    }

    /// Pane anchors whose href matches `re`
    pub fn resources_matching(&self, re: &Regex) -> Vec<Anchor> {
        self.resources
            .iter()
            .flatten()
            .filter(|a| re.is_match(&a.href))
            .cloned()
            .collect()
    }
}

fn resource_rows(pane: ElementRef<'_>) -> Vec<Anchor> {
    let Some(table) = pane.select(&selector("table")).next() else {
        return Vec::new();
    };

    table
        .select(&selector("tr"))
        .filter_map(|row| {
            let cell = row.select(&selector("td")).nth(1)?;
            let link = cell.select(&selector("a")).next()?;
            Anchor::from_element(link)
        })
        .collect()
}

/// Page thumbnail; GIFs are not usable as thumbnails
pub fn thumbnail_url(doc: &Html) -> Option<String> {
    let from_img = doc
        .select(&selector("img.img-responsive"))
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| strip_token(src).to_string())
        .filter(|src| !src.is_empty());

    let url = from_img.or_else(|| {
        doc.select(&selector(r#"meta[property="og:image"]"#))
            .next()
            .and_then(|m| m.value().attr("content"))
            .map(str::to_string)
    })?;

    if suffix(&url) == ".gif" {
        None
    } else {
        Some(url)
    }
}
