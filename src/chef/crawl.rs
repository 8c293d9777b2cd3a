//! Crawl stage: build the web resource tree from the curriculum tables of contents

use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::{info, instrument, warn};

use crate::chef::page::{class_matches, first_anchor_matching, get_text, selector};
use crate::chef::paths::make_fully_qualified_url;
use crate::chef::{write_json, EngageNyChef};
use crate::core::client::Translate;
use crate::core::errors::{ChefError, Result};
use crate::core::models::{
    DomainOrUnit, ElaGrade, Link, MathGrade, MathModule, StrandOrModule, Topic, WebResourceTree,
};

/// File name of the crawl output inside the trees directory
pub const CRAWLING_STAGE_OUTPUT: &str = "web_resource_tree.json";

static CONTENT_OR_RESOURCE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(content|resource)/*").unwrap());
static STRAND_OR_MODULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w*\s*(strand|module)\s*\w*").unwrap());
static DOMAIN_OR_UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w*\s*(domain|unit)\s*\w*").unwrap());
static DOCUMENT_OR_LESSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w*\s*(document|lesson)\w*\s*").unwrap());
static RESOURCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/resource").unwrap());
static MODULE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/resource/(.)+-module-(\d)+$").unwrap());
static TOPIC_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.)+-topic(.)*").unwrap());
static LESSON_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.)+-lesson(.)*").unwrap());

impl<T: Translate> EngageNyChef<T> {
    /// Crawl the site and store the web resource tree
    #[instrument(skip_all)]
    pub async fn crawl(&self) -> Result<WebResourceTree> {
        let start_url = self.config.start_url();
        let page = self.fetch_page(&start_url).await?;
        let (mut ela_grades, mut math_grades) =
            parse_toc(&page, &self.config.base_url, &start_url)?;

        for grade in &mut ela_grades {
            let page = self.fetch_page(&grade.url).await?;
            parse_ela_grade(&page, &self.config.base_url, grade);
        }
        for grade in &mut math_grades {
            let page = self.fetch_page(&grade.url).await?;
            parse_math_grade(&page, &self.config.base_url, grade);
        }

        let tree = WebResourceTree::new(ela_grades, math_grades);
        let path = self.config.trees_dir().join(CRAWLING_STAGE_OUTPUT);
        write_json(&path, &tree).await?;
        info!("Crawling results stored in {}", path.display());
        Ok(tree)
    }
}

fn link(kind: &str, title: String, base_url: &str, href: &str) -> Link {
    Link {
        kind: kind.to_string(),
        title,
        url: make_fully_qualified_url(base_url, href),
    }
}

/// Title and href of the `div.details` anchor of a list item
fn details_link(li: ElementRef<'_>, href_re: &Regex) -> Option<(String, String)> {
    let details = li.select(&selector("div.details")).next()?;
    let anchor = first_anchor_matching(details, href_re)?;
    Some((anchor.text, anchor.href))
}

/// List items below the item's `div.tree` whose class matches `class_re`
fn tree_items<'a>(li: ElementRef<'a>, class_re: &Regex) -> Vec<ElementRef<'a>> {
    match li.select(&selector("div.tree")).next() {
        Some(tree) => tree
            .select(&selector("li"))
            .filter(|item| class_matches(*item, class_re))
            .collect(),
        None => Vec::new(),
    }
}

fn grade_anchors(toc: ElementRef<'_>, base_url: &str) -> Vec<(String, String)> {
    toc.select(&selector("a[href]"))
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            if !CONTENT_OR_RESOURCE_URL_RE.is_match(href) {
                return None;
            }
            Some((
                make_fully_qualified_url(base_url, href),
                get_text(Some(a)),
            ))
        })
        .collect()
}

/// Grades of both subjects from the curriculum start page
pub fn parse_toc(
    html: &str,
    base_url: &str,
    url: &str,
) -> Result<(Vec<ElaGrade>, Vec<MathGrade>)> {
    let doc = Html::parse_document(html);
    let missing = |selector: &str| ChefError::MissingElement {
        selector: selector.to_string(),
        url: url.to_string(),
    };

    let dual_toc = doc
        .select(&selector("div#mini-panel-common_core_curriculum"))
        .next()
        .ok_or_else(|| missing("div#mini-panel-common_core_curriculum"))?;
    let ela_toc = dual_toc
        .select(&selector("div.panel-col-first"))
        .next()
        .ok_or_else(|| missing("div.panel-col-first"))?;
    let math_toc = dual_toc
        .select(&selector("div.panel-col-last"))
        .next()
        .ok_or_else(|| missing("div.panel-col-last"))?;

    let ela = grade_anchors(ela_toc, base_url)
        .into_iter()
        .map(|(url, title)| ElaGrade {
            kind: "EngageNYGrade".to_string(),
            url,
            title,
            strands_or_modules: Vec::new(),
        })
        .collect();
    let math = grade_anchors(math_toc, base_url)
        .into_iter()
        .map(|(url, title)| MathGrade {
            kind: "EngageNYGrade".to_string(),
            url,
            title,
            modules: Vec::new(),
        })
        .collect();

    Ok((ela, math))
}

fn curriculum_map(doc: &Html) -> Option<ElementRef<'_>> {
    doc.select(&selector("div.nysed-book-outline.curriculum-map"))
        .next()
}

/// Strands/modules, domains/units and lessons/documents of an ELA grade page
pub fn parse_ela_grade(html: &str, base_url: &str, grade: &mut ElaGrade) {
    let doc = Html::parse_document(html);
    let Some(toc) = curriculum_map(&doc) else {
        warn!("No curriculum map on {}", grade.url);
        return;
    };

    for li in toc
        .select(&selector("li"))
        .filter(|li| class_matches(*li, &STRAND_OR_MODULE_RE))
    {
        let Some((title, href)) = details_link(li, &RESOURCE_RE) else {
            warn!("Strand or module without a resource link on {}", grade.url);
            continue;
        };

        let mut strand_or_module = StrandOrModule {
            kind: "EngageNYStrandOrModule".to_string(),
            title,
            url: make_fully_qualified_url(base_url, &href),
            domains_or_units: Vec::new(),
        };

        for unit_li in tree_items(li, &DOMAIN_OR_UNIT_RE) {
            let Some((title, href)) = details_link(unit_li, &RESOURCE_RE) else {
                continue;
            };
            let mut domain_or_unit = DomainOrUnit {
                kind: "EngageNYDomainOrUnit".to_string(),
                title,
                url: make_fully_qualified_url(base_url, &href),
                lessons_or_documents: Vec::new(),
            };
            for item in tree_items(unit_li, &DOCUMENT_OR_LESSON_RE) {
                if let Some((title, href)) = details_link(item, &RESOURCE_RE) {
                    domain_or_unit.lessons_or_documents.push(link(
                        "EngageNYLessonOrDocument",
                        title,
                        base_url,
                        &href,
                    ));
                }
            }
            strand_or_module.domains_or_units.push(domain_or_unit);
        }

        grade.strands_or_modules.push(strand_or_module);
    }
}

/// Modules, topics and lessons of a math grade page
pub fn parse_math_grade(html: &str, base_url: &str, grade: &mut MathGrade) {
    let doc = Html::parse_document(html);
    let Some(toc) = curriculum_map(&doc) else {
        warn!("No curriculum map on {}", grade.url);
        return;
    };

    for module_li in toc.select(&selector("li.module")) {
        let Some((title, href)) = details_link(module_li, &MODULE_URL_RE) else {
            warn!("Module without a module link on {}", grade.url);
            continue;
        };

        let mut module = MathModule {
            kind: "EngageNYModule".to_string(),
            title,
            url: make_fully_qualified_url(base_url, &href),
            topics: Vec::new(),
        };

        let topic_lis = match module_li.select(&selector("div.tree")).next() {
            Some(tree) => tree.select(&selector("li.topic")).collect(),
            None => Vec::new(),
        };
        for topic_li in topic_lis {
            let Some((title, href)) = details_link(topic_li, &TOPIC_URL_RE) else {
                continue;
            };
            let mut topic = Topic {
                kind: "EngageNYTopic".to_string(),
                title,
                url: make_fully_qualified_url(base_url, &href),
                lessons: Vec::new(),
            };
            if let Some(tree) = topic_li.select(&selector("div.tree")).next() {
                for lesson_li in tree.select(&selector("li.lesson")) {
                    if let Some((title, href)) = details_link(lesson_li, &LESSON_URL_RE) {
                        topic
                            .lessons
                            .push(link("EngageNYLesson", title, base_url, &href));
                    }
                }
            }
            module.topics.push(topic);
        }

        grade.modules.push(module);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.engageny.org";

    const START_PAGE: &str = r#"
        <div id="mini-panel-common_core_curriculum">
          <div class="panel-col-first">
            <a href="/resource/grade-3-english-language-arts">Grade 3
            </a>
            <a href="/about">About</a>
          </div>
          <div class="panel-col-last">
            <a href="/resource/grade-1-mathematics?x=1">Grade 1</a>
            <a href="https://www.engageny.org/content/prekindergarten-mathematics">Pre-K</a>
          </div>
        </div>"#;

    #[test]
    fn test_parse_toc() {
        let (ela, math) = parse_toc(START_PAGE, BASE, BASE).unwrap();
        assert_eq!(ela.len(), 1);
        assert_eq!(ela[0].title, "Grade 3");
        assert_eq!(ela[0].url, "https://www.engageny.org/resource/grade-3-english-language-arts");
        assert_eq!(math.len(), 2);
        assert_eq!(math[0].url, "https://www.engageny.org/resource/grade-1-mathematics");
        assert_eq!(math[1].title, "Pre-K");
    }

    #[test]
    fn test_parse_toc_without_panel() {
        let err = parse_toc("<html></html>", BASE, BASE).unwrap_err();
        assert!(matches!(err, ChefError::MissingElement { .. }));
    }

    #[test]
    fn test_parse_ela_grade() {
        let html = r#"
        <div class="nysed-book-outline curriculum-map"><ul>
          <li class="module first">
            <div class="details"><a href="/resource/grade-3-ela-module-1">Module 1</a></div>
            <div class="tree"><ul>
              <li class="unit">
                <div class="details"><a href="/resource/grade-3-ela-module-1-unit-1">Unit 1</a></div>
                <div class="tree"><ul>
                  <li class="lesson"><div class="details"><a href="/resource/grade-3-ela-module-1-unit-1-lesson-1">Lesson 1</a></div></li>
                  <li class="document"><div class="details"><a href="/resource/grade-3-ela-module-1-unit-1-assessment">Assessment</a></div></li>
                </ul></div>
              </li>
            </ul></div>
          </li>
          <li class="strand"><div class="details"><span>no link</span></div></li>
        </ul></div>"#;

        let mut grade = ElaGrade {
            kind: "EngageNYGrade".to_string(),
            url: format!("{BASE}/resource/grade-3-english-language-arts"),
            title: "Grade 3".to_string(),
            strands_or_modules: Vec::new(),
        };
        parse_ela_grade(html, BASE, &mut grade);

        assert_eq!(grade.strands_or_modules.len(), 1);
        let module = &grade.strands_or_modules[0];
        assert_eq!(module.title, "Module 1");
        assert_eq!(module.domains_or_units.len(), 1);
        let unit = &module.domains_or_units[0];
        assert_eq!(unit.title, "Unit 1");
        let titles: Vec<&str> = unit.lessons_or_documents.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Lesson 1", "Assessment"]);
        assert_eq!(unit.lessons_or_documents[0].kind, "EngageNYLessonOrDocument");
    }

    #[test]
    fn test_parse_math_grade() {
        let html = r#"
        <div class="nysed-book-outline curriculum-map"><ul>
          <li class="module">
            <div class="details"><a href="/resource/grade-1-mathematics-module-1">Module 1</a></div>
            <div class="tree"><ul>
              <li class="topic">
                <div class="details"><a href="/resource/grade-1-mathematics-module-1-topic-a">Topic A</a></div>
                <div class="tree"><ul>
                  <li class="lesson"><div class="details"><a href="/resource/grade-1-mathematics-module-1-topic-a-lesson-1">Lesson 1</a></div></li>
                </ul></div>
              </li>
            </ul></div>
          </li>
          <li class="module">
            <div class="details"><a href="/resource/grade-1-mathematics-overview">Overview</a></div>
          </li>
        </ul></div>"#;

        let mut grade = MathGrade {
            kind: "EngageNYGrade".to_string(),
            url: format!("{BASE}/resource/grade-1-mathematics"),
            title: "Grade 1".to_string(),
            modules: Vec::new(),
        };
        parse_math_grade(html, BASE, &mut grade);

        assert_eq!(grade.modules.len(), 1);
        let topic = &grade.modules[0].topics[0];
        assert_eq!(topic.title, "Topic A");
        assert_eq!(topic.lessons.len(), 1);
        assert_eq!(
            topic.lessons[0].url,
            "https://www.engageny.org/resource/grade-1-mathematics-module-1-topic-a-lesson-1"
        );
    }
}
