//! URL normalisation and titles derived from PDF file names

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

use crate::utils::text::title_case;

static STRIP_BYTESIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\s+\((\d+|\d+\.\d+)\s+\w+B\)").unwrap());

static MODULE_LEVEL_PDF_INDIVIDUAL_FILES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.+/.+/PDF\s+Individual\s+Files/ela-\w(\d+)-(\w)(\d+)-(\w+-\w+).pdf").unwrap()
});

static MODULE_LEVEL_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.+/.+/.+/(?:Module\sLevel\sDocuments/)?(?P<grade>\d+)(?P<moduleletter>\w)(?P<modulenumber>\w+)\.(?P<name>\D+)\.pdf$").unwrap()
});

static MODULE_EXTENSION_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^/]+/[^/]+/[^/]+/(?:(?P<subdir>[^/]+)/)?ela-grade-(?P<grade>\d+)[-.]ext[-.](?P<name>.+).pdf$").unwrap()
});

static LESSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<lesson>[^\d]+)(?P<number>\d+)$").unwrap());

static UNIT_LEVEL_FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(?P<grade>\d+)(?P<moduleletter>\w+)(?P<modulenumber>\d+)\.(?P<unitnumber>\d+)(?P<name>\D+)\.pdf$").unwrap()
});

static ITEM_FROM_BUNDLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.+/(?P<area>.+(-i+)?)-(?P<grade>.+)-(?P<module>.+)-(?P<assessment_cutoff>.+-)?(?P<level>.+)-(?P<type>.+)\..+$").unwrap()
});

/// Drop the query string
pub fn strip_token(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Resolve a page href against the content host, without its query string
pub fn make_fully_qualified_url(base_url: &str, url: &str) -> String {
    if url.starts_with("//") {
        warn!("unexpected // url {}", url);
        return strip_token(&format!("https:{}", url)).to_string();
    }
    if url.starts_with('/') {
        return strip_token(&format!("{}{}", base_url.trim_end_matches('/'), url)).to_string();
    }
    strip_token(url).to_string()
}

/// Extension of the final path component, dot included (`""` when none)
pub fn suffix(path: &str) -> &str {
    let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    match name.rfind('.') {
        Some(i) if i > 0 && i < name.len() - 1 => &name[i..],
        _ => "",
    }
}
/// Directory the bundle file-name patterns count their segments from
const BUNDLE_ROOT: &str = "chefdata/pdfs";

/// Archive member name as the file-name patterns expect it, whatever the data directory
pub fn bundle_path(member: &str) -> String {
    format!("{}/{}", BUNDLE_ROOT, member.trim_start_matches('/'))
}

/// `"Title (1.2 MB)"` -> `"Title"`
pub fn strip_byte_size(s: &str) -> Option<&str> {
    STRIP_BYTESIZE_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Sort name and (untranslated) title of a PDF extracted from a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFile {
    pub name: String,
    pub title: String,
}

fn words_without_module(name: &str) -> Vec<String> {
    name.replace("module", "")
        .replace('-', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Whether `path` is a module-level or extension-module document
pub fn is_module_file(path: &str) -> bool {
    MODULE_LEVEL_FILENAME_RE.is_match(path)
        || MODULE_LEVEL_PDF_INDIVIDUAL_FILES_RE.is_match(path)
        || MODULE_EXTENSION_FILENAME_RE.is_match(path)
}

/// Title of a module-level or extension-module document
pub fn module_file(path: &str) -> Option<NamedFile> {
    let caps = MODULE_LEVEL_FILENAME_RE
        .captures(path)
        .or_else(|| MODULE_LEVEL_PDF_INDIVIDUAL_FILES_RE.captures(path));

    if let Some(caps) = caps {
        let grade = &caps[1];
        let module_letter = &caps[2];
        let module_number = &caps[3];
        let name = &caps[4];

        let mut title = vec!["grade".to_string(), grade.to_string()];
        if module_letter == "m" {
            title.extend(["module".to_string(), module_number.to_string()]);
        }
        if name == "module" {
            title.push("overview".to_string());
        } else {
            title.extend(words_without_module(name));
        }
        return Some(NamedFile {
            name: name.to_lowercase(),
            title: title_case(&title.join(" ")),
        });
    }

    let caps = MODULE_EXTENSION_FILENAME_RE.captures(path)?;
    let name = &caps["name"];
    let mut title = vec![
        "grade".to_string(),
        caps["grade"].to_string(),
        "extension".to_string(),
        "module".to_string(),
    ];
    if let Some(subdir) = caps.name("subdir") {
        title.push(subdir.as_str().to_string());
    }
    match LESSON_RE.captures(name) {
        Some(lesson) => title.push(lesson["number"].to_string()),
        None => title.extend(words_without_module(name)),
    }

    Some(NamedFile {
        name: name.to_lowercase(),
        title: title_case(&title.join(" ")),
    })
}

/// Title of a unit-level document
pub fn unit_file(path: &str) -> Option<NamedFile> {
    let caps = UNIT_LEVEL_FILENAME_RE.captures(path)?;
    let name = &caps["name"];

    let mut title = format!("Grade {} ", &caps["grade"]);
    if &caps["moduleletter"] == "m" {
        title.push_str(&format!(
            "module {} Unit {}",
            &caps["modulenumber"], &caps["unitnumber"]
        ));
    }
    if name == "unit" {
        title.push_str(" Overview");
    } else {
        title.push(' ');
        title.push_str(name);
    }

    Some(NamedFile {
        name: name.to_lowercase(),
        title: title_case(&title),
    })
}

/// Title of an entry of a math assessment bundle
pub fn bundle_item_title(path: &str) -> Option<String> {
    let caps = ITEM_FROM_BUNDLE_RE.captures(path)?;
    let parts: Vec<&str> = caps.iter().skip(1).flatten().map(|m| m.as_str()).collect();
    Some(title_case(&parts.join(" ")))
}
