//! ZIP bundle download and PDF extraction

use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::chef::paths::{bundle_path, suffix};
use crate::core::errors::{ChefError, Result};
use crate::core::session::HttpSession;

/// A PDF extracted from a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPdf {
    /// Location on disk
    pub path: String,
    /// Name of the archive member
    pub member: String,
}

impl ExtractedPdf {
    /// Path the file-name patterns match against
    pub fn bundle_path(&self) -> String {
        bundle_path(&self.member)
    }
}

/// Download a `.zip` and extract its PDFs under `dest`.
///
/// Returns the extracted paths in archive order, or `None` when `url` is not
/// a ZIP or the download failed.
pub async fn download_zip_file(
    session: &HttpSession,
    url: &str,
    dest: &Path,
) -> Result<Option<Vec<ExtractedPdf>>> {
    if url.is_empty() || suffix(url) != ".zip" {
        return Ok(None);
    }

    let fetched = session.get(url).await?;
    if fetched.status != 200 {
        return Ok(None);
    }

    extract_pdfs(&fetched.body, dest).map(Some)
}

/// Extract every `.pdf` member of `bytes` under `dest`; existing files are kept
pub fn extract_pdfs(bytes: &[u8], dest: &Path) -> Result<Vec<ExtractedPdf>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        if !member.name().ends_with(".pdf") {
            continue;
        }

        let Some(relative) = member.enclosed_name().map(Path::to_path_buf) else {
            warn!("Skipping archive member outside extraction dir: {}", member.name());
            continue;
        };

        let target = dest.join(&relative);
        extracted.push(ExtractedPdf {
            path: format!(
                "{}/{}",
                dest.display().to_string().trim_end_matches('/'),
                member.name()
            ),
            member: member.name().to_string(),
        });

        if target.exists() {
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ChefError::FileError {
                path: parent.display().to_string(),
                message: e.to_string(),
            })?;
        }
        let mut out = File::create(&target).map_err(|e| ChefError::FileError {
            path: target.display().to_string(),
            message: e.to_string(),
        })?;
        std::io::copy(&mut member, &mut out)?;
        debug!("Extracted {}", target.display());
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extracts_only_pdfs() {
        let bytes = build_zip(&[
            ("bundle/a.pdf", "%PDF-a"),
            ("bundle/readme.txt", "hi"),
            ("bundle/sub/b.pdf", "%PDF-b"),
        ]);
        let dir = tempfile::tempdir().unwrap();

        let extracted = extract_pdfs(&bytes, dir.path()).unwrap();
        let base = dir.path().display().to_string();
        let paths: Vec<&str> = extracted.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![format!("{}/bundle/a.pdf", base), format!("{}/bundle/sub/b.pdf", base)]
        );
        assert_eq!(extracted[1].member, "bundle/sub/b.pdf");
        assert_eq!(extracted[1].bundle_path(), "chefdata/pdfs/bundle/sub/b.pdf");
        assert_eq!(std::fs::read(dir.path().join("bundle/sub/b.pdf")).unwrap(), b"%PDF-b");
        assert!(!dir.path().join("bundle/readme.txt").exists());
    }

    #[test]
    fn test_existing_files_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("bundle")).unwrap();
        std::fs::write(dir.path().join("bundle/a.pdf"), b"local").unwrap();

        let bytes = build_zip(&[("bundle/a.pdf", "%PDF-a")]);
        extract_pdfs(&bytes, dir.path()).unwrap();
        assert_eq!(std::fs::read(dir.path().join("bundle/a.pdf")).unwrap(), b"local");
    }

    #[test]
    fn test_rejects_escaping_members() {
        let bytes = build_zip(&[("../evil.pdf", "x"), ("ok.pdf", "y")]);
        let dir = tempfile::tempdir().unwrap();
        let extracted = extract_pdfs(&bytes, dir.path()).unwrap();
        assert_eq!(extracted.len(), 1);
        assert!(extracted[0].path.ends_with("/ok.pdf"));
        assert_eq!(extracted[0].member, "ok.pdf");
    }

    #[tokio::test]
    async fn test_non_zip_url_is_ignored() {
        let session = HttpSession::new(&crate::core::config::ChefConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let result = download_zip_file(&session, "https://www.engageny.org/file/1/a.pdf", dir.path())
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(download_zip_file(&session, "", dir.path()).await.unwrap().is_none());
    }
}
