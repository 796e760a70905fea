//! Output artifacts: saved PDFs and evidence screenshots.
//!
//! Both directories are keyed by [`safe_filename`] of the identifier. Writes
//! are last-write-wins; nothing is versioned.

use super::identifier::Identifier;
use crate::error::RetrievalError;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Scratch directory (inside the PDF directory) where the browser drops
/// downloads before they are validated.
const STAGING_DIR: &str = ".staging";

/// Replace every character that is not a word character, `-`, `_` or `.`
/// with `_`. Names made only of dots become underscores so they can never
/// resolve to `.` or `..`.
pub fn safe_filename(identifier: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^\w\-.]").expect("filename regex is valid"));
    let safe = re.replace_all(identifier, "_").into_owned();
    if safe.chars().all(|c| c == '.') {
        return "_".repeat(safe.len().max(1));
    }
    safe
}

/// PDF magic bytes check.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// The two output directories.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    pdf_dir: PathBuf,
    screenshot_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(pdf_dir: impl Into<PathBuf>, screenshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            pdf_dir: pdf_dir.into(),
            screenshot_dir: screenshot_dir.into(),
        }
    }

    pub fn pdf_dir(&self) -> &Path {
        &self.pdf_dir
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    /// Create both output directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.pdf_dir)?;
        std::fs::create_dir_all(&self.screenshot_dir)
    }

    pub fn document_path(&self, id: &Identifier) -> PathBuf {
        self.pdf_dir.join(format!("{}.pdf", safe_filename(id.as_str())))
    }

    pub fn evidence_path(&self, id: &Identifier) -> PathBuf {
        self.screenshot_dir
            .join(format!("{}.png", safe_filename(id.as_str())))
    }

    /// Per-identifier download directory. The browser needs an absolute path.
    pub fn staging_dir(&self, id: &Identifier) -> std::io::Result<PathBuf> {
        let dir = self
            .pdf_dir
            .join(STAGING_DIR)
            .join(safe_filename(id.as_str()));
        if dir.is_absolute() {
            Ok(dir)
        } else {
            Ok(std::env::current_dir()?.join(dir))
        }
    }

    /// Remove the identifier's staging directory and, if it is empty, the
    /// shared staging root.
    pub async fn clear_staging(&self, id: &Identifier) {
        if let Ok(dir) = self.staging_dir(id) {
            let _ = tokio::fs::remove_dir_all(&dir).await;
            if let Some(root) = dir.parent() {
                let _ = tokio::fs::remove_dir(root).await;
            }
        }
    }

    /// Write a fetched document. The body must already be a declared PDF.
    pub async fn write_document(
        &self,
        id: &Identifier,
        body: &[u8],
    ) -> Result<PathBuf, RetrievalError> {
        let path = self.document_path(id);
        tokio::fs::create_dir_all(&self.pdf_dir).await?;
        tokio::fs::write(&path, body).await?;
        self.remove_stale_evidence(id).await;
        Ok(path)
    }

    /// Move a browser download into place after checking it is a PDF.
    /// Rejected files are deleted.
    pub async fn adopt_download(
        &self,
        id: &Identifier,
        downloaded: &Path,
        source_url: &str,
    ) -> Result<PathBuf, RetrievalError> {
        let body = tokio::fs::read(downloaded).await?;
        if !looks_like_pdf(&body) {
            let _ = tokio::fs::remove_file(downloaded).await;
            return Err(RetrievalError::ContentMismatch {
                url: source_url.to_string(),
                found: "a download without PDF magic bytes".to_string(),
            });
        }

        let path = self.document_path(id);
        tokio::fs::create_dir_all(&self.pdf_dir).await?;
        if tokio::fs::rename(downloaded, &path).await.is_err() {
            tokio::fs::write(&path, &body).await?;
            let _ = tokio::fs::remove_file(downloaded).await;
        }
        self.remove_stale_evidence(id).await;
        Ok(path)
    }

    /// Drop a PDF left by an earlier run once fresh evidence was written.
    pub async fn remove_stale_document(&self, id: &Identifier) {
        let stale = self.document_path(id);
        if tokio::fs::remove_file(&stale).await.is_ok() {
            tracing::debug!(path = %stale.display(), "removed stale PDF");
        }
    }

    /// Path the evidence screenshot will be written to, with its directory
    /// created.
    pub async fn prepare_evidence(&self, id: &Identifier) -> Result<PathBuf, RetrievalError> {
        tokio::fs::create_dir_all(&self.screenshot_dir).await?;
        Ok(self.evidence_path(id))
    }

    /// A screenshot from an earlier run must not sit next to a fresh PDF.
    async fn remove_stale_evidence(&self, id: &Identifier) {
        let stale = self.evidence_path(id);
        if tokio::fs::remove_file(&stale).await.is_ok() {
            tracing::debug!(path = %stale.display(), "removed stale screenshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> Identifier {
        Identifier::parse(s).unwrap()
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(
            safe_filename("10.1186/s13059-023-02908-x"),
            "10.1186_s13059-023-02908-x"
        );
        assert_eq!(safe_filename("10.1002/(SICI)1097:4<1>"), "10.1002__SICI_1097_4_1_");
    }

    #[test]
    fn test_safe_filename_never_yields_dot_dirs() {
        assert_eq!(safe_filename(".."), "__");
        assert_eq!(safe_filename("."), "_");
        assert_eq!(safe_filename("..."), "___");
        assert_eq!(safe_filename(""), "_");
        assert_eq!(safe_filename("10.1000/.."), "10.1000_..");
    }

    #[tokio::test]
    async fn test_dot_identifiers_stage_inside_staging_root() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path().join("pdfs"), tmp.path().join("shots"));
        store.ensure_dirs().unwrap();
        let kept = id("10.1111/pce.14906");
        std::fs::write(store.document_path(&kept), b"%PDF-1.4").unwrap();

        for raw in ["..", "."] {
            let doi = id(raw);
            let staging = store.staging_dir(&doi).unwrap();
            assert_eq!(
                staging.parent().and_then(|p| p.file_name()),
                Some(std::ffi::OsStr::new(STAGING_DIR))
            );
            std::fs::create_dir_all(&staging).unwrap();
            store.clear_staging(&doi).await;
            assert!(!staging.exists());
        }
        assert!(store.document_path(&kept).exists());
    }

    #[tokio::test]
    async fn test_remove_stale_document() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path().join("pdfs"), tmp.path().join("shots"));
        store.ensure_dirs().unwrap();
        let doi = id("10.1016/j.cell.2021.04.046");
        std::fs::write(store.document_path(&doi), b"%PDF-1.4").unwrap();

        store.remove_stale_document(&doi).await;
        assert!(!store.document_path(&doi).exists());
        // Nothing to remove is fine.
        store.remove_stale_document(&doi).await;
    }

    #[test]
    fn test_paths() {
        let store = ArtifactStore::new("pdfs", "screenshots");
        let doi = id("10.1186/s13059-023-02908-x");
        assert_eq!(
            store.document_path(&doi),
            PathBuf::from("pdfs/10.1186_s13059-023-02908-x.pdf")
        );
        assert_eq!(
            store.evidence_path(&doi),
            PathBuf::from("screenshots/10.1186_s13059-023-02908-x.png")
        );
        assert!(store.staging_dir(&doi).unwrap().is_absolute());
    }

    #[tokio::test]
    async fn test_write_document_removes_stale_evidence() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path().join("pdfs"), tmp.path().join("shots"));
        store.ensure_dirs().unwrap();
        let doi = id("10.1111/pce.14906");

        std::fs::write(store.evidence_path(&doi), b"old png").unwrap();
        let path = store.write_document(&doi, b"%PDF-1.5").await.unwrap();

        assert!(path.exists());
        assert!(!store.evidence_path(&doi).exists());
    }

    #[tokio::test]
    async fn test_adopt_download_rejects_non_pdf() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path().join("pdfs"), tmp.path().join("shots"));
        let doi = id("10.1016/j.devcel.2020.12.015");
        let staged = tmp.path().join("guid-1");
        std::fs::write(&staged, b"<html>sign in</html>").unwrap();

        let err = store
            .adopt_download(&doi, &staged, "https://example.org/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::ContentMismatch { .. }));
        assert!(!staged.exists());
        assert!(!store.document_path(&doi).exists());
    }

    #[tokio::test]
    async fn test_adopt_download_moves_pdf() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path().join("pdfs"), tmp.path().join("shots"));
        let doi = id("10.1016/j.devcel.2020.12.015");
        let staged = tmp.path().join("guid-2");
        std::fs::write(&staged, b"%PDF-1.7 content").unwrap();

        let path = store
            .adopt_download(&doi, &staged, "https://example.org/pdf")
            .await
            .unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7 content");
        assert!(!staged.exists());
    }
}
