//! One-shot template export.
//!
//! [`export_once`] persists a point-in-time export of a resource group to a
//! JSON file and refuses to overwrite an earlier run's output.
//!
//! The destination is checked before the snapshot is requested, so an
//! existing file costs no remote call. The write itself opens the file with
//! `create_new`, which also catches a file that appears in between.

use crate::{Result, RgmuxError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Indentation of exported files.
pub const INDENT: &[u8] = b"    ";

/// A structured export of a resource group's definition.
///
/// The document is opaque to rgmux. Object keys are held in a sorted map, so
/// the serialized form is identical for identical documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportSnapshot(serde_json::Value);

impl ExportSnapshot {
    /// Wraps a provider document.
    pub fn new(document: serde_json::Value) -> Self {
        Self(document)
    }

    /// Borrows the document.
    pub fn document(&self) -> &serde_json::Value {
        &self.0
    }

    /// Returns the document.
    pub fn into_document(self) -> serde_json::Value {
        self.0
    }

    /// Serializes the snapshot with a 4-space indent.
    pub fn to_pretty_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.0.serialize(&mut serializer)?;
        Ok(buf)
    }
}

impl From<serde_json::Value> for ExportSnapshot {
    fn from(document: serde_json::Value) -> Self {
        Self::new(document)
    }
}

/// File name used for a group's exported template.
///
/// ```
/// assert_eq!(
///     rgmux::export::template_file_name("azure-sample-group"),
///     "azure-sample-group-template.json"
/// );
/// ```
pub fn template_file_name(group: &str) -> String {
    format!("{}-template.json", group)
}

/// Requests a snapshot and writes it to `destination`, once.
///
/// # Errors
///
/// - [`RgmuxError::AlreadyExists`] if `destination` already exists; the
///   snapshot is not requested and the file is left untouched
/// - whatever `fetch_snapshot` returns, unchanged; no file is created
/// - [`RgmuxError::Write`] if serialization or the write fails. A partially
///   written file is not removed.
///
/// # Example
///
/// ```
/// use rgmux::export::{export_once, ExportSnapshot};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> rgmux::Result<()> {
/// let dir = std::env::temp_dir().join(format!("rgmux-doc-{}", std::process::id()));
/// std::fs::create_dir_all(&dir)?;
/// let path = dir.join("rg-template.json");
/// # let _ = std::fs::remove_file(&path);
///
/// let snapshot = ExportSnapshot::new(serde_json::json!({"template": {"resources": []}}));
/// export_once(|| async { Ok(snapshot) }, &path).await?;
///
/// let again = export_once(|| async { Ok(ExportSnapshot::new(serde_json::json!({}))) }, &path).await;
/// assert!(matches!(again, Err(rgmux::RgmuxError::AlreadyExists(_))));
/// # std::fs::remove_dir_all(&dir)?;
/// # Ok(())
/// # }
/// ```
pub async fn export_once<F, Fut>(
    fetch_snapshot: F,
    destination: impl AsRef<Path>,
) -> Result<PathBuf>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<ExportSnapshot>>,
{
    let path = destination.as_ref().to_path_buf();

    // symlink_metadata so a dangling link also counts as taken.
    match fs::symlink_metadata(&path).await {
        Ok(_) => return Err(RgmuxError::AlreadyExists(path)),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(RgmuxError::Write { path, source: e }),
    }

    let snapshot = fetch_snapshot().await?;

    let bytes = snapshot.to_pretty_json().map_err(|e| RgmuxError::Write {
        path: path.clone(),
        source: e.into(),
    })?;

    write_new(&path, &bytes).await?;

    info!(path = %path.display(), bytes = bytes.len(), "template exported");
    Ok(path)
}

/// Creates `path` and writes `bytes` to it. Fails if `path` exists.
async fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                RgmuxError::AlreadyExists(path.to_path_buf())
            } else {
                RgmuxError::Write {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

    let write_err = |e| RgmuxError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    file.write_all(bytes).await.map_err(write_err)?;
    file.flush().await.map_err(write_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn sample_snapshot() -> ExportSnapshot {
        ExportSnapshot::new(json!({
            "template": {
                "$schema": "https://schema.management.azure.com/schemas/2015-01-01/deploymentTemplate.json#",
                "contentVersion": "1.0.0.0",
                "parameters": {},
                "resources": [
                    {"type": "Microsoft.KeyVault/vaults", "name": "kv", "tags": {"where": "on azure"}}
                ]
            }
        }))
    }

    #[tokio::test]
    async fn test_export_writes_round_trippable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(template_file_name("rg"));

        let written = export_once(|| async { Ok(sample_snapshot()) }, &path)
            .await
            .unwrap();

        assert_eq!(written, path);
        let data = std::fs::read(&path).unwrap();
        let back: ExportSnapshot = serde_json::from_slice(&data).unwrap();
        assert_eq!(back, sample_snapshot());
    }

    #[tokio::test]
    async fn test_export_uses_four_space_indent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");

        export_once(|| async { Ok(ExportSnapshot::new(json!({"b": 1, "a": [true]}))) }, &path)
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n    \"a\": [\n        true\n    ],\n    \"b\": 1\n}");
    }

    #[tokio::test]
    async fn test_existing_file_is_left_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rg-template.json");
        std::fs::write(&path, b"").unwrap();

        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = export_once(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample_snapshot())
            },
            &path,
        )
        .await;

        assert!(matches!(result, Err(RgmuxError::AlreadyExists(ref p)) if p == &path));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read(&path).unwrap(), b"");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dangling_symlink_counts_as_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rg-template.json");
        std::os::unix::fs::symlink(dir.path().join("missing-target"), &path).unwrap();

        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = export_once(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample_snapshot())
            },
            &path,
        )
        .await;

        assert!(matches!(result, Err(RgmuxError::AlreadyExists(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!dir.path().join("missing-target").exists());
    }

    #[tokio::test]
    async fn test_second_export_fails_and_keeps_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rg-template.json");

        export_once(|| async { Ok(sample_snapshot()) }, &path)
            .await
            .unwrap();
        let first = std::fs::read(&path).unwrap();

        let second = export_once(
            || async { Ok(ExportSnapshot::new(json!({"different": true}))) },
            &path,
        )
        .await;

        assert!(matches!(second, Err(RgmuxError::AlreadyExists(_))));
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[tokio::test]
    async fn test_fetch_failure_creates_no_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rg-template.json");

        let result = export_once(
            || async { Err(RgmuxError::Remote("export denied".to_string())) },
            &path,
        )
        .await;

        assert!(matches!(result, Err(RgmuxError::Remote(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_directory_is_write_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("rg-template.json");

        let result = export_once(|| async { Ok(sample_snapshot()) }, &path).await;

        assert!(matches!(result, Err(RgmuxError::Write { .. })));
    }
}
