//! Upload handling: validate incoming files, then persist them under unique
//! timestamped names.
//!
//! A request's files are validated as a batch before anything touches the
//! disk, so a rejected request leaves no files behind. Writes use
//! `create_new` and retry with a `-<n>` suffix, which keeps two requests in
//! the same second from overwriting each other's uploads.

use crate::config::ServerConfig;
use crate::error::AssistantError;
use axum::body::Bytes;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Attempts before giving up on finding a free name.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// A file part read from the multipart body, not yet validated.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// A file that has been written to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// Filename as supplied by the client.
    pub original_name: String,
    /// `<unix-seconds>_<sanitized>` name on disk.
    pub saved_as: String,
    pub size: u64,
    pub path: PathBuf,
}

/// Validation rules plus the target directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    allowed_extensions: Vec<String>,
    max_file_size: u64,
}

impl UploadStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        allowed_extensions: Vec<String>,
        max_file_size: u64,
    ) -> Self {
        Self {
            dir: dir.into(),
            allowed_extensions,
            max_file_size,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            config.upload_dir.clone(),
            config.allowed_extensions.clone(),
            config.max_file_size,
        )
    }

    /// Check every file's extension and size.
    ///
    /// The first offending file decides the error; nothing is written.
    pub fn validate(&self, files: &[IncomingFile]) -> Result<(), AssistantError> {
        for file in files {
            if !allowed_file(&file.filename, &self.allowed_extensions) {
                return Err(AssistantError::FileTypeNotAllowed {
                    filename: file.filename.clone(),
                    allowed: self.allowed_label(),
                });
            }
            if file.bytes.len() as u64 > self.max_file_size {
                return Err(AssistantError::FileTooLarge {
                    filename: file.filename.clone(),
                    limit_mb: self.max_file_size / (1024 * 1024),
                });
            }
        }
        Ok(())
    }

    /// Validate, then write every file. Returns metadata in input order.
    ///
    /// If a write fails, files already written for this batch are removed.
    pub async fn store_all(
        &self,
        files: &[IncomingFile],
    ) -> Result<Vec<UploadedFile>, AssistantError> {
        self.validate(files)?;

        let timestamp = chrono::Utc::now().timestamp();
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            match self.write_one(file, timestamp).await {
                Ok(info) => stored.push(info),
                Err(e) => {
                    for done in &stored {
                        if let Err(rm) = tokio::fs::remove_file(&done.path).await {
                            warn!("Could not roll back {}: {}", done.path.display(), rm);
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    async fn write_one(
        &self,
        file: &IncomingFile,
        timestamp: i64,
    ) -> Result<UploadedFile, AssistantError> {
        let ext = extension(&file.filename).unwrap_or_default();
        let safe = secure_filename(&file.filename);
        let safe = if safe.is_empty() {
            format!("upload.{ext}")
        } else if !has_extension(&safe, &ext) {
            format!("{safe}.{ext}")
        } else {
            safe
        };
        let (stem, suffix) = split_extension(&safe);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let saved_as = if attempt == 0 {
                format!("{timestamp}_{safe}")
            } else {
                format!("{timestamp}_{stem}-{attempt}{suffix}")
            };
            let path = self.dir.join(&saved_as);

            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            let mut handle = match opened {
                Ok(h) => h,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} exists, trying another name", path.display());
                    continue;
                }
                Err(source) => return Err(AssistantError::StorageFailed { path, source }),
            };

            let written = async {
                handle.write_all(&file.bytes).await?;
                handle.flush().await
            }
            .await;
            if let Err(source) = written {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(AssistantError::StorageFailed { path, source });
            }

            info!(
                "File uploaded: {} -> {} ({} bytes)",
                file.filename,
                saved_as,
                file.bytes.len()
            );
            return Ok(UploadedFile {
                original_name: file.filename.clone(),
                saved_as,
                size: file.bytes.len() as u64,
                path,
            });
        }

        Err(AssistantError::StorageFailed {
            path: self.dir.join(format!("{timestamp}_{safe}")),
            source: std::io::Error::new(ErrorKind::AlreadyExists, "no free file name"),
        })
    }

    fn allowed_label(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|e| e.to_uppercase())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// True when the filename has an extension from `allowed` (case-insensitive).
pub fn allowed_file(filename: &str, allowed: &[String]) -> bool {
    extension(filename)
        .map(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)))
        .unwrap_or(false)
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Path separators and whitespace runs become `_`, anything outside
/// `[A-Za-z0-9._-]` is dropped, and leading/trailing dots and underscores
/// are stripped. May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.trim();
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_lowercase())
    }
}

fn has_extension(name: &str, ext: &str) -> bool {
    extension(name).map(|e| e == ext).unwrap_or(ext.is_empty())
}

/// `("notes", ".pdf")` for `notes.pdf`; `("notes", "")` without a dot.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn incoming(name: &str, bytes: &[u8]) -> IncomingFile {
        IncomingFile {
            filename: name.into(),
            bytes: Bytes::copy_from_slice(bytes),
        }
    }

    fn store(dir: &Path) -> UploadStore {
        UploadStore::new(dir, vec!["pdf".into()], 1024)
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn secure_filename_sanitises() {
        assert_eq!(secure_filename("My Lesson Plan.pdf"), "My_Lesson_Plan.pdf");
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("C:\\Users\\t\\notes.pdf"), "C_Users_t_notes.pdf");
        assert_eq!(secure_filename("   .hidden.pdf"), "hidden.pdf");
        assert_eq!(secure_filename("résumé (1).pdf"), "rsum_1.pdf");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn allowed_file_is_case_insensitive() {
        let allowed = vec!["pdf".to_string()];
        assert!(allowed_file("a.PDF", &allowed));
        assert!(allowed_file("a.b.pdf", &allowed));
        assert!(!allowed_file("a.docx", &allowed));
        assert!(!allowed_file("pdf", &allowed));
        assert!(!allowed_file("a.", &allowed));
    }

    #[tokio::test]
    async fn stores_with_timestamp_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store(dir.path())
            .store_all(&[incoming("Fractions Workbook.pdf", b"%PDF-1.4 test")])
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        let f = &stored[0];
        assert_eq!(f.original_name, "Fractions Workbook.pdf");
        assert_eq!(f.size, 13);
        let (ts, rest) = f.saved_as.split_once('_').unwrap();
        assert!(ts.parse::<i64>().is_ok());
        assert_eq!(rest, "Fractions_Workbook.pdf");
        assert_eq!(std::fs::read(&f.path).unwrap(), b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn same_name_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let stored = s
            .store_all(&[incoming("a.pdf", b"one"), incoming("a.pdf", b"two")])
            .await
            .unwrap();
        assert_ne!(stored[0].saved_as, stored[1].saved_as);
        assert!(stored[1].saved_as.ends_with("_a-1.pdf"));
        assert_eq!(std::fs::read(&stored[0].path).unwrap(), b"one");
        assert_eq!(std::fs::read(&stored[1].path).unwrap(), b"two");
    }

    #[tokio::test]
    async fn bad_extension_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path())
            .store_all(&[incoming("ok.pdf", b"x"), incoming("notes.docx", b"y")])
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::FileTypeNotAllowed { .. }));
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn oversize_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let big = vec![0u8; 2048];
        let err = store(dir.path())
            .store_all(&[incoming("big.pdf", &big)])
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::FileTooLarge { .. }));
        assert_eq!(err.status_code(), axum::http::StatusCode::PAYLOAD_TOO_LARGE);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn extension_is_restored_after_sanitising() {
        let dir = tempfile::tempdir().unwrap();
        let stored = store(dir.path())
            .store_all(&[incoming("★★★.pdf", b"x")])
            .await
            .unwrap();
        assert!(stored[0].saved_as.ends_with("_pdf.pdf"));
    }
}
