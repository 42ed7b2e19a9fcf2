//! File Attachments
//!
//! Files are validated when they are attached (count, size, duplicates) and
//! read only when the message is sent. All reads run concurrently and the
//! send waits for every one of them; a single failure aborts the send.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

use crate::api::types::QueryAttachment;
use crate::config::AttachmentLimits;

/// Attachment validation and read errors
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// The per-message file limit would be exceeded
    #[error("Uploaded more than {max} files.")]
    TooMany {
        /// Maximum number of files
        max: usize,
    },

    /// The file is larger than the per-file limit
    #[error("File {name} is larger than {}.", format_size(*.max))]
    TooLarge {
        /// File name
        name: String,
        /// File size in bytes
        size: u64,
        /// Limit in bytes
        max: u64,
    },

    /// A file with the same name and size is already attached
    #[error("File {name} is already attached.")]
    Duplicate {
        /// File name
        name: String,
    },

    /// The file could not be inspected or read
    #[error("Failed to read {name}: {source}")]
    Read {
        /// File name
        name: String,
        /// The underlying IO error
        source: std::io::Error,
    },
}

/// Human-readable byte size (`25 MB`, `512 KB`, `12 B`)
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB && bytes % MB == 0 {
        format!("{} MB", bytes / MB)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{bytes} B")
    }
}

/// MIME type guessed from the file extension
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("json") => "application/json",
        Some("yaml" | "yml") => "application/yaml",
        Some("xml") => "application/xml",
        _ => "text/plain",
    }
}

/// A file waiting to be sent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachedFile {
    /// File name shown in the transcript
    pub name: String,
    /// Size in bytes at attach time
    pub size: u64,
    /// MIME type sent to the service
    pub content_type: String,
    /// Location on disk
    pub path: PathBuf,
}

impl AttachedFile {
    /// Inspect a file on disk
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Read`] if the file's metadata is
    /// unavailable.
    pub async fn from_path(path: impl Into<PathBuf>) -> Result<Self, AttachmentError> {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|source| AttachmentError::Read {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            content_type: content_type_for(&path).to_string(),
            size: metadata.len(),
            name,
            path,
        })
    }

    /// Read the file and encode it for a query
    ///
    /// # Errors
    ///
    /// Returns [`AttachmentError::Read`] if the file cannot be read.
    pub async fn read(&self, attachment_type: &str) -> Result<QueryAttachment, AttachmentError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| AttachmentError::Read {
                name: self.name.clone(),
                source,
            })?;

        tracing::debug!(name = %self.name, bytes = bytes.len(), "Read attachment");

        Ok(QueryAttachment {
            attachment_type: attachment_type.to_string(),
            content_type: self.content_type.clone(),
            content: format!("data:{};base64,{}", self.content_type, STANDARD.encode(&bytes)),
        })
    }
}

/// The files attached to the message being composed
#[derive(Clone, Debug, Default)]
pub struct AttachmentSet {
    limits: AttachmentLimits,
    files: Vec<AttachedFile>,
}

impl AttachmentSet {
    /// Create an empty set with the given limits
    #[must_use]
    pub fn new(limits: AttachmentLimits) -> Self {
        Self {
            limits,
            files: Vec::new(),
        }
    }

    /// The limits applied by [`AttachmentSet::attach`]
    #[must_use]
    pub fn limits(&self) -> &AttachmentLimits {
        &self.limits
    }

    /// Attached files in attach order
    #[must_use]
    pub fn files(&self) -> &[AttachedFile] {
        &self.files
    }

    /// Names of the attached files
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }

    /// Number of attached files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing is attached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Add a file
    ///
    /// # Errors
    ///
    /// Rejects the file when the set is full, the file is too large, or an
    /// identical file (same name and size) is already attached. The set is
    /// unchanged on error.
    pub fn attach(&mut self, file: AttachedFile) -> Result<(), AttachmentError> {
        if self.files.len() >= self.limits.max_files {
            return Err(AttachmentError::TooMany {
                max: self.limits.max_files,
            });
        }
        if file.size > self.limits.max_file_size {
            return Err(AttachmentError::TooLarge {
                name: file.name,
                size: file.size,
                max: self.limits.max_file_size,
            });
        }
        if self
            .files
            .iter()
            .any(|f| f.name == file.name && f.size == file.size)
        {
            return Err(AttachmentError::Duplicate { name: file.name });
        }

        tracing::debug!(name = %file.name, size = file.size, "Attached file");
        self.files.push(file);
        Ok(())
    }

    /// Remove the file at `index`, returning it
    pub fn remove(&mut self, index: usize) -> Option<AttachedFile> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    /// Remove every file
    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Read every file concurrently
    ///
    /// Results keep attach order.
    ///
    /// # Errors
    ///
    /// Returns the first read failure; no partial list is returned.
    pub async fn read_all(&self) -> Result<Vec<QueryAttachment>, AttachmentError> {
        let attachment_type = self.limits.attachment_type.as_str();
        futures::future::try_join_all(self.files.iter().map(|f| f.read(attachment_type))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn file(name: &str, size: u64) -> AttachedFile {
        AttachedFile {
            name: name.to_string(),
            size,
            content_type: "text/plain".to_string(),
            path: PathBuf::from(name),
        }
    }

    #[test]
    fn test_attach_up_to_limit() {
        let mut set = AttachmentSet::new(AttachmentLimits::default());
        for i in 0..5 {
            set.attach(file(&format!("f{i}.txt"), 10)).unwrap();
        }

        let err = set.attach(file("f5.txt", 10)).unwrap_err();
        assert!(matches!(err, AttachmentError::TooMany { max: 5 }));
        assert_eq!(err.to_string(), "Uploaded more than 5 files.");
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_attach_rejects_large_file() {
        let mut set = AttachmentSet::new(AttachmentLimits::default());
        let err = set.attach(file("big.log", 25 * 1024 * 1024 + 1)).unwrap_err();

        assert!(matches!(err, AttachmentError::TooLarge { .. }));
        assert_eq!(err.to_string(), "File big.log is larger than 25 MB.");
        assert!(set.is_empty());

        // Exactly at the limit is fine
        set.attach(file("edge.log", 25 * 1024 * 1024)).unwrap();
    }

    #[test]
    fn test_attach_rejects_duplicate() {
        let mut set = AttachmentSet::new(AttachmentLimits::default());
        set.attach(file("pod.yaml", 100)).unwrap();

        let err = set.attach(file("pod.yaml", 100)).unwrap_err();
        assert!(matches!(err, AttachmentError::Duplicate { .. }));
        assert_eq!(set.names(), vec!["pod.yaml"]);

        // Same name, different size is a different file
        set.attach(file("pod.yaml", 200)).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut set = AttachmentSet::new(AttachmentLimits::default());
        set.attach(file("a", 1)).unwrap();
        set.attach(file("b", 1)).unwrap();

        assert_eq!(set.remove(0).map(|f| f.name), Some("a".to_string()));
        assert!(set.remove(5).is_none());
        assert_eq!(set.names(), vec!["b"]);
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.json")), "application/json");
        assert_eq!(content_type_for(Path::new("a.YAML")), "application/yaml");
        assert_eq!(content_type_for(Path::new("a.yml")), "application/yaml");
        assert_eq!(content_type_for(Path::new("a.xml")), "application/xml");
        assert_eq!(content_type_for(Path::new("a.log")), "text/plain");
        assert_eq!(content_type_for(Path::new("Makefile")), "text/plain");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(25 * 1024 * 1024), "25 MB");
        assert_eq!(format_size(1536 * 1024), "1.5 MB");
        assert_eq!(format_size(2048), "2 KB");
        assert_eq!(format_size(12), "12 B");
    }

    #[tokio::test]
    async fn test_from_path_and_read_all() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("deploy.yaml");
        let mut f = std::fs::File::create(&yaml).unwrap();
        f.write_all(b"kind: Pod\n").unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, b"hi").unwrap();

        let mut set = AttachmentSet::new(AttachmentLimits::default());
        let attached = AttachedFile::from_path(&yaml).await.unwrap();
        assert_eq!(attached.name, "deploy.yaml");
        assert_eq!(attached.size, 10);
        set.attach(attached).unwrap();
        set.attach(AttachedFile::from_path(&txt).await.unwrap()).unwrap();

        let read = set.read_all().await.unwrap();
        assert_eq!(
            read,
            vec![
                QueryAttachment {
                    attachment_type: "configuration".to_string(),
                    content_type: "application/yaml".to_string(),
                    content: "data:application/yaml;base64,a2luZDogUG9kCg==".to_string(),
                },
                QueryAttachment {
                    attachment_type: "configuration".to_string(),
                    content_type: "text/plain".to_string(),
                    content: "data:text/plain;base64,aGk=".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_read_all_fails_when_file_vanishes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.txt");
        std::fs::write(&path, b"x").unwrap();

        let mut set = AttachmentSet::new(AttachmentLimits::default());
        set.attach(AttachedFile::from_path(&path).await.unwrap())
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = set.read_all().await.unwrap_err();
        assert!(matches!(err, AttachmentError::Read { ref name, .. } if name == "gone.txt"));
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let err = AttachedFile::from_path("/nonexistent/file.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Read { .. }));
    }
}
