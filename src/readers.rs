//! Content readers and capability-based dispatch.
//!
//! A [`Reader`] claims files it can turn into text. The [`ReaderRegistry`]
//! keeps readers in registration order and hands out the **first** one
//! whose [`Reader::can_read`] returns `true`; order is the only tie-break.
//!
//! Built-in readers, registered by [`ReaderRegistry::from_config`]:
//!
//! | Reader | Extensions | Notes |
//! |--------|------------|-------|
//! | `text` | configurable (`txt`, `md`, …) | bytes decoded as UTF-8, lossy |
//! | `document` | `pdf`, `docx`, `odt`, `xml` | via [`crate::extract`] |

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::ReadersConfig;
use crate::extract::{extract_text, DocumentFormat};

/// Turns one kind of file into plain text.
///
/// Reads are blocking; the registry runs them on the blocking pool.
pub trait Reader: Send + Sync {
    fn name(&self) -> &str;

    fn can_read(&self, path: &Path) -> bool;

    fn read_text(&self, path: &Path) -> Result<String>;
}

/// Ordered collection of readers. First match wins.
#[derive(Clone, Default)]
pub struct ReaderRegistry {
    readers: Vec<Arc<dyn Reader>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text reader first, then the document reader when enabled.
    pub fn from_config(config: &ReadersConfig) -> Self {
        let mut registry = Self::new();
        registry.register(TextReader::new(config.text_extensions.iter()));
        if config.documents {
            registry.register(DocumentReader);
        }
        registry
    }

    pub fn register(&mut self, reader: impl Reader + 'static) {
        self.readers.push(Arc::new(reader));
    }

    /// First registered reader that claims `path`.
    pub fn find(&self, path: &Path) -> Option<Arc<dyn Reader>> {
        self.readers.iter().find(|r| r.can_read(path)).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.readers.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Reads files whose extension is in a fixed list as UTF-8 text.
pub struct TextReader {
    extensions: Vec<String>,
}

impl TextReader {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Reader for TextReader {
    fn name(&self) -> &str {
        "text"
    }

    fn can_read(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions.contains(&ext))
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read text file: {}", path.display()))?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

/// PDF, DOCX, ODT and XML documents.
pub struct DocumentReader;

impl Reader for DocumentReader {
    fn name(&self) -> &str {
        "document"
    }

    fn can_read(&self, path: &Path) -> bool {
        DocumentFormat::from_path(path).is_some()
    }

    fn read_text(&self, path: &Path) -> Result<String> {
        let format = DocumentFormat::from_path(path)
            .with_context(|| format!("Unsupported document: {}", path.display()))?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;
        extract_text(&bytes, format)
            .with_context(|| format!("Failed to extract text from {}", path.display()))
    }
}
