//! Text extraction for binary and markup documents (PDF, DOCX, ODT, XML).
//!
//! Readers hand raw bytes plus a [`DocumentFormat`] to [`extract_text`] and
//! get back plain UTF-8 text. Extraction never panics on malformed input;
//! it returns an [`ExtractError`] and the caller decides what to skip.
//!
//! | Format | Source of text |
//! |--------|----------------|
//! | PDF    | `pdf-extract` over the whole file |
//! | DOCX   | `<w:t>` runs in `word/document.xml`, one line per `<w:p>` |
//! | ODT    | `<text:p>` / `<text:h>` in `content.xml`, one line per block |
//! | XML    | every text and CDATA node, one per line |

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Formats the document reader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Odt,
    Xml,
}

impl DocumentFormat {
    /// Format implied by the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "odt" => Some(Self::Odt),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
    Archive(String),
    Xml(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Archive(e) => write!(f, "document archive unreadable: {}", e),
            ExtractError::Xml(e) => write!(f, "XML extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractError> {
    match format {
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Docx => {
            let xml = read_archive_entry(bytes, "word/document.xml")?;
            collect_text(&xml, Dialect::Docx)
        }
        DocumentFormat::Odt => {
            let xml = read_archive_entry(bytes, "content.xml")?;
            collect_text(&xml, Dialect::Odt)
        }
        DocumentFormat::Xml => collect_text(bytes, Dialect::Plain),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn read_archive_entry(bytes: &[u8], name: &str) -> Result<Vec<u8>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Archive(e.to_string()))?;
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Archive(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Archive(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Archive(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Docx,
    Odt,
    Plain,
}

impl Dialect {
    /// Elements whose text content is kept.
    fn is_text(self, name: &[u8]) -> bool {
        match self {
            Dialect::Docx => name == b"t",
            Dialect::Odt => name == b"p" || name == b"h",
            Dialect::Plain => true,
        }
    }

    /// Elements that end a line of output.
    fn is_block(self, name: &[u8]) -> bool {
        match self {
            Dialect::Docx => name == b"p",
            Dialect::Odt => name == b"p" || name == b"h",
            Dialect::Plain => false,
        }
    }
}

fn end_line(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn collect_text(xml: &[u8], dialect: Dialect) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    // Word runs carry meaningful leading and trailing spaces.
    reader.config_mut().trim_text(dialect == Dialect::Plain);
    let mut buf = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if dialect != Dialect::Plain && dialect.is_text(e.local_name().as_ref()) {
                    depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if dialect != Dialect::Plain && dialect.is_text(name.as_ref()) {
                    depth = depth.saturating_sub(1);
                }
                if dialect.is_block(name.as_ref()) {
                    end_line(&mut out);
                }
            }
            Ok(Event::Empty(e)) => match (dialect, e.local_name().as_ref()) {
                (Dialect::Odt, b"s") => out.push(' '),
                (Dialect::Odt, b"tab") | (Dialect::Docx, b"tab") => out.push('\t'),
                (Dialect::Odt, b"line-break") | (Dialect::Docx, b"br") => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if depth > 0 || dialect == Dialect::Plain => {
                let text = t.unescape().map_err(|e| ExtractError::Xml(e.to_string()))?;
                if dialect == Dialect::Plain {
                    end_line(&mut out);
                }
                out.push_str(&text);
            }
            Ok(Event::CData(c)) if depth > 0 || dialect == Dialect::Plain => {
                if dialect == Dialect::Plain {
                    end_line(&mut out);
                }
                out.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    let trimmed = out.trim_end_matches('\n').len();
    out.truncate(trimmed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(name: &str, content: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/b.PDF")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes.odt")),
            Some(DocumentFormat::Odt)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("notes.txt")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_text(b"not a pdf", DocumentFormat::Pdf).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_text(b"not a zip", DocumentFormat::Docx).unwrap_err();
        assert!(matches!(err, ExtractError::Archive(_)));
    }

    #[test]
    fn docx_without_document_part_is_error() {
        let bytes = zip_with("word/styles.xml", "<styles/>");
        let err = extract_text(&bytes, DocumentFormat::Docx).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t xml:space="preserve">Bananas are </w:t></w:r><w:r><w:t>berries</w:t></w:r></w:p>
    <w:p><w:r><w:t>Tom &amp; Jerry</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let bytes = zip_with("word/document.xml", xml);
        let text = extract_text(&bytes, DocumentFormat::Docx).unwrap();
        assert_eq!(text, "Bananas are berries\nTom & Jerry");
    }

    #[test]
    fn odt_paragraphs_and_headings() {
        let xml = r#"<?xml version="1.0"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0"
    xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
  <office:body><office:text>
    <text:h>Title</text:h>
    <text:p>one<text:s/>two <text:span>three</text:span></text:p>
  </office:text></office:body>
</office:document-content>"#;
        let bytes = zip_with("content.xml", xml);
        let text = extract_text(&bytes, DocumentFormat::Odt).unwrap();
        assert_eq!(text, "Title\none two three");
    }

    #[test]
    fn plain_xml_collects_text_nodes() {
        let xml = br#"<notes><note>first</note><note><![CDATA[second <raw>]]></note></notes>"#;
        let text = extract_text(xml, DocumentFormat::Xml).unwrap();
        assert_eq!(text, "first\nsecond <raw>");
    }

    #[test]
    fn malformed_xml_returns_error() {
        let err = extract_text(b"<a><b></a>", DocumentFormat::Xml).unwrap_err();
        assert!(matches!(err, ExtractError::Xml(_)));
    }
}
