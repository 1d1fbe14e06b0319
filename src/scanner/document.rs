//! Document text extraction.
//!
//! This module provides functionality for extracting text from various document formats:
//! - PDF documents (via pdf-extract)
//! - Word documents (via docx-rs)
//! - OpenDocument text (content.xml read out of the zip container)
//! - HTML and RTF (markup stripped with regex)
//! - Plain text files (TXT, MD)
//!
//! Extraction runs in one of two [`ExtractionMode`]s. Raw mode returns the
//! text as found in the file; preprocessed mode additionally runs it through a
//! [`PreprocessContext`]. The two modes produce different fingerprints for the
//! same file, so a detection run must use one mode for both sides.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::preprocess::PreprocessContext;

/// Lowercase extensions the extractor understands.
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["txt", "md", "pdf", "docx", "odt", "rtf", "html", "htm"];

/// Errors that can occur during document text extraction.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An error occurred during PDF extraction.
    #[error("Failed to extract text from PDF {path}: {message}")]
    PdfError {
        /// Path to the PDF file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// An error occurred during DOCX extraction.
    #[error("Failed to extract text from DOCX {path}: {message}")]
    DocxError {
        /// Path to the DOCX file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// An error occurred while reading an OpenDocument container.
    #[error("Failed to extract text from ODT {path}: {message}")]
    OdtError {
        /// Path to the ODT file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// The document format is not supported.
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Extraction did not finish within the allotted time.
    #[error("Timed out extracting text from {0}")]
    Timeout(PathBuf),

    /// The extractor failed without a format-specific error (e.g. it panicked).
    #[error("Extraction failed for {path}: {message}")]
    ExtractionFailed {
        /// Path to the document
        path: PathBuf,
        /// Error message
        message: String,
    },
}

/// How extracted text is post-processed before fingerprinting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Text exactly as extracted
    #[default]
    Raw,
    /// Case-folded, punctuation-stripped, stopword-filtered and stemmed
    Preprocessed,
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionMode::Raw => write!(f, "raw"),
            ExtractionMode::Preprocessed => write!(f, "preprocessed"),
        }
    }
}

/// Source of document text.
pub trait TextSource: Send + Sync {
    /// Extract the text of the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] if the format is unsupported or extraction fails.
    fn extract_text(&self, path: &Path) -> Result<String, DocumentError>;
}

/// Filesystem-backed extractor for document text.
#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    mode: ExtractionMode,
    context: Arc<PreprocessContext>,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(ExtractionMode::Raw, Arc::new(PreprocessContext::default()))
    }
}

impl DocumentExtractor {
    /// Create an extractor.
    ///
    /// # Arguments
    ///
    /// * `mode` - Raw or preprocessed output
    /// * `context` - Preprocessing context used in preprocessed mode
    #[must_use]
    pub fn new(mode: ExtractionMode, context: Arc<PreprocessContext>) -> Self {
        Self { mode, context }
    }

    /// The configured extraction mode.
    #[must_use]
    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    /// Whether `path` has an extension this extractor understands.
    #[must_use]
    pub fn is_supported(path: &Path) -> bool {
        SUPPORTED_EXTENSIONS.contains(&Self::extension_of(path).as_str())
    }

    fn extension_of(path: &Path) -> String {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default()
    }

    /// Extract raw text from a document at the given path, ignoring the mode.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the document file
    pub fn extract_raw(path: &Path) -> Result<String, DocumentError> {
        let extension = Self::extension_of(path);

        match extension.as_str() {
            "pdf" => Self::extract_pdf(path),
            "docx" => Self::extract_docx(path),
            "odt" => Self::extract_odt(path),
            "html" | "htm" => Self::read_to_string(path).map(|s| strip_html(&s)),
            "rtf" => Self::read_to_string(path).map(|s| strip_rtf(&s)),
            "txt" | "md" => Self::read_to_string(path),
            _ => Err(DocumentError::UnsupportedFormat(extension)),
        }
    }

    /// Extract text from a PDF file.
    fn extract_pdf(path: &Path) -> Result<String, DocumentError> {
        pdf_extract::extract_text(path).map_err(|e| DocumentError::PdfError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Extract text from a DOCX file.
    fn extract_docx(path: &Path) -> Result<String, DocumentError> {
        let bytes = fs::read(path).map_err(|e| DocumentError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let docx = docx_rs::read_docx(&bytes).map_err(|e| DocumentError::DocxError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut text = String::new();
        for child in &docx.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                Self::push_paragraph(p, &mut text);
            } else if let docx_rs::DocumentChild::Table(t) = child {
                Self::push_table(t, &mut text);
            }
        }

        Ok(text)
    }

    /// Extract text from an OpenDocument text file.
    fn extract_odt(path: &Path) -> Result<String, DocumentError> {
        let odt_error = |message: String| DocumentError::OdtError {
            path: path.to_path_buf(),
            message,
        };
        let file = fs::File::open(path).map_err(|e| DocumentError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| odt_error(e.to_string()))?;
        let mut content = archive
            .by_name("content.xml")
            .map_err(|e| odt_error(e.to_string()))?;
        let mut xml = String::new();
        content
            .read_to_string(&mut xml)
            .map_err(|e| odt_error(e.to_string()))?;

        Ok(strip_odf(&xml))
    }

    fn push_paragraph(paragraph: &docx_rs::Paragraph, text: &mut String) {
        for child in &paragraph.children {
            if let docx_rs::ParagraphChild::Run(r) = child {
                for child in &r.children {
                    if let docx_rs::RunChild::Text(t) = child {
                        text.push_str(&t.text);
                    }
                }
            }
        }
        text.push('\n');
    }

    fn push_table(table: &docx_rs::Table, text: &mut String) {
        for row_child in &table.rows {
            let docx_rs::TableChild::TableRow(tr) = row_child;
            for cell_child in &tr.cells {
                let docx_rs::TableRowChild::TableCell(tc) = cell_child;
                for content in &tc.children {
                    match content {
                        docx_rs::TableCellContent::Paragraph(p) => Self::push_paragraph(p, text),
                        docx_rs::TableCellContent::Table(t) => Self::push_table(t, text),
                        _ => {}
                    }
                }
            }
        }
    }

    fn read_to_string(path: &Path) -> Result<String, DocumentError> {
        fs::read_to_string(path).map_err(|e| DocumentError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl TextSource for DocumentExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, DocumentError> {
        let raw = Self::extract_raw(path)?;
        Ok(match self.mode {
            ExtractionMode::Raw => raw,
            ExtractionMode::Preprocessed => self.context.process(&raw),
        })
    }
}

fn html_patterns() -> &'static [(Regex, &'static str); 3] {
    static PATTERNS: OnceLock<[(Regex, &'static str); 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid regex"),
                " ",
            ),
            (Regex::new(r"(?s)<!--.*?-->").expect("valid regex"), " "),
            (Regex::new(r"(?s)<[^>]*>").expect("valid regex"), " "),
        ]
    })
}

/// Remove markup from an HTML document and decode the common entities.
fn strip_html(html: &str) -> String {
    let mut text = html.to_string();
    for (re, replacement) in html_patterns() {
        text = re.replace_all(&text, *replacement).into_owned();
    }
    decode_entities(&text.replace("&nbsp;", " "))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Flatten the body of an ODF `content.xml` into lines of text.
fn strip_odf(xml: &str) -> String {
    static PATTERNS: OnceLock<[(Regex, &'static str); 4]> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            // Automatic styles and font declarations carry no text
            (
                Regex::new(r"(?s)<office:(automatic-styles|font-face-decls)>.*?</office:(automatic-styles|font-face-decls)>")
                    .expect("valid regex"),
                "",
            ),
            (
                Regex::new(r"</text:(p|h)>|<text:line-break\s*/>").expect("valid regex"),
                "\n",
            ),
            (Regex::new(r"<text:(s|tab)\b[^>]*/>").expect("valid regex"), " "),
            (Regex::new(r"(?s)<[^>]*>").expect("valid regex"), ""),
        ]
    });

    let mut text = xml.to_string();
    for (re, replacement) in patterns {
        text = re.replace_all(&text, *replacement).into_owned();
    }
    decode_entities(&text)
}

/// Remove control words, groups and braces from an RTF document.
fn strip_rtf(rtf: &str) -> String {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    let (destinations, controls) = PATTERNS.get_or_init(|| {
        (
            // Ignorable destinations such as {\*\generator ...} and font tables
            Regex::new(r"\{\\\*[^{}]*\}|\{\\(fonttbl|colortbl|stylesheet|info)[^{}]*(\{[^{}]*\}[^{}]*)*\}")
                .expect("valid regex"),
            Regex::new(r"\\[a-zA-Z]+-?\d* ?|\\'[0-9a-fA-F]{2}|\\[{}\\]").expect("valid regex"),
        )
    });
    let text = destinations.replace_all(rtf, "");
    let text = text.replace("\\par", "\n");
    let text = controls.replace_all(&text, "");
    text.replace(['{', '}'], "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_extract_plain_text() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "note.txt", "Hello world\n");

        let extracted = DocumentExtractor::default().extract_text(&path).unwrap();
        assert_eq!(extracted, "Hello world\n");
    }

    #[test]
    fn test_extract_preprocessed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "note.md", "The Cats, the DOGS!");

        let extractor = DocumentExtractor::new(
            ExtractionMode::Preprocessed,
            Arc::new(PreprocessContext::default()),
        );
        assert_eq!(extractor.extract_text(&path).unwrap(), "cat dog");
    }

    #[test]
    fn test_unsupported_format() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "program.exe", "MZ");

        let result = DocumentExtractor::default().extract_text(&path);
        assert!(matches!(result, Err(DocumentError::UnsupportedFormat(ext)) if ext == "exe"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = DocumentExtractor::extract_raw(Path::new("/missing/dir/file.txt"));
        assert!(matches!(result, Err(DocumentError::Io { .. })));
    }

    #[test]
    fn test_corrupt_pdf_and_docx() {
        let dir = TempDir::new().unwrap();
        let pdf = write(&dir, "corrupt.pdf", "NOT A PDF %PDF-1.4 garbage");
        let docx = write(&dir, "corrupt.docx", "NOT A DOCX zip header missing");

        assert!(matches!(
            DocumentExtractor::extract_raw(&pdf),
            Err(DocumentError::PdfError { .. })
        ));
        assert!(matches!(
            DocumentExtractor::extract_raw(&docx),
            Err(DocumentError::DocxError { .. })
        ));
    }

    #[test]
    fn test_corrupt_odt() {
        let dir = TempDir::new().unwrap();
        let odt = write(&dir, "corrupt.odt", "PK but not really a zip");

        assert!(matches!(
            DocumentExtractor::extract_raw(&odt),
            Err(DocumentError::OdtError { .. })
        ));
    }

    #[test]
    fn test_strip_odf() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content><office:font-face-decls><style:font-face style:name="Liberation Serif"/></office:font-face-decls><office:automatic-styles><style:style style:name="P1"/></office:automatic-styles><office:body><office:text><text:h text:outline-level="1">Minutes</text:h><text:p text:style-name="P1">Fish<text:s/>&amp;<text:tab/>chips</text:p></office:text></office:body></office:document-content>"#;

        let text = strip_odf(xml);
        let lines: Vec<_> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        assert_eq!(lines, vec!["Minutes", "Fish & chips"]);
        assert!(!text.contains("Liberation"));
    }

    #[test]
    fn test_strip_html() {
        let html = "<html><head><style>p { color: red; }</style>\
                    <script>var x = 1;</script></head>\
                    <body><!-- note --><p>Fish &amp; chips</p></body></html>";
        let text = strip_html(html);
        let words: Vec<_> = text.split_whitespace().collect();
        assert_eq!(words, vec!["Fish", "&", "chips"]);
    }

    #[test]
    fn test_strip_rtf() {
        let rtf = r"{\rtf1\ansi{\fonttbl{\f0 Arial;}}\f0\fs24 Hello \b world\b0\par Second line}";
        let text = strip_rtf(rtf);
        let words: Vec<_> = text.split_whitespace().collect();
        assert_eq!(words, vec!["Hello", "world", "Second", "line"]);
    }

    #[test]
    fn test_is_supported() {
        assert!(DocumentExtractor::is_supported(Path::new("a/b.HTML")));
        assert!(DocumentExtractor::is_supported(Path::new("notes.md")));
        assert!(!DocumentExtractor::is_supported(Path::new("x.pdf.crdownload")));
        assert!(!DocumentExtractor::is_supported(Path::new("Makefile")));
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(ExtractionMode::Raw.to_string(), "raw");
        assert_eq!(ExtractionMode::Preprocessed.to_string(), "preprocessed");
    }
}
