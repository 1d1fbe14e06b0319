use neardupe::scanner::document::{DocumentError, DocumentExtractor};
use neardupe::scanner::{ExtractionMode, Walker, WalkerConfig};
use neardupe::similarity::{DetectorConfig, DuplicateDetector, PrefilterConfig};
use std::fs;
use tempfile::tempdir;

const TEXT: &str = "The quick brown fox jumps over the lazy dog. It was a sunny day in the park.";

fn preprocessed_detector(size_ratio: f64) -> DuplicateDetector {
    DuplicateDetector::new(
        DetectorConfig::default()
            .with_mode(ExtractionMode::Preprocessed)
            .with_prefilter(PrefilterConfig::default().with_size_ratio(size_ratio)),
    )
}

#[test]
fn test_extract_plain_and_markdown() {
    let temp_dir = tempdir().unwrap();
    let txt = temp_dir.path().join("a.txt");
    let md = temp_dir.path().join("a.md");
    fs::write(&txt, TEXT).unwrap();
    fs::write(&md, TEXT).unwrap();

    assert_eq!(DocumentExtractor::extract_raw(&txt).unwrap(), TEXT);
    assert_eq!(DocumentExtractor::extract_raw(&md).unwrap(), TEXT);
}

#[test]
fn test_extract_html_drops_markup() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("page.html");
    fs::write(
        &path,
        "<html><head><script>var x = 1;</script></head><body><p>Fish &amp; chips</p></body></html>",
    )
    .unwrap();

    let text = DocumentExtractor::extract_raw(&path).unwrap();

    assert!(text.contains("Fish & chips"));
    assert!(!text.contains("var x"));
    assert!(!text.contains('<'));
}

#[test]
fn test_extract_docx() {
    use docx_rs::{Docx, Paragraph, Run};

    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("letter.docx");
    let file = fs::File::create(&path).unwrap();
    Docx::new()
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text(TEXT)))
        .build()
        .pack(file)
        .unwrap();

    let text = DocumentExtractor::extract_raw(&path).unwrap();
    assert_eq!(text.trim(), TEXT);
}

#[test]
fn test_unsupported_extension() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("image.png");
    fs::write(&path, [0u8, 1, 2]).unwrap();

    assert!(matches!(
        DocumentExtractor::extract_raw(&path),
        Err(DocumentError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_html_and_text_versions_match_when_preprocessed() {
    let temp_dir = tempdir().unwrap();
    let target = temp_dir.path().join("page.html");
    fs::write(&target, format!("<html><body><p>{}</p></body></html>", TEXT)).unwrap();
    fs::write(temp_dir.path().join("page.txt"), TEXT).unwrap();

    let report = preprocessed_detector(1.5)
        .detect(&target, &Walker::new(temp_dir.path(), WalkerConfig::default()))
        .unwrap();

    assert_eq!(report.result("page.txt").unwrap().score.value(), 100.0);
}

#[test]
fn test_docx_copy_of_text_detected() {
    use docx_rs::{Docx, Paragraph, Run};

    let temp_dir = tempdir().unwrap();
    let target = temp_dir.path().join("letter.txt");
    fs::write(&target, TEXT).unwrap();
    let file = fs::File::create(temp_dir.path().join("letter.docx")).unwrap();
    Docx::new()
        .add_paragraph(Paragraph::new().add_run(Run::new().add_text(TEXT)))
        .build()
        .pack(file)
        .unwrap();

    // A zipped docx is far larger than its text
    let report = preprocessed_detector(1000.0)
        .detect(&target, &Walker::new(temp_dir.path(), WalkerConfig::default()))
        .unwrap();

    assert_eq!(report.result("letter.docx").unwrap().score.value(), 100.0);
}

fn write_odt(path: &std::path::Path, body: &str) {
    use std::io::Write;

    let mut archive = zip::ZipWriter::new(fs::File::create(path).unwrap());
    let options = zip::write::FileOptions::default();
    archive.start_file("mimetype", options).unwrap();
    archive
        .write_all(b"application/vnd.oasis.opendocument.text")
        .unwrap();
    archive.start_file("content.xml", options).unwrap();
    write!(
        archive,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><office:document-content><office:body><office:text><text:p>{}</text:p></office:text></office:body></office:document-content>",
        body
    )
    .unwrap();
    archive.finish().unwrap();
}

#[test]
fn test_extract_odt() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("minutes.odt");
    write_odt(&path, TEXT);

    let text = DocumentExtractor::extract_raw(&path).unwrap();
    assert_eq!(text.trim(), TEXT);
}

#[test]
fn test_odt_copy_of_text_detected() {
    let temp_dir = tempdir().unwrap();
    let target = temp_dir.path().join("minutes.txt");
    fs::write(&target, TEXT).unwrap();
    write_odt(&temp_dir.path().join("minutes.odt"), TEXT);

    let report = preprocessed_detector(1000.0)
        .detect(&target, &Walker::new(temp_dir.path(), WalkerConfig::default()))
        .unwrap();

    assert_eq!(report.result("minutes.odt").unwrap().score.value(), 100.0);
}
