//! Integration tests for the cvgen pipeline.
//!
//! These tests validate:
//! - Load → Render → Convert over on-disk fixtures
//! - Template substitution and the permissive undefined policy
//! - Default output-name derivation
//! - Error reporting for missing inputs
//! - Pagination and deterministic output
//!
//! Web fonts stay disabled throughout so the suite runs offline.

use std::fs;
use std::path::Path;

use cvgen::data;
use cvgen::error::CvError;
use cvgen::pipeline::{compute_document_layout, generate_pdf, PipelineConfig};
use cvgen::template::TemplateRenderer;

// =====================================================================
// Helpers
// =====================================================================

fn offline_config() -> PipelineConfig {
    PipelineConfig {
        web_fonts: false,
        ..PipelineConfig::default()
    }
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "missing PDF header");
}

/// Write a data file + template dir fixture and run Load → Render.
fn load_and_render(dir: &Path, data_json: &str, template: &str) -> (data::Document, String) {
    let data_path = dir.join("cv_data.json");
    fs::write(&data_path, data_json).unwrap();
    let tpl_dir = dir.join("templates");
    fs::create_dir_all(&tpl_dir).unwrap();
    fs::write(tpl_dir.join("cv_template.html"), template).unwrap();

    let document = data::load_document(&data_path).unwrap();
    let html = TemplateRenderer::from_dir(&tpl_dir)
        .render("cv_template.html", &document)
        .unwrap();
    (document, html)
}

const MINIMAL_TEMPLATE: &str = r#"<html>
<head><style>body { font-size: 11pt; }</style></head>
<body>
<h1>{{ personal.name }}</h1>
<p>{{ personal.title }}</p>
{% for job in work %}<div class="entry"><h3>{{ job.title }}</h3><p>{{ job.company }}</p></div>{% endfor %}
</body>
</html>"#;

const MINIMAL_DATA: &str = r#"{
    "personal": {"name": "Test User", "title": "Engineer"},
    "work": [{"title": "Dev", "company": "Acme"}]
}"#;

// =====================================================================
// End-to-end pipeline
// =====================================================================

#[test]
fn pipeline_produces_nonempty_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let (_, html) = load_and_render(dir.path(), MINIMAL_DATA, MINIMAL_TEMPLATE);

    let (bytes, layout) = generate_pdf(&html, &offline_config()).unwrap();
    assert_valid_pdf(&bytes);
    assert!(!layout.pages.is_empty());
}

#[test]
fn pipeline_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let (document, html) = load_and_render(dir.path(), MINIMAL_DATA, MINIMAL_TEMPLATE);

    let output = dir.path().join(data::default_output_name(&document));
    let (bytes, _) = generate_pdf(&html, &offline_config()).unwrap();
    fs::write(&output, &bytes).unwrap();

    let written = fs::read(&output).unwrap();
    assert_valid_pdf(&written);
    assert_eq!(output.file_name().unwrap(), "cv_test_user.pdf");
}

#[test]
fn shipped_template_and_sample_data_render() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let document = data::load_document(&root.join("cv_data.json")).unwrap();
    let html = TemplateRenderer::from_dir(&root.join("templates"))
        .render("cv_template.html", &document)
        .unwrap();

    assert!(html.contains("Jane Q. Doe"));
    assert!(html.contains("Senior Software Engineer"));
    assert!(html.contains("Utrecht University"));

    let (bytes, layout) = generate_pdf(&html, &offline_config()).unwrap();
    assert_valid_pdf(&bytes);
    assert!(!layout.pages.is_empty());
}

// =====================================================================
// Template substitution
// =====================================================================

#[test]
fn substituted_values_appear_in_markup() {
    let dir = tempfile::tempdir().unwrap();
    let (_, html) = load_and_render(dir.path(), MINIMAL_DATA, MINIMAL_TEMPLATE);
    assert!(html.contains("Test User"));
    assert!(html.contains("Acme"));
}

#[test]
fn unresolved_references_render_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (_, html) = load_and_render(
        dir.path(),
        r#"{"personal": {"name": "X"}}"#,
        "<p>[{{ missing.field }}]</p><p>[{{ personal.absent }}]</p>",
    );
    assert!(html.contains("[]"));
    assert!(!html.contains("missing"));
}

#[test]
fn include_partial_from_template_dir() {
    let dir = tempfile::tempdir().unwrap();
    let tpl_dir = dir.path().join("templates");
    fs::create_dir_all(&tpl_dir).unwrap();
    fs::write(
        tpl_dir.join("cv_template.html"),
        "<div>{% include '_contact.html' %}</div>",
    )
    .unwrap();
    fs::write(tpl_dir.join("_contact.html"), "<p>{{ personal.email }}</p>").unwrap();

    let document: data::Document =
        serde_json::from_str(r#"{"personal": {"email": "a@b.c"}}"#).unwrap();
    let html = TemplateRenderer::from_dir(&tpl_dir)
        .render("cv_template.html", &document)
        .unwrap();
    assert!(html.contains("a@b.c"));
}

// =====================================================================
// Output naming
// =====================================================================

#[test]
fn output_name_derivation() {
    let document: data::Document =
        serde_json::from_str(r#"{"personal": {"name": "Jane Q. Doe"}}"#).unwrap();
    assert_eq!(data::default_output_name(&document), "cv_jane_q._doe.pdf");
}

// =====================================================================
// Error paths
// =====================================================================

#[test]
fn missing_data_file_fails_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let err = data::load_document(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, CvError::DataNotFound(_)));
    // Nothing was created.
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn missing_template_fails_before_output() {
    let dir = tempfile::tempdir().unwrap();
    let document: data::Document = serde_json::from_str("{}").unwrap();
    let err = TemplateRenderer::from_dir(dir.path())
        .render("cv_template.html", &document)
        .unwrap_err();
    assert!(matches!(err, CvError::TemplateNotFound(_)));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn malformed_data_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cv_data.json");
    fs::write(&path, "{\"personal\": ").unwrap();
    let err = data::load_document(&path).unwrap_err();
    assert!(matches!(err, CvError::DataParse { .. }));
}

// =====================================================================
// Auxiliary HTML output
// =====================================================================

#[test]
fn auxiliary_html_file_contains_substituted_values() {
    let dir = tempfile::tempdir().unwrap();
    let (document, html) = load_and_render(dir.path(), MINIMAL_DATA, MINIMAL_TEMPLATE);

    let pdf_path = dir.path().join(data::default_output_name(&document));
    let html_path = pdf_path.with_extension("html");
    fs::write(&html_path, &html).unwrap();

    let contents = fs::read_to_string(&html_path).unwrap();
    assert!(contents.contains("Test User"));
    assert_eq!(html_path.file_name().unwrap(), "cv_test_user.html");
}

// =====================================================================
// Determinism
// =====================================================================

#[test]
fn rendering_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let (_, html1) = load_and_render(dir.path(), MINIMAL_DATA, MINIMAL_TEMPLATE);
    let dir2 = tempfile::tempdir().unwrap();
    let (_, html2) = load_and_render(dir2.path(), MINIMAL_DATA, MINIMAL_TEMPLATE);

    // Rendered markup is byte-identical across runs.
    assert_eq!(html1, html2);

    // The PDF library embeds a generation timestamp, so compare sizes with a
    // small tolerance instead of bytes.
    let (bytes1, _) = generate_pdf(&html1, &offline_config()).unwrap();
    let (bytes2, _) = generate_pdf(&html2, &offline_config()).unwrap();
    let diff = (bytes1.len() as i64 - bytes2.len() as i64).unsigned_abs();
    assert!(
        diff < 200,
        "PDF outputs differ significantly: {} vs {} bytes",
        bytes1.len(),
        bytes2.len()
    );
}

// =====================================================================
// Pagination
// =====================================================================

#[test]
fn long_documents_paginate() {
    let mut jobs = String::new();
    for i in 0..40 {
        jobs.push_str(&format!(
            r#"{{"title": "Role {i}", "company": "Company {i} with a reasonably long description line"}},"#
        ));
    }
    let data_json = format!(
        r#"{{"personal": {{"name": "P"}}, "work": [{}{{"title": "Last", "company": "End"}}]}}"#,
        jobs
    );

    let dir = tempfile::tempdir().unwrap();
    let (_, html) = load_and_render(dir.path(), &data_json, MINIMAL_TEMPLATE);
    let layout = compute_document_layout(&html, &offline_config());
    assert!(
        layout.pages.len() > 1,
        "expected multiple pages, got {}",
        layout.pages.len()
    );
}

// =====================================================================
// Images
// =====================================================================

#[test]
fn data_uri_image_renders() {
    // 1×1 transparent PNG
    let html = r#"<img src="data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==" style="width: 64px; height: 64px" />"#;
    let (bytes, _) = generate_pdf(html, &offline_config()).unwrap();
    assert_valid_pdf(&bytes);
}

#[test]
fn unreachable_image_is_skipped_not_fatal() {
    let html = r#"<p>before</p><img src="missing-photo.jpg" style="width: 50px; height: 50px" /><p>after</p>"#;
    let (bytes, _) = generate_pdf(html, &offline_config()).unwrap();
    assert_valid_pdf(&bytes);
}
