//! Source file parsing and text extraction.

use html2text::render::text_renderer::TrivialDecorator;
use kbchat_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    PlainText,
    Markdown,
    Html,
    Pdf,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("txt") | Some("text") => Self::PlainText,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("pdf") => Self::Pdf,
            _ => Self::Unknown,
        }
    }

    /// Detect content type from an HTTP `Content-Type` header value.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "text/html" | "application/xhtml+xml" => Self::Html,
            "text/markdown" => Self::Markdown,
            "application/pdf" => Self::Pdf,
            "text/plain" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Unknown => "unknown",
        }
    }

    /// Whether files of this type are picked up when walking a docs directory.
    pub fn is_ingestible(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Parse a source file and extract clean text.
pub fn parse_file(path: &Path) -> AppResult<String> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    parse_bytes(&bytes, ContentType::from_path(path))
        .map_err(|e| AppError::Knowledge(format!("{:?}: {}", path, e)))
}

/// Extract text from raw content of a known type.
pub fn parse_bytes(bytes: &[u8], content_type: ContentType) -> AppResult<String> {
    match content_type {
        ContentType::Pdf => extract_pdf(bytes),
        ContentType::Html => Ok(clean_html(&decode_text(bytes)?)),
        ContentType::Markdown => Ok(clean_markdown(&decode_text(bytes)?)),
        ContentType::PlainText | ContentType::Unknown => decode_text(bytes),
    }
}

fn decode_text(bytes: &[u8]) -> AppResult<String> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| AppError::Knowledge("Content is not valid UTF-8".to_string()))?;

    if !is_likely_text(text) {
        return Err(AppError::Knowledge("Binary content not supported".to_string()));
    }

    Ok(text.to_string())
}

fn extract_pdf(bytes: &[u8]) -> AppResult<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AppError::Knowledge(format!("Failed to extract PDF text: {}", e)))?;

    // Page breaks come through as form feeds.
    let text = text.replace('\u{c}', "\n").trim().to_string();
    if text.is_empty() {
        return Err(AppError::Knowledge(
            "PDF contains no extractable text (may be image-based)".to_string(),
        ));
    }

    Ok(text)
}

/// Strip markdown headers, rules and code fences.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let trimmed = line.trim_start_matches('#').trim();

        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Width passed to the HTML renderer; wide enough that lines are never wrapped mid-sentence.
const HTML_RENDER_WIDTH: usize = 1_000;

/// Elements whose content is never document text.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

/// Render HTML to plain text and collapse whitespace.
///
/// Entities (named and numeric) are decoded by the HTML parser.
pub fn clean_html(text: &str) -> String {
    let body = strip_raw_text_elements(text);
    let rendered = html2text::from_read_with_decorator(
        body.as_bytes(),
        HTML_RENDER_WIDTH,
        TrivialDecorator::new(),
    );

    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_raw_text_elements(html: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with `html`.
    let lower = html.to_ascii_lowercase();
    let mut result = String::with_capacity(html.len());
    let mut pos = 0;

    loop {
        let next = RAW_TEXT_ELEMENTS
            .iter()
            .filter_map(|name| {
                lower[pos..]
                    .find(&format!("<{}", name))
                    .map(|i| (pos + i, *name))
            })
            .min_by_key(|(i, _)| *i);

        let Some((start, name)) = next else {
            break;
        };

        result.push_str(&html[pos..start]);

        let closing = format!("</{}", name);
        pos = lower[start..]
            .find(&closing)
            .and_then(|i| lower[start + i..].find('>').map(|j| start + i + j + 1))
            .unwrap_or(html.len());
    }

    result.push_str(&html[pos..]);
    result
}

fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}
