//! Content-sniffing MIME detection.
//!
//! Detection order:
//! 1. Magic byte signatures via `infer`
//! 2. Text heuristics for valid UTF-8 (XML, HTML, JSON, plain text)
//! 3. `application/octet-stream`

use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::defaults::{OCTET_STREAM, SNIFF_LIMIT_BYTES, TEXT_PLAIN, TEXT_PLAIN_UTF8};
use crate::error::Result;
use crate::logging;

/// Detect the MIME type of an in-memory buffer.
///
/// Only the first [`SNIFF_LIMIT_BYTES`] are examined, so a buffer and a
/// file holding the same bytes sniff alike.
pub fn detect_bytes(data: &[u8]) -> String {
    if data.is_empty() {
        return TEXT_PLAIN.to_string();
    }

    let truncated = data.len() > SNIFF_LIMIT_BYTES;
    let head = &data[..data.len().min(SNIFF_LIMIT_BYTES)];

    let magic = infer::get(head);
    if let Some(kind) = magic.filter(|k| k.matcher_type() != infer::MatcherType::Text) {
        return kind.mime_type().to_string();
    }

    // infer's text matchers carry no charset; prefer our own text rules.
    match std::str::from_utf8(head) {
        Ok(text) => detect_text(text, truncated).to_string(),
        // The cut may land inside a multi-byte sequence.
        Err(e) if truncated && e.error_len().is_none() => {
            let text = std::str::from_utf8(&head[..e.valid_up_to()]).unwrap_or_default();
            detect_text(text, truncated).to_string()
        }
        Err(_) => magic
            .map(|k| k.mime_type().to_string())
            .unwrap_or_else(|| OCTET_STREAM.to_string()),
    }
}

/// Detect the MIME type of a file from its leading bytes.
///
/// Reads at most one byte past [`SNIFF_LIMIT_BYTES`] so truncation is
/// visible to [`detect_bytes`]; fails if the file cannot be opened or read.
pub async fn detect_file(path: &Path) -> Result<String> {
    let file = tokio::fs::File::open(path).await?;
    let mut head = Vec::with_capacity(SNIFF_LIMIT_BYTES + 1);
    file.take(SNIFF_LIMIT_BYTES as u64 + 1)
        .read_to_end(&mut head)
        .await?;

    let mime = detect_bytes(&head);
    debug!(
        subsystem = logging::SUBSYSTEM,
        component = logging::COMPONENT_MIME,
        op = logging::OP_SNIFF,
        path = %path.display(),
        byte_len = head.len(),
        mime_type = %mime,
        "Sniffed file type"
    );
    Ok(mime)
}

/// Classify UTF-8 text. When `truncated`, a JSON document that is valid up
/// to the cut still counts as JSON.
fn detect_text(text: &str, truncated: bool) -> &'static str {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    let lower_prefix: String = trimmed.chars().take(16).collect::<String>().to_lowercase();

    if lower_prefix.starts_with("<?xml") {
        return "text/xml; charset=utf-8";
    }
    if lower_prefix.starts_with("<!doctype html") || lower_prefix.starts_with("<html") {
        return "text/html; charset=utf-8";
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(_) => return "application/json",
            Err(e) if truncated && e.is_eof() => return "application/json",
            Err(_) => {}
        }
    }

    TEXT_PLAIN_UTF8
}
