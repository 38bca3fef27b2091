//! Scene image resolution and staged-name derivation.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine as _;

/// Process-local sequence for run identifiers.
static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Short identifier namespacing one run's staged files.
///
/// Working storage is a flat namespace shared by every request in the
/// process, so staged names carry a per-run prefix in addition to the
/// zero-padded position.
pub(crate) fn next_run_id() -> String {
    let seq = RUN_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("r{:x}-{:02x}", std::process::id(), seq)
}

/// Staged file name for the scene at the given 0-based position.
pub(crate) fn staged_name(run_id: &str, position: usize, extension: &str) -> String {
    format!("{run_id}_scene_{position:03}.{extension}")
}

/// Decode a `data:image/...;base64,...` URI into bytes and a file
/// extension.
pub(crate) fn decode_data_uri(uri: &str) -> Result<(Vec<u8>, &'static str), String> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| "not a data URI".to_string())?;
    let (header, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| "data URI is not base64-encoded".to_string())?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64 payload: {e}"))?;
    if bytes.is_empty() {
        return Err("data URI decoded to zero bytes".to_string());
    }
    Ok((bytes, extension_for_mime(header)))
}

/// File extension for an image MIME type; defaults to png.
fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}

/// File extension guessed from a URL or path; defaults to png.
pub(crate) fn extension_for_location(location: &str) -> &'static str {
    let trimmed = location.split(['?', '#']).next().unwrap_or(location);
    match Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "jpg",
        Some("webp") => "webp",
        _ => "png",
    }
}
