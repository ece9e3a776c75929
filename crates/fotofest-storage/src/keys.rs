//! Logical path generation for storage backends.
//!
//! Path format: `events/{event_id}/{album}/{timestamp}_{random}_{name}.{ext}`
//! for event photos, `homepage/{timestamp}_{random}_{name}.{ext}` for
//! homepage photos. All backends that expose paths use this format; the
//! drive backend maps the directory components to folders.

use chrono::Utc;
use fotofest_core::PhotoMetadata;
use rand::Rng;

const MAX_NAME_LEN: usize = 64;
const EVENT_FALLBACK: &str = "unassigned";

/// Sanitize one path segment: basename only, charset allowlist, length cap.
pub fn sanitize_segment(segment: &str) -> String {
    let base = std::path::Path::new(segment)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(segment);
    if base.contains("..") {
        return "invalid".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX_NAME_LEN)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim_matches(['_', '.']).is_empty() {
        "file".to_string()
    } else {
        s
    }
}

/// Unique filename component: `{timestamp_ms}_{rand6}`. The random suffix
/// keeps two uploads of the same name in the same millisecond distinct.
fn unique_suffix() -> String {
    let mut rng = rand::rng();
    let random: u32 = rng.random_range(0..0x0100_0000);
    format!("{}_{:06x}", Utc::now().timestamp_millis(), random)
}

/// File extension for a content type; photos default to jpg.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

/// File extension for a photo, from the original filename when it has one,
/// falling back to the declared file type.
pub fn extension_for(metadata: &PhotoMetadata) -> String {
    let from_name = metadata
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_alphanumeric()));

    from_name.unwrap_or_else(|| extension_for_content_type(&metadata.file_type).to_string())
}

/// Generate the logical path for an incoming photo.
///
/// `extension` is passed by the caller because recompression may change the
/// encoded format relative to the original filename.
pub fn photo_key(metadata: &PhotoMetadata, extension: &str) -> String {
    let stem = metadata
        .file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(&metadata.file_name);
    let name = sanitize_segment(stem);
    let suffix = unique_suffix();

    if metadata.is_homepage {
        format!("homepage/{}_{}.{}", suffix, name, extension)
    } else {
        let event = metadata
            .event_id
            .as_deref()
            .map(sanitize_segment)
            .unwrap_or_else(|| EVENT_FALLBACK.to_string());
        let album = sanitize_segment(&metadata.album_name);
        format!("events/{}/{}/{}_{}.{}", event, album, suffix, name, extension)
    }
}

/// Thumbnail path for a photo key: same layout under a `thumbs/` root.
pub fn thumbnail_key(photo_key: &str) -> String {
    format!("thumbs/{}", photo_key)
}
