//! Filename sanitization for scratch and download paths.

/// Longest name kept after sanitization, in bytes.
pub const MAX_NAME_LEN: usize = 100;

/// Fallback used when nothing usable is left of a name.
const FALLBACK_NAME: &str = "file";

/// Reduces an uploaded filename to a single safe path component.
///
/// Directory components are dropped, NUL and control characters removed,
/// anything outside `[A-Za-z0-9._-]` becomes `_`, runs of dots collapse and
/// leading dots are stripped. The result is never empty.
pub fn sanitize_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }

    let cleaned = cleaned.trim_start_matches('.');
    let cleaned = truncate_keeping_extension(cleaned);

    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

/// Splits a sanitized name into stem and extension.
pub fn split_stem(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(idx) => (&name[..idx], Some(&name[idx + 1..])),
    }
}

// Input is ASCII at this point, so byte slicing is safe.
fn truncate_keeping_extension(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }

    match split_stem(name) {
        (stem, Some(ext)) if ext.len() < 16 => {
            let keep = MAX_NAME_LEN - ext.len() - 1;
            format!("{}.{}", &stem[..keep.min(stem.len())], ext)
        }
        _ => name[..MAX_NAME_LEN].to_string(),
    }
}
