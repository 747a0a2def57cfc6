//! Temporary storage for images awaiting recognition
//!
//! The OCR engines read their input from a file path, so every request
//! materializes its image into a request-scoped file that is removed when the
//! request finishes.

mod temp;

pub use temp::{TempFile, TempStorage};

/// Image extensions accepted by the upload endpoints
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// Fallback when sanitizing leaves nothing usable
const FALLBACK_FILENAME: &str = "image";

/// Lowercased extension after the last `.`, if it is an allowed image type
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Reduce a client-supplied filename to a safe basename
///
/// Non-ASCII characters are dropped, path separators split the name into
/// words, words are joined with `_`, anything outside `[A-Za-z0-9_.-]` is
/// removed and leading/trailing dots and underscores are stripped.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}
