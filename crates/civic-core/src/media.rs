// SPDX-FileCopyrightText: 2026 Civic Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content-type sniffing and filename derivation for downloaded photos.
//!
//! Chat platforms hand out photo bytes without a trustworthy content type, so
//! the type is inferred from the leading magic bytes.

/// Filename used when none can be derived from the download path.
pub const DEFAULT_FILENAME: &str = "photo.jpg";

/// Infers an image content type from magic bytes.
///
/// Recognizes JPEG (`FF D8`), PNG (`89 50`) and GIF (`47 49`); anything
/// else is assumed to be JPEG.
pub fn sniff_content_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, ..] => "image/jpeg",
        [0x89, 0x50, ..] => "image/png",
        [0x47, 0x49, ..] => "image/gif",
        _ => "image/jpeg",
    }
}

/// Derives a filename from the last segment of a download path or URL.
///
/// Query strings and fragments are ignored. Falls back to
/// [`DEFAULT_FILENAME`] when the path yields nothing usable.
pub fn filename_from_path(path: &str) -> String {
    let without_query = path.split(['?', '#']).next().unwrap_or_default();
    without_query
        .rsplit('/')
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
