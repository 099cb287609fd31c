//! Name sanitizing: identifiers and uploaded file names become safe, unique
//! archive member names.

use std::collections::HashSet;

/// Maximum number of characters kept from the original file stem.
const MAX_STEM_LEN: usize = 40;

/// Stem used when an uploaded file carries no usable name.
const FALLBACK_STEM: &str = "foto";

/// Extension assumed when the original file name has none.
const DEFAULT_EXT: &str = "jpg";

/// Replace every character outside `[A-Za-z0-9_-]` with `_`.
///
/// The output always has the same number of characters as the input, so
/// sanitized names keep their relative ordering.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Compose the output name for one photo:
/// `<identifier>_<stem>_<counter>.<ext>`, with the identifier segment omitted
/// when the identifier is empty. The stem is the sanitized original file stem
/// truncated to 40 characters, `foto` when the original name is missing. The
/// extension is lower-cased, `jpg` when the original has none.
pub fn unique_photo_name(original: Option<&str>, identifier: &str, counter: u32) -> String {
    let original = original.unwrap_or("").trim();
    let (raw_stem, raw_ext) = split_name(original);

    let mut stem = sanitize(raw_stem);
    if stem.is_empty() {
        stem = FALLBACK_STEM.to_string();
    }
    // Sanitized output is pure ASCII, so byte truncation is char truncation.
    stem.truncate(MAX_STEM_LEN);

    let ext = match raw_ext {
        Some(ext) => sanitize(&ext.to_ascii_lowercase()),
        None => DEFAULT_EXT.to_string(),
    };

    if identifier.is_empty() {
        format!("{stem}_{counter:03}.{ext}")
    } else {
        format!("{}_{stem}_{counter:03}.{ext}", sanitize(identifier))
    }
}

/// Make `name` unique against `used`: on collision, `(2)`, `(3)`, … goes in
/// front of the extension until a free name is found. The returned name is
/// recorded in `used`, so repeated calls with colliding inputs always yield
/// distinct outputs.
pub fn ensure_unique(name: String, used: &mut HashSet<String>) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = split_name(&name);
    let mut attempt = 2u32;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}({attempt}).{ext}"),
            None => format!("{stem}({attempt})"),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        attempt += 1;
    }
}

/// Swap the extension of `name` for `ext`, appending when there is none.
pub(crate) fn replace_extension(name: &str, ext: &str) -> String {
    let (stem, _) = split_name(name);
    format!("{stem}.{ext}")
}

/// Split into (stem, extension). Names whose only dot leads (".bashrc") or
/// trails ("name.") count as extension-less.
fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}
