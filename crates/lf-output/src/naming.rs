//! Filename helpers: extension handling, numeric suffixes and sanitizing.

use lf_core::{Error, Result};

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Split `name` into stem and extension. A leading dot is not an extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    }
}

/// Insert the ` (n)` suffix before the extension.
///
/// ```
/// use lf_output::naming::insert_suffix;
/// assert_eq!(insert_suffix("cat.png", 1), "cat (1).png");
/// assert_eq!(insert_suffix("cat", 2), "cat (2)");
/// ```
pub fn insert_suffix(name: &str, n: usize) -> String {
    match split_extension(name) {
        (stem, Some(ext)) => format!("{stem} ({n}).{ext}"),
        (stem, None) => format!("{stem} ({n})"),
    }
}

/// Replace the extension of `name` with `ext`, or append it.
pub fn with_extension(name: &str, ext: &str) -> String {
    let ext = ext.trim_start_matches('.');
    if ext.is_empty() {
        return name.to_string();
    }
    let (stem, _) = split_extension(name);
    format!("{stem}.{ext}")
}

/// Append `ext` unless `name` already ends with it (case-insensitive).
pub fn ensure_extension(name: &str, ext: &str) -> String {
    let ext = ext.trim_start_matches('.');
    match split_extension(name) {
        (_, Some(current)) if current.eq_ignore_ascii_case(ext) => name.to_string(),
        _ if ext.is_empty() => name.to_string(),
        _ => format!("{name}.{ext}"),
    }
}

/// Make `name` safe to use as a single path component.
///
/// Invalid and control characters become `_`, trailing dots and spaces are
/// dropped and reserved device names get a trailing `_`. A name with nothing
/// usable left is a validation error.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_control() || INVALID_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_end_matches(&['.', ' '][..]).to_string();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        return Err(Error::Validation(format!(
            "{name:?} does not contain any valid filename characters"
        )));
    }

    let (stem, _) = split_extension(&cleaned);
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        return Ok(format!("{stem}_{}", &cleaned[stem.len()..]));
    }

    Ok(cleaned)
}

/// Check a file extension: non-empty, no dot, no path separators.
pub fn validate_extension(ext: &str) -> Result<()> {
    if ext.is_empty() {
        return Err(Error::Validation("file extension is empty".into()));
    }
    if ext.starts_with('.') || ext.chars().any(|c| c.is_whitespace() || INVALID_CHARS.contains(&c)) {
        return Err(Error::Validation(format!("invalid file extension: {ext:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_handles_dotfiles_and_multiple_dots() {
        assert_eq!(split_extension("cat.png"), ("cat", Some("png")));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_extension(".hidden"), (".hidden", None));
        assert_eq!(split_extension("trailing."), ("trailing.", None));
        assert_eq!(split_extension("plain"), ("plain", None));
    }

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(insert_suffix("cat.png", 3), "cat (3).png");
        assert_eq!(insert_suffix("v1.2 final.jpg", 1), "v1.2 final (1).jpg");
        assert_eq!(insert_suffix("layer", 1), "layer (1)");
    }

    #[test]
    fn extension_replacement() {
        assert_eq!(with_extension("cat.xcf", "png"), "cat.png");
        assert_eq!(with_extension("cat", ".png"), "cat.png");
        assert_eq!(ensure_extension("cat.PNG", "png"), "cat.PNG");
        assert_eq!(ensure_extension("v1.2", "png"), "v1.2.png");
    }

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_filename("a/b:c?.png").unwrap(), "a_b_c_.png");
        assert_eq!(sanitize_filename("name. . ").unwrap(), "name");
        assert_eq!(sanitize_filename("con.png").unwrap(), "con_.png");
    }

    #[test]
    fn sanitize_rejects_empty_results() {
        assert!(matches!(sanitize_filename("  "), Err(Error::Validation(_))));
        assert!(sanitize_filename("///").is_err());
    }

    #[test]
    fn extension_validation() {
        assert!(validate_extension("png").is_ok());
        assert!(validate_extension("").is_err());
        assert!(validate_extension(".png").is_err());
        assert!(validate_extension("p/ng").is_err());
    }
}
