//! String helpers

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::UtilError;

fn filename_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(~|\.\.|/|\\)").expect("static regex"))
}

fn path_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(~|\.(\.)+)").expect("static regex"))
}

/// Err if `filename` contains `~`, `..`, `/` or `\`
pub fn raise_if_invalid_filename(filename: &str) -> Result<(), UtilError> {
    if filename_pattern().is_match(filename) {
        return Err(UtilError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

/// Err if `path` contains `~` or `..`
pub fn raise_if_invalid_path(path: &str) -> Result<(), UtilError> {
    if path_pattern().is_match(path) {
        return Err(UtilError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// `filename` if it is safe, otherwise the empty string
pub fn sanitize_filename(filename: &str) -> String {
    match raise_if_invalid_filename(filename) {
        Ok(()) => filename.to_string(),
        Err(_) => String::new(),
    }
}

/// `path` if it is safe, otherwise the empty string
pub fn sanitize_path(path: &str) -> String {
    match raise_if_invalid_path(path) {
        Ok(()) => path.to_string(),
        Err(_) => String::new(),
    }
}

/// Lowercase ASCII slug with `_` separators
///
/// Non-ASCII text is transliterated first. Input that has no
/// alphanumerics at all becomes `unknown`; empty input stays empty.
pub fn slugify(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let slug = slug::slugify(text).replace('-', "_");
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

/// `preferred`, or the first of `preferred_2`, `preferred_3`, ... not in `current`
pub fn ensure_unique_string<I, S>(preferred: &str, current: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let taken: HashSet<String> = current
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect();

    let mut candidate = preferred.to_string();
    let mut tries = 1;
    while taken.contains(&candidate) {
        tries += 1;
        candidate = format!("{preferred}_{tries}");
    }
    candidate
}

/// Random string of ASCII letters and digits from the OS random source
pub fn get_random_string(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
