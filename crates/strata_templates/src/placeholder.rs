//! Placeholder extraction and substitution.
//!
//! A placeholder is an identifier wrapped in single braces, e.g. `{domain}`.
//! Identifiers are ASCII alphanumerics and underscores; anything else between
//! braces is left untouched.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::{Captures, Regex};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Match {variable_name} pattern
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").unwrap())
}

/// Collect the names of every placeholder found in `text`.
pub fn extract_placeholders(text: &str) -> BTreeSet<String> {
    placeholder_pattern()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Whether `text` contains at least one placeholder.
pub fn has_placeholders(text: &str) -> bool {
    placeholder_pattern().is_match(text)
}

/// Replace every placeholder in `text` with its value from `values`.
///
/// Placeholders without an entry are kept verbatim.
pub fn substitute(text: &str, values: &HashMap<String, String>) -> String {
    placeholder_pattern()
        .replace_all(text, |caps: &Captures| {
            values
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
