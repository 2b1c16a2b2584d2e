//! Variable token discovery.
//!
//! A token is `{{identifier}}` with optional inner whitespace. Handlebars
//! block helpers (`{{#if}}`, `{{/if}}`) and other expressions that are not
//! plain identifiers are ignored.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::schema::Template;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").expect("valid token pattern")
});

/// Identifiers referenced in `text`, in order of appearance (duplicates kept)
pub fn extract_variables(text: &str) -> impl Iterator<Item = &str> {
    TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Distinct identifiers across every step of the template, sorted
pub fn collect_variables(template: &Template) -> BTreeSet<String> {
    template
        .steps
        .iter()
        .flat_map(|step| step.content.text_fields())
        .flat_map(extract_variables)
        .map(str::to_string)
        .collect()
}
