//! `{{field}}` placeholder substitution

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Replace every `{{name}}` in `template` with `fields[name]`.
///
/// Placeholders with no matching field are left untouched. The returned flag
/// is `false` if at least one placeholder could not be resolved.
pub fn substitute_labels(template: &str, fields: &BTreeMap<String, String>) -> (String, bool) {
    let mut found_all = true;
    let result = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| match fields.get(&caps[1]) {
        Some(value) => value.clone(),
        None => {
            found_all = false;
            caps[0].to_string()
        }
    });
    (result.into_owned(), found_all)
}
