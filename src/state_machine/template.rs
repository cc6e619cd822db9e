//! `{field}` token interpolation for bot copy and link templates

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn token_re() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("valid token regex"))
}

/// Substitute `{field}` tokens from collected data. Unresolved tokens
/// render as empty string rather than staying literal.
pub fn interpolate(text: &str, data: &BTreeMap<String, String>) -> String {
    token_re()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            data.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}
