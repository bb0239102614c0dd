use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Per-session variable bag. Keys and values are plain strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variables {
    data: HashMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(data: HashMap<String, String>) -> Self {
        Self { data }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }

    /// Replace the whole bag, e.g. with the result of a variable patch.
    pub fn replace(&mut self, data: HashMap<String, String>) {
        self.data = data;
    }

    pub fn data(&self) -> &HashMap<String, String> {
        &self.data
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.data
    }

    /// Substitute `{name}` placeholders with the current values.
    pub fn interpolate(&self, text: &str) -> String {
        interpolate(text, &self.data)
    }
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"))
}

/// Substitute `{name}` placeholders from `vars`.
///
/// Unknown names are left verbatim, so `interpolate(t, {}) == t`.
pub fn interpolate(text: &str, vars: &HashMap<String, String>) -> String {
    placeholder()
        .replace_all(text, |caps: &Captures| match vars.get(&caps[1]) {
            Some(v) => v.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}
