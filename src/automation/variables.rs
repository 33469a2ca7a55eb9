//! Name-keyed string table used for `{{name}}` substitution

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("valid placeholder pattern"));

/// Variables available to steps of one invocation.
///
/// The engine clones the caller's table at the start of every pass, so
/// values captured during a pass never leak back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableCollection {
    values: BTreeMap<String, String>,
}

impl VariableCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a variable
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every `{{name}}` in `text` with the variable's value.
    ///
    /// Whitespace around the name is ignored. Placeholders naming an
    /// unknown variable are left as written.
    pub fn substitute(&self, text: &str) -> String {
        if !text.contains("{{") {
            return text.to_string();
        }

        PLACEHOLDER
            .replace_all(text, |caps: &Captures| {
                let name = caps[1].trim();
                match self.values.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

impl<K, V> FromIterator<(K, V)> for VariableCollection
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Parse a `name=value` pair as given on the command line
pub fn parse_assignment(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}
