use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Case-insensitive, order-preserving, multi-valued header map.
///
/// Lookups are case-insensitive; the casing used at insertion time is kept
/// for serialization and display. Duplicate names accumulate rather than
/// overwrite, matching HTTP's own multi-value header semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String)>", into = "Vec<(String, String)>")]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, Vec<usize>>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = name.to_ascii_lowercase();
        let idx = self.entries.len();
        self.entries.push((name, value.into()));
        self.index.entry(key).or_default().push(idx);
    }

    /// All values stored under `name`, case-insensitive, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let key = name.to_ascii_lowercase();
        self.index
            .get(&key)
            .map(|idxs| idxs.iter().map(|&i| self.entries[i].1.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get_all(name).into_iter().next()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl From<Vec<(String, String)>> for HeaderMap {
    fn from(entries: Vec<(String, String)>) -> Self {
        let mut map = HeaderMap::default();
        for (k, v) in entries {
            map.insert(k, v);
        }
        map
    }
}

impl From<HeaderMap> for Vec<(String, String)> {
    fn from(map: HeaderMap) -> Self {
        map.entries
    }
}

/// RFC 7230 §3.2.6 `tchar` production, used to validate header names.
pub fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c))
}

impl FromIterator<(String, String)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = HeaderMap::default();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
