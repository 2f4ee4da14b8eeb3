use crate::binding::files::FormFile;

/// Normalize a key for lookup: ASCII-lowercase with `_` and `-` removed.
///
/// `min_age`, `minAge`, `MinAge` and `min-age` all normalize to `minage`.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// An ordered multi-map of raw string values with normalized-key lookup.
///
/// When a key repeats, the first occurrence wins.
#[derive(Debug, Clone, Default)]
pub struct KeyedValues {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    normalized: String,
    key: String,
    value: String,
}

impl KeyedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = Self::new();
        for (k, v) in pairs {
            values.insert(k, v);
        }
        values
    }

    /// Parse an `application/x-www-form-urlencoded` string (query string or
    /// form body). Malformed input yields an empty set.
    pub fn parse_urlencoded(raw: &str) -> Self {
        match serde_urlencoded::from_str::<Vec<(String, String)>>(raw) {
            Ok(pairs) => Self::from_pairs(pairs),
            Err(e) => {
                tracing::debug!("ignoring malformed urlencoded input: {}", e);
                Self::new()
            }
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.entries.push(Entry {
            normalized: normalize_key(&key),
            key,
            value: value.into(),
        });
    }

    /// First value whose key matches `key` after normalization.
    pub fn get(&self, key: &str) -> Option<&str> {
        let wanted = normalize_key(key);
        self.entries
            .iter()
            .find(|e| e.normalized == wanted)
            .map(|e| e.value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(key, value)` pairs in insertion order, keys as received.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.key.as_str(), e.value.as_str()))
    }
}

/// Route and query values for one request.
#[derive(Debug, Clone, Default)]
pub struct BindingSources {
    pub route: KeyedValues,
    pub query: KeyedValues,
}

impl BindingSources {
    pub fn new(route: KeyedValues, query: KeyedValues) -> Self {
        BindingSources { route, query }
    }

    /// Build sources from matched route values and a raw query string
    /// (without the leading `?`).
    pub fn from_request_parts<'a>(
        route: impl IntoIterator<Item = (&'a str, &'a str)>,
        query: Option<&str>,
    ) -> Self {
        BindingSources {
            route: KeyedValues::from_pairs(route),
            query: query.map(KeyedValues::parse_urlencoded).unwrap_or_default(),
        }
    }

    /// Route values first, then query values.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.route.get(key).or_else(|| self.query.get(key))
    }
}

/// Text fields and files read from a form body.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pub fields: KeyedValues,
    pub files: Vec<FormFile>,
}

impl FormData {
    pub fn new(fields: KeyedValues, files: Vec<FormFile>) -> Self {
        FormData { fields, files }
    }

    pub(crate) fn files_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormFile> {
        let wanted = normalize_key(name);
        self.files
            .iter()
            .filter(move |f| normalize_key(f.name()) == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_across_casing_styles() {
        let values = KeyedValues::from_pairs([("min_age", "18")]);
        assert_eq!(values.get("minAge"), Some("18"));
        assert_eq!(values.get("MinAge"), Some("18"));
        assert_eq!(values.get("min-age"), Some("18"));
    }

    #[test]
    fn first_occurrence_wins() {
        let values = KeyedValues::parse_urlencoded("tag=a&tag=b");
        assert_eq!(values.get("tag"), Some("a"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn route_wins_over_query() {
        let sources = BindingSources::from_request_parts([("id", "5")], Some("id=9"));
        assert_eq!(sources.lookup("id"), Some("5"));
    }
}
