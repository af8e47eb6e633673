/// Tag pairs of a game (player names, date, result, ...), kept in input order.
///
/// The tree edits treat these as opaque; only the `Black` tag is consulted,
/// by the promotion guard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    tags: Vec<(String, String)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate names keep their first value; empty values are ignored.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if value.is_empty() || self.get(&name).is_some() {
            return;
        }
        self.tags.push((name, value));
    }

    /// Case-insensitive lookup (`Black` and `black` name the same tag).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn white(&self) -> Option<&str> {
        self.get("White")
    }

    pub fn black(&self) -> Option<&str> {
        self.get("Black")
    }

    pub fn result(&self) -> Option<&str> {
        self.get("Result")
    }

    pub fn has_black_player(&self) -> bool {
        self.black().is_some_and(|black| !black.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
