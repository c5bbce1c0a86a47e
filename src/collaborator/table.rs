use std::collections::HashMap;

/// One record of collaborator output, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }

    /// Trimmed value of `name`; empty or missing fields are `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Flat tabular result: one header and any number of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
