use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Team id assigned to a row that has no fields at all.
pub const UNKNOWN_TEAM: &str = "UNKNOWN";

const TEAM_KEYS: [&str; 3] = ["Team", "TEAM", "team"];

/// One scraped table row: column label -> cell text, in column order.
///
/// The column set comes from the page, so this stays an open map rather than
/// a struct. Inserting an existing label replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendRow {
    fields: Vec<(String, String)>,
}

impl TrendRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn first_value(&self) -> Option<&str> {
        self.fields.first().map(|(_, v)| v.as_str())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl<K, V> FromIterator<(K, V)> for TrendRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = TrendRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for TrendRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TrendRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = TrendRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column label to cell text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TrendRow, A::Error> {
                let mut row = TrendRow::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    row.insert(k, v);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Picks the team id for a row: a `Team` column (any of the usual casings),
/// else the first column's value, else [`UNKNOWN_TEAM`].
pub fn resolve_team(row: &TrendRow) -> String {
    for key in TEAM_KEYS {
        if let Some(value) = row.get(key)
            && !value.is_empty()
        {
            return value.trim().to_string();
        }
    }
    match row.first_value() {
        Some(value) => value.trim().to_string(),
        None => UNKNOWN_TEAM.to_string(),
    }
}

/// SHA-256 over the compact JSON of the row with keys sorted, as lowercase hex.
/// Only the payload feeds the hash; column order does not matter.
pub fn fingerprint(row: &TrendRow) -> String {
    let sorted: BTreeMap<&str, &str> = row.iter().collect();
    // A map of strings always serializes.
    let canonical = serde_json::to_string(&sorted).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A row ready for the store: resolved team, content hash, original payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub team: String,
    pub row_hash: String,
    pub payload: TrendRow,
}

impl NormalizedRow {
    pub fn from_row(payload: TrendRow) -> Self {
        Self {
            team: resolve_team(&payload),
            row_hash: fingerprint(&payload),
            payload,
        }
    }
}

pub fn normalize_rows(rows: Vec<TrendRow>) -> Vec<NormalizedRow> {
    rows.into_iter().map(NormalizedRow::from_row).collect()
}
