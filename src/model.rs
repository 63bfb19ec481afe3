//! Job records.
//!
//! A job record is one row of a queue table at the moment it was claimed.
//! The worker never interprets the schema: columns are kept in table order
//! and every value is carried as text, with SQL NULL as `None`.

use serde::{Deserialize, Serialize};

/// One claimed row of a queue table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl JobRecord {
    /// Build a record from parallel column and value lists.
    ///
    /// Extra values beyond the column list are dropped; missing values
    /// are NULL.
    pub fn new(columns: Vec<String>, mut values: Vec<Option<String>>) -> Self {
        values.resize(columns.len(), None);
        Self { columns, values }
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.map(Into::into)))
            .unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Value at position `index`. Outer `None` means no such column.
    pub fn value(&self, index: usize) -> Option<Option<&str>> {
        self.values.get(index).map(Option::as_deref)
    }

    /// Value of the first column named `name`. NULL and missing both yield `None`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
            .and_then(|v| v.as_deref())
    }

    /// Iterate `(column, value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Option::as_deref))
    }

    /// The record as a JSON object keyed by column name.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .iter()
            .map(|(k, v)| {
                let v = v.map_or(serde_json::Value::Null, |s| s.into());
                (k.to_string(), v)
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

impl std::fmt::Display for JobRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (column, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Some(v) => write!(f, "{column}={v:?}")?,
                None => write!(f, "{column}=NULL")?,
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_json_keep_column_order_and_nulls() {
        let job = JobRecord::from_pairs([("id", Some("1")), ("note", None)]);
        assert_eq!(job.to_string(), r#"{id="1", note=NULL}"#);
        assert_eq!(job.to_json(), serde_json::json!({"id": "1", "note": null}));
    }

    #[test]
    fn new_pads_missing_values_with_null() {
        let job = JobRecord::new(vec!["a".into(), "b".into()], vec![Some("x".into())]);
        assert_eq!(job.value(1), Some(None));
        assert_eq!(job.value(2), None);
        assert_eq!(job.get("a"), Some("x"));
    }
}
