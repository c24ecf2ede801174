use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Ordered key/value pairs of a tracker query. Values are not URL-escaped;
/// that is left to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    items: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, key: &str, value: impl Into<String>) {
        self.items.push((key.to_string(), value.into()));
    }

    pub fn items(&self) -> &[(String, String)] {
        &self.items
    }

    /// All values for `key`, in insertion order.
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.items
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Query {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// A tracker request expressed as query parameters.
pub trait QueryCommand {
    fn to_query(&self) -> Query;
}

/// Filters for searching existing bugs. Unset fields put no constraint on the search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugSearch {
    pub products: Vec<String>,
    pub severity: Option<String>,
    /// Only bugs created at or after this time.
    pub creation_time: Option<DateTime<Utc>>,
    pub id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Substring of any comment.
    pub longdesc: Option<String>,
    pub order: Vec<String>,
}

impl BugSearch {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueryCommand for BugSearch {
    fn to_query(&self) -> Query {
        let mut query = Query::new();

        for product in &self.products {
            query.add_item("product", product.as_str());
        }
        if let Some(severity) = non_empty(&self.severity) {
            query.add_item("severity", severity);
        }
        if let Some(creation_time) = &self.creation_time {
            query.add_item(
                "creation_time",
                creation_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }
        // Negative numbers are the tracker's "unset" and never sent
        for (key, value) in [("id", self.id), ("limit", self.limit), ("offset", self.offset)] {
            if let Some(value) = value.filter(|v| *v >= 0) {
                query.add_item(key, value.to_string());
            }
        }
        if let Some(longdesc) = non_empty(&self.longdesc) {
            query.add_item("longdesc", longdesc);
        }
        for order in &self.order {
            query.add_item("order", order.as_str());
        }

        query
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
