//! Types for document store access

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::Error;

/// A JSON object: the body of one stored document
pub type Fields = Map<String, Value>;

/// A record collection in the document store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    /// All podcasts
    Podcasts,

    /// All comments, across podcasts
    Comments,

    /// User profiles, keyed by uid
    Users,

    /// The favorites subcollection of one user
    Favorites { user_id: String },
}

impl Collection {
    /// The favorites subcollection of `user_id`
    pub fn favorites(user_id: &str) -> Self {
        Collection::Favorites {
            user_id: user_id.to_string(),
        }
    }

    /// The table backing this collection
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Podcasts => "podcasts",
            Collection::Comments => "comments",
            Collection::Users => "users",
            Collection::Favorites { .. } => "favorites",
        }
    }

    /// The scoping column and value for subcollections
    pub fn scope(&self) -> Option<(&'static str, &str)> {
        match self {
            Collection::Favorites { user_id } => Some(("userId", user_id.as_str())),
            _ => None,
        }
    }

    /// Slash-separated path, e.g. `users/<uid>/favorites`
    pub fn path(&self) -> String {
        match self {
            Collection::Favorites { user_id } => format!("users/{}/favorites", user_id),
            other => other.table().to_string(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// Convert the direction to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

/// Equality filter on one field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// Ordering on one field
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }
}

/// A collection query: equality filters, one ordering, a limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    /// Create a query matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter documents where `field` equals `value`
    pub fn eq<T: Into<Value>>(mut self, field: &str, value: T) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    /// Order the results
    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// Limit the number of results
    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    /// Whether a document satisfies every filter
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|f| fields.get(&f.field) == Some(&f.value))
    }
}

/// A stored document: its identifier and fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: &str, fields: Fields) -> Self {
        Self {
            id: id.to_string(),
            fields,
        }
    }

    /// Decode into a typed record; the document id lands in the `id` field
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Serialize a record into document fields, dropping any `id` field
pub fn to_fields<T: serde::Serialize>(record: &T) -> Result<Fields, Error> {
    match serde_json::to_value(record)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(Error::database(format!("expected a JSON object, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn favorites_path_is_nested_under_user() {
        let c = Collection::favorites("u1");
        assert_eq!(c.path(), "users/u1/favorites");
        assert_eq!(c.table(), "favorites");
        assert_eq!(c.scope(), Some(("userId", "u1")));
        assert_eq!(Collection::Podcasts.scope(), None);
    }

    #[test]
    fn query_matches_all_filters() {
        let q = Query::new().eq("podcastId", "p1").eq("rating", 5);
        let hit = json!({ "podcastId": "p1", "rating": 5 });
        let miss = json!({ "podcastId": "p1", "rating": 4 });
        assert!(q.matches(hit.as_object().unwrap()));
        assert!(!q.matches(miss.as_object().unwrap()));
    }

    #[test]
    fn decode_injects_id() {
        #[derive(serde::Deserialize)]
        struct Row {
            id: String,
            title: String,
        }
        let doc = Document::new("abc", json!({ "title": "T" }).as_object().unwrap().clone());
        let row: Row = doc.decode().unwrap();
        assert_eq!(row.id, "abc");
        assert_eq!(row.title, "T");
    }
}
