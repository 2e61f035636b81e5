//! Document storage port.
//!
//! Records live in named collections as JSON objects addressed by an opaque id.
//! Services code against [`DocumentStore`]; `MemoryStore` backs local runs and
//! tests, `PgDocumentStore` keeps the same documents in a JSONB table.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{id} does not exist")]
    Missing { collection: String, id: String },

    #[error("malformed document: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Orm(#[from] sea_orm::DbErr),

    #[error("store call timed out")]
    Timeout,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Fields) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Decode into a record type; the document id is exposed as the `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut data = self.data.clone();
        data.insert("id".into(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(data))?)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Serialize a record into stored fields. The `id` key is dropped because it
/// is the document address, not part of the body.
pub fn encode<T: Serialize>(record: &T) -> StoreResult<Fields> {
    let mut data = fields(serde_json::to_value(record)?);
    data.remove("id");
    Ok(data)
}

pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn any_of<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(
            field.to_string(),
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Filter::Gt(field.to_string(), value.into())
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Filter::Gte(field.to_string(), value.into())
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Filter::Lt(field.to_string(), value.into())
    }

    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Filter::Lte(field.to_string(), value.into())
    }

    pub fn matches(&self, data: &Fields) -> bool {
        match self {
            Filter::Eq(field, expected) => data.get(field) == Some(expected),
            Filter::In(field, allowed) => data
                .get(field)
                .is_some_and(|value| allowed.iter().any(|candidate| candidate == value)),
            Filter::Gt(field, bound) => {
                compare_field(data, field, bound) == Some(Ordering::Greater)
            }
            Filter::Gte(field, bound) => matches!(
                compare_field(data, field, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Lt(field, bound) => compare_field(data, field, bound) == Some(Ordering::Less),
            Filter::Lte(field, bound) => matches!(
                compare_field(data, field, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

fn compare_field(data: &Fields, field: &str, bound: &Value) -> Option<Ordering> {
    data.get(field).and_then(|value| compare_values(value, bound))
}

/// Order two stored values. Numbers compare numerically and RFC 3339
/// timestamps chronologically; mismatched kinds are unordered.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => {
            match (
                DateTime::parse_from_rfc3339(a),
                DateTime::parse_from_rfc3339(b),
            ) {
                (Ok(a), Ok(b)) => Some(a.with_timezone(&Utc).cmp(&b.with_timezone(&Utc))),
                _ => Some(a.cmp(b)),
            }
        }
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Self {
            collection: name.to_string(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filter_opt(self, filter: Option<Filter>) -> Self {
        match filter {
            Some(filter) => self.filter(filter),
            None => self,
        }
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn matches(&self, data: &Fields) -> bool {
        self.filters.iter().all(|filter| filter.matches(data))
    }

    /// Sort in place. Documents missing the order field sort last, as
    /// unordered values would otherwise shuffle between calls.
    pub fn sort(&self, docs: &mut [Document]) {
        let Some((field, direction)) = &self.order_by else {
            return;
        };
        docs.sort_by(|a, b| {
            let ordering = match (a.field(field), b.field(field)) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        });
    }
}

/// Atomic adjustment of an integer field.
#[derive(Debug, Clone, PartialEq)]
pub struct Counter {
    pub field: String,
    pub delta: i64,
    /// Refuse the change when the result would drop below this value.
    pub floor: Option<i64>,
}

impl Counter {
    pub fn adjust(field: &str, delta: i64) -> Self {
        Self {
            field: field.to_string(),
            delta,
            floor: None,
        }
    }

    pub fn with_floor(mut self, floor: i64) -> Self {
        self.floor = Some(floor);
        self
    }

    /// Apply to a document body, returning the new value or the current one on refusal.
    pub(crate) fn apply(&self, data: &mut Fields, extra: &Fields) -> CounterOutcome {
        let current = data.get(&self.field).and_then(Value::as_i64).unwrap_or(0);
        let Some(next) = current
            .checked_add(self.delta)
            .filter(|next| self.floor.is_none_or(|floor| *next >= floor))
        else {
            return CounterOutcome::Refused(current);
        };
        data.insert(self.field.clone(), Value::from(next));
        for (key, value) in extra {
            data.insert(key.clone(), value.clone());
        }
        CounterOutcome::Applied(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOutcome {
    Applied(i64),
    Refused(i64),
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Conditional {
    Applied(Document),
    Refused(Document),
    Missing,
}

pub(crate) fn merge(data: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        data.insert(key, value);
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Create or replace the whole document.
    async fn set(&self, collection: &str, id: &str, data: Fields) -> StoreResult<()>;

    /// Merge top-level keys into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Fields) -> StoreResult<Document>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool>;

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        counter: &Counter,
        extra: Fields,
    ) -> StoreResult<CounterOutcome>;

    /// Insert only when no document holds `id`; returns whether it was written.
    async fn create_if_absent(&self, collection: &str, id: &str, data: Fields) -> StoreResult<bool>;

    /// Merge `patch` only while `field` currently holds one of `allowed`.
    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        allowed: &[Value],
        patch: Fields,
    ) -> StoreResult<Conditional>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(id: &str, value: Value) -> Document {
        Document::new(id, fields(value))
    }

    #[test]
    fn timestamps_order_chronologically_not_lexically() {
        let earlier = json!("2025-01-01T10:00:00Z");
        let later = json!("2025-01-01T10:00:00.500Z");
        assert_eq!(compare_values(&earlier, &later), Some(Ordering::Less));
    }

    #[test]
    fn filters_match_on_kind() {
        let data = fields(json!({ "status": "pending", "stock": 3 }));
        assert!(Filter::any_of("status", ["pending", "confirmed"]).matches(&data));
        assert!(Filter::gt("stock", 0).matches(&data));
        assert!(!Filter::lt("stock", 3).matches(&data));
        assert!(Filter::lte("stock", 3).matches(&data));
        assert!(!Filter::eq("missing", "x").matches(&data));
    }

    #[test]
    fn sort_desc_puts_missing_last() {
        let query = Query::collection("orders").order_by("createdAt", Direction::Desc);
        let mut docs = vec![
            doc("a", json!({ "createdAt": "2025-01-01T00:00:00Z" })),
            doc("b", json!({})),
            doc("c", json!({ "createdAt": "2025-03-01T00:00:00Z" })),
        ];
        query.sort(&mut docs);
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn counter_respects_floor() {
        let mut data = fields(json!({ "stock": 2 }));
        let outcome = Counter::adjust("stock", -3)
            .with_floor(0)
            .apply(&mut data, &Fields::new());
        assert_eq!(outcome, CounterOutcome::Refused(2));
        assert_eq!(data["stock"], json!(2));

        let outcome = Counter::adjust("stock", -2)
            .with_floor(0)
            .apply(&mut data, &fields(json!({ "updatedAt": "now" })));
        assert_eq!(outcome, CounterOutcome::Applied(0));
        assert_eq!(data["updatedAt"], json!("now"));
    }

    #[test]
    fn counter_refuses_overflow() {
        let mut data = fields(json!({ "stock": i64::MAX - 1 }));
        let outcome = Counter::adjust("stock", 5).apply(&mut data, &Fields::new());
        assert_eq!(outcome, CounterOutcome::Refused(i64::MAX - 1));
        assert_eq!(data["stock"], json!(i64::MAX - 1));
    }

    #[test]
    fn encode_drops_id_and_decode_restores_it() {
        #[derive(Debug, Serialize, serde::Deserialize, PartialEq)]
        struct Thing {
            id: String,
            name: String,
        }
        let thing = Thing {
            id: "t1".into(),
            name: "leash".into(),
        };
        let data = encode(&thing).unwrap();
        assert!(!data.contains_key("id"));
        let back: Thing = Document::new("t1", data).decode().unwrap();
        assert_eq!(back, thing);
    }
}
