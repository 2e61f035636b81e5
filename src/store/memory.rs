use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    Conditional, Counter, CounterOutcome, Document, DocumentStore, Fields, Query, StoreError,
    StoreResult, merge,
};

/// In-process store. Every call holds the collection lock for its whole
/// duration, so the conditional primitives are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Fields>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document::new(id, data.clone())))
    }

    async fn set(&self, collection: &str, id: &str, data: Fields) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> StoreResult<Document> {
        let mut collections = self.collections.write().await;
        let data = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::Missing {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        merge(data, patch);
        Ok(Document::new(id, data.clone()))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| query.matches(data))
                    .map(|(id, data)| Document::new(id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default();
        query.sort(&mut docs);
        Ok(docs)
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        counter: &Counter,
        extra: Fields,
    ) -> StoreResult<CounterOutcome> {
        let mut collections = self.collections.write().await;
        let Some(data) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Ok(CounterOutcome::Missing);
        };
        Ok(counter.apply(data, &extra))
    }

    async fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
    ) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Ok(false);
        }
        docs.insert(id.to_string(), data);
        Ok(true)
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        allowed: &[Value],
        patch: Fields,
    ) -> StoreResult<Conditional> {
        let mut collections = self.collections.write().await;
        let Some(data) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Ok(Conditional::Missing);
        };
        let holds = data
            .get(field)
            .is_some_and(|current| allowed.contains(current));
        if !holds {
            return Ok(Conditional::Refused(Document::new(id, data.clone())));
        }
        merge(data, patch);
        Ok(Conditional::Applied(Document::new(id, data.clone())))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::{Direction, Filter, fields};

    #[tokio::test]
    async fn query_filters_and_orders() {
        let store = MemoryStore::new();
        for (id, status, created) in [
            ("a", "pending", "2025-01-01T00:00:00Z"),
            ("b", "cancelled", "2025-01-02T00:00:00Z"),
            ("c", "confirmed", "2025-01-03T00:00:00Z"),
        ] {
            store
                .set(
                    "appointments",
                    id,
                    fields(json!({ "status": status, "createdAt": created })),
                )
                .await
                .unwrap();
        }

        let query = Query::collection("appointments")
            .filter(Filter::any_of("status", ["pending", "confirmed"]))
            .order_by("createdAt", Direction::Desc);
        let ids: Vec<_> = store
            .query(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, ["c", "a"]);
    }

    #[tokio::test]
    async fn update_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .update("orders", "nope", fields(json!({ "x": 1 })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }

    #[tokio::test]
    async fn create_if_absent_only_writes_once() {
        let store = MemoryStore::new();
        assert!(store.create_if_absent("claims", "k", Fields::new()).await.unwrap());
        assert!(!store.create_if_absent("claims", "k", Fields::new()).await.unwrap());
    }

    #[tokio::test]
    async fn update_if_refuses_when_field_moved_on() {
        let store = MemoryStore::new();
        store
            .set("orders", "o1", fields(json!({ "orderStatus": "shipped" })))
            .await
            .unwrap();
        let outcome = store
            .update_if(
                "orders",
                "o1",
                "orderStatus",
                &[json!("pending"), json!("confirmed")],
                fields(json!({ "orderStatus": "cancelled" })),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, Conditional::Refused(doc) if doc.data["orderStatus"] == "shipped"));
    }
}
