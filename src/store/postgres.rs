use std::{future::Future, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde_json::Value;

use super::{
    Conditional, Counter, CounterOutcome, Document, DocumentStore, Fields, Filter, Query,
    StoreError, StoreResult, fields, merge,
};
use crate::entity::documents::{ActiveModel, Column, Entity as Documents, Model};

/// Documents kept in a single JSONB table keyed by (collection, id).
///
/// Equality filters are pushed down as JSONB containment; range filters and
/// ordering run on the fetched rows so both adapters share one semantics.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    conn: DatabaseConnection,
    timeout: Duration,
}

impl PgDocumentStore {
    pub fn new(conn: DatabaseConnection, timeout: Duration) -> Self {
        Self { conn, timeout }
    }

    async fn timed<T>(&self, fut: impl Future<Output = Result<T, DbErr>>) -> StoreResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

fn key(collection: &str, id: &str) -> (String, String) {
    (collection.to_string(), id.to_string())
}

fn document_from_model(model: Model) -> Document {
    Document::new(model.id, fields(model.data))
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let row = self
            .timed(Documents::find_by_id(key(collection, id)).one(&self.conn))
            .await?;
        Ok(row.map(document_from_model))
    }

    async fn set(&self, collection: &str, id: &str, data: Fields) -> StoreResult<()> {
        let now = Utc::now();
        let active = ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id.to_string()),
            data: Set(Value::Object(data)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        self.timed(
            Documents::insert(active)
                .on_conflict(
                    OnConflict::columns([Column::Collection, Column::Id])
                        .update_columns([Column::Data, Column::UpdatedAt])
                        .to_owned(),
                )
                .exec_without_returning(&self.conn),
        )
        .await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> StoreResult<Document> {
        let result = self
            .timed(
                Documents::update_many()
                    .col_expr(
                        Column::Data,
                        Expr::cust_with_values("data || $1::jsonb", [Value::Object(patch)]),
                    )
                    .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
                    .filter(Column::Collection.eq(collection))
                    .filter(Column::Id.eq(id))
                    .exec(&self.conn),
            )
            .await?;
        if result.rows_affected == 0 {
            return Err(StoreError::Missing {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        self.get(collection, id)
            .await?
            .ok_or_else(|| StoreError::Missing {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let result = self
            .timed(Documents::delete_by_id(key(collection, id)).exec(&self.conn))
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let mut finder = Documents::find().filter(Column::Collection.eq(query.collection.as_str()));
        for filter in &query.filters {
            if let Filter::Eq(field, value) = filter {
                let mut probe = Fields::new();
                probe.insert(field.clone(), value.clone());
                finder = finder.filter(Expr::cust_with_values(
                    "data @> $1::jsonb",
                    [Value::Object(probe)],
                ));
            }
        }

        let rows = self.timed(finder.all(&self.conn)).await?;
        let mut docs: Vec<Document> = rows
            .into_iter()
            .map(document_from_model)
            .filter(|doc| query.matches(&doc.data))
            .collect();
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
        self.timed(async {
            let txn = self.conn.begin().await?;
            let row = Documents::find_by_id(key(collection, id))
                .lock(LockType::Update)
                .one(&txn)
                .await?;
            let Some(row) = row else {
                return Ok(CounterOutcome::Missing);
            };

            let mut data = fields(row.data.clone());
            let outcome = counter.apply(&mut data, &extra);
            if let CounterOutcome::Applied(_) = outcome {
                let mut active: ActiveModel = row.into();
                active.data = Set(Value::Object(data));
                active.updated_at = Set(Utc::now().into());
                active.update(&txn).await?;
            }
            txn.commit().await?;
            Ok::<_, DbErr>(outcome)
        })
        .await
    }

    async fn create_if_absent(
        &self,
        collection: &str,
        id: &str,
        data: Fields,
    ) -> StoreResult<bool> {
        let now = Utc::now();
        let active = ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id.to_string()),
            data: Set(Value::Object(data)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let inserted = self
            .timed(
                Documents::insert(active)
                    .on_conflict(
                        OnConflict::columns([Column::Collection, Column::Id])
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(&self.conn),
            )
            .await?;
        Ok(inserted == 1)
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        allowed: &[Value],
        patch: Fields,
    ) -> StoreResult<Conditional> {
        self.timed(async {
            let txn = self.conn.begin().await?;
            let row = Documents::find_by_id(key(collection, id))
                .lock(LockType::Update)
                .one(&txn)
                .await?;
            let Some(row) = row else {
                return Ok(Conditional::Missing);
            };

            let mut data = fields(row.data.clone());
            let holds = data
                .get(field)
                .is_some_and(|current| allowed.contains(current));
            if !holds {
                return Ok(Conditional::Refused(Document::new(id, data)));
            }

            merge(&mut data, patch);
            let mut active: ActiveModel = row.into();
            active.data = Set(Value::Object(data.clone()));
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?;
            txn.commit().await?;
            Ok::<_, DbErr>(Conditional::Applied(Document::new(id, data)))
        })
        .await
    }
}
