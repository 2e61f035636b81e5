//! Product stock bookkeeping for orders.
//!
//! Every non-cancelled order holds its item quantities out of `Product.stock`.
//! In best-effort mode the reconciler reads a product and writes the adjusted
//! value back, which lets concurrent orders oversell. In strict mode each
//! adjustment is a single atomic counter operation floored at zero.

use chrono::Utc;
use serde_json::{Value, json};

use crate::{
    config::ConsistencyMode,
    error::{AppError, AppResult},
    models::{OrderItem, Product, collections::PRODUCTS},
    store::{Counter, CounterOutcome, DocumentStore, fields},
};

/// Total quantity one order needs from one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demand {
    pub product_id: String,
    pub quantity: i64,
}

/// Sum quantities per product, keeping first-seen order. A total that does
/// not fit in an `i64` is rejected.
pub fn aggregate<I, S>(lines: I) -> AppResult<Vec<Demand>>
where
    I: IntoIterator<Item = (S, i64)>,
    S: Into<String>,
{
    let mut demand: Vec<Demand> = Vec::new();
    for (product_id, quantity) in lines {
        let product_id = product_id.into();
        match demand.iter_mut().find(|d| d.product_id == product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| too_large(&product_id))?;
            }
            None => demand.push(Demand {
                product_id,
                quantity,
            }),
        }
    }
    Ok(demand)
}

pub fn demand_of(items: &[OrderItem]) -> AppResult<Vec<Demand>> {
    aggregate(items.iter().map(|i| (i.product_id.clone(), i.quantity)))
}

pub struct StockReconciler<'a> {
    store: &'a dyn DocumentStore,
    mode: ConsistencyMode,
}

impl<'a> StockReconciler<'a> {
    pub fn new(store: &'a dyn DocumentStore, mode: ConsistencyMode) -> Self {
        Self { store, mode }
    }

    async fn load(&self, product_id: &str) -> AppResult<Option<Product>> {
        match self.store.get(PRODUCTS, product_id).await? {
            Some(doc) => Ok(Some(doc.decode::<Product>()?)),
            None => Ok(None),
        }
    }

    /// Verify every product exists and covers its demand. Nothing is written;
    /// the products come back in demand order for pricing.
    pub async fn check(&self, demand: &[Demand]) -> AppResult<Vec<Product>> {
        let mut products = Vec::with_capacity(demand.len());
        for line in demand {
            let product = self
                .load(&line.product_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Product {}", line.product_id)))?;
            if product.stock < line.quantity {
                return Err(insufficient(&product.name, product.stock));
            }
            products.push(product);
        }
        Ok(products)
    }

    /// Take the demanded quantities out of stock.
    ///
    /// Strict mode refuses (and undoes earlier lines) when any product would go
    /// negative. Best-effort mode writes `stock - quantity` from a fresh read
    /// and relies on a prior [`check`](Self::check).
    pub async fn reserve(&self, demand: &[Demand]) -> AppResult<()> {
        match self.mode {
            ConsistencyMode::BestEffort => {
                for line in demand {
                    self.write_adjusted(line, -line.quantity).await?;
                }
                Ok(())
            }
            ConsistencyMode::Strict => {
                for (done, line) in demand.iter().enumerate() {
                    let counter = Counter::adjust("stock", -line.quantity).with_floor(0);
                    let outcome = self
                        .store
                        .increment(PRODUCTS, &line.product_id, &counter, stamp())
                        .await;
                    let failure = match outcome {
                        Ok(CounterOutcome::Applied(_)) => continue,
                        Ok(CounterOutcome::Refused(available)) => {
                            let name = self
                                .load(&line.product_id)
                                .await
                                .ok()
                                .flatten()
                                .map(|p| p.name)
                                .unwrap_or_else(|| line.product_id.clone());
                            insufficient(&name, available)
                        }
                        Ok(CounterOutcome::Missing) => {
                            AppError::not_found(format!("Product {}", line.product_id))
                        }
                        Err(err) => err.into(),
                    };
                    self.release(&demand[..done]).await?;
                    return Err(failure);
                }
                Ok(())
            }
        }
    }

    /// Put quantities back. Products that no longer exist are skipped.
    pub async fn release(&self, demand: &[Demand]) -> AppResult<()> {
        for line in demand {
            match self.mode {
                ConsistencyMode::BestEffort => self.write_adjusted(line, line.quantity).await?,
                ConsistencyMode::Strict => {
                    let counter = Counter::adjust("stock", line.quantity);
                    match self
                        .store
                        .increment(PRODUCTS, &line.product_id, &counter, stamp())
                        .await?
                    {
                        CounterOutcome::Applied(_) => {}
                        CounterOutcome::Missing => {
                            tracing::debug!(product_id = %line.product_id, "restock skipped, product gone");
                        }
                        CounterOutcome::Refused(current) => {
                            tracing::warn!(product_id = %line.product_id, current, "restock would overflow");
                            return Err(too_large(&line.product_id));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn write_adjusted(&self, line: &Demand, delta: i64) -> AppResult<()> {
        let Some(product) = self.load(&line.product_id).await? else {
            tracing::debug!(product_id = %line.product_id, "stock write skipped, product gone");
            return Ok(());
        };
        let next = product
            .stock
            .checked_add(delta)
            .ok_or_else(|| too_large(&product.name))?;
        let mut patch = stamp();
        patch.insert("stock".into(), Value::from(next));
        self.store.update(PRODUCTS, &line.product_id, patch).await?;
        Ok(())
    }
}

fn stamp() -> crate::store::Fields {
    fields(json!({ "updatedAt": Utc::now() }))
}

fn insufficient(name: &str, available: i64) -> AppError {
    AppError::Conflict(format!("Insufficient stock for {name}. Available: {available}"))
}

fn too_large(name: &str) -> AppError {
    AppError::BadRequest(format!("Quantity for {name} is too large"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_merges_repeated_products_in_first_seen_order() {
        let demand = aggregate([("b", 1), ("a", 2), ("b", 3)]).unwrap();
        assert_eq!(
            demand,
            vec![
                Demand {
                    product_id: "b".into(),
                    quantity: 4
                },
                Demand {
                    product_id: "a".into(),
                    quantity: 2
                },
            ]
        );
    }

    #[test]
    fn demand_reads_order_items() {
        let items = vec![
            OrderItem {
                product_id: "p1".into(),
                quantity: 2,
                price: 10.0,
                name: "Ball".into(),
            },
            OrderItem {
                product_id: "p1".into(),
                quantity: 1,
                price: 10.0,
                name: "Ball".into(),
            },
        ];
        assert_eq!(demand_of(&items).unwrap()[0].quantity, 3);
    }

    #[test]
    fn aggregate_rejects_quantity_overflow() {
        let half = i64::MAX / 2 + 1;
        let err = aggregate([("p1", half), ("p1", half)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Quantity for p1 is too large"));
    }
}
