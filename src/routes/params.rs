use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::response::Meta;

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }

    /// Slice an already filtered and ordered result set. Without `page` and
    /// `per_page` everything is returned.
    pub fn apply<T>(&self, items: Vec<T>) -> (Vec<T>, Meta) {
        let total = items.len() as i64;
        if self.page.is_none() && self.per_page.is_none() {
            return (items, Meta::total(total));
        }
        let (page, per_page, offset) = self.normalize();
        let items = items
            .into_iter()
            .skip(offset as usize)
            .take(per_page as usize)
            .collect();
        (items, Meta::new(page, per_page, total))
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: Option<String>,
    pub service_type: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleListQuery {
    pub status: Option<String>,
    pub date: Option<String>,
    pub service_type: Option<String>,
    #[serde(rename = "page")]
    pub page: Option<i64>,
    #[serde(rename = "per_page")]
    pub per_page: Option<i64>,
}

impl ScheduleListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    /// Filters on `orderStatus`.
    pub status: Option<String>,
    pub payment_status: Option<String>,
    #[serde(rename = "page")]
    pub page: Option<i64>,
    #[serde(rename = "per_page")]
    pub per_page: Option<i64>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<String>,
    pub in_stock: Option<bool>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search: Option<String>,
    #[serde(rename = "page")]
    pub page: Option<i64>,
    #[serde(rename = "per_page")]
    pub per_page: Option<i64>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_without_paging_returns_everything() {
        let (items, meta) = Pagination::default().apply(vec![1, 2, 3]);
        assert_eq!(items, [1, 2, 3]);
        assert_eq!(meta.total, Some(3));
        assert_eq!(meta.page, None);
    }

    #[test]
    fn apply_slices_requested_page() {
        let pagination = Pagination {
            page: Some(2),
            per_page: Some(2),
        };
        let (items, meta) = pagination.apply(vec![1, 2, 3, 4, 5]);
        assert_eq!(items, [3, 4]);
        assert_eq!(meta.page, Some(2));
        assert_eq!(meta.total, Some(5));
    }
}
