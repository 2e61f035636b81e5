use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Extra, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub details: Extra,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub category: Option<String>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub details: Extra,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

/// Keys derived or stamped by the server on products.
pub const RESERVED: &[&str] = &["id", "rating", "reviews", "createdAt", "updatedAt"];
