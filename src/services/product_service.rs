use chrono::Utc;
use serde_json::{Value, json};

use crate::{
    dto::{
        products::{
            CreateProductRequest, ProductList, RESERVED, ReviewRequest, UpdateProductRequest,
        },
        strip_reserved,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{
        Category, Product, Review, User,
        collections::{PRODUCTS, USERS},
    },
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    services::{audit, load},
    state::AppState,
    store::{Direction, Filter, Query, encode, fields, new_id},
};

pub const CATEGORIES: [Category; 4] = [
    Category {
        id: "food",
        name: "Pet Food",
    },
    Category {
        id: "toys",
        name: "Toys",
    },
    Category {
        id: "accessories",
        name: "Accessories",
    },
    Category {
        id: "medicine",
        name: "Medicine",
    },
];

/// Typed product fields that may not arrive through the free-form map.
const TYPED: &[&str] = &["name", "description", "price", "stock", "category"];

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let store_query = Query::collection(PRODUCTS)
        .filter_opt(category.map(|c| Filter::eq("category", c)))
        .filter_opt(
            query
                .in_stock
                .filter(|in_stock| *in_stock)
                .map(|_| Filter::gt("stock", 0)),
        )
        .filter_opt(query.min_price.map(|p| Filter::gte("price", p)))
        .filter_opt(query.max_price.map(|p| Filter::lte("price", p)))
        .order_by("createdAt", Direction::Desc);

    let mut products = state
        .store
        .query(&store_query)
        .await?
        .iter()
        .map(|doc| doc.decode::<Product>())
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(search) = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        let needle = search.to_lowercase();
        products.retain(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        });
    }

    let (items, meta) = query.pagination().apply(products);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub fn categories() -> ApiResponse<Vec<Category>> {
    ApiResponse::success(
        "Categories",
        CATEGORIES.to_vec(),
        Some(Meta::total(CATEGORIES.len() as i64)),
    )
}

pub async fn get_product(state: &AppState, id: &str) -> AppResult<ApiResponse<Product>> {
    let product: Product = load(state, PRODUCTS, id, "Product").await?;
    Ok(ApiResponse::success("Product", product, None))
}

fn validate_price(price: f64) -> AppResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::BadRequest("Price must be zero or more".into()));
    }
    Ok(())
}

fn validate_stock(stock: i64) -> AppResult<()> {
    if stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative".into()));
    }
    Ok(())
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Product name is required".into()));
    }
    validate_price(payload.price)?;
    validate_stock(payload.stock)?;

    let mut details = payload.details;
    strip_reserved(&mut details, RESERVED);

    let now = Utc::now();
    let product = Product {
        id: new_id(),
        name: payload.name.trim().to_string(),
        description: payload.description,
        price: payload.price,
        stock: payload.stock,
        category: payload.category,
        rating: 0.0,
        reviews: Vec::new(),
        created_at: now,
        updated_at: now,
        details,
    };
    state
        .store
        .set(PRODUCTS, &product.id, encode(&product)?)
        .await?;

    audit(
        state,
        user,
        "products.create",
        &product.id,
        json!({ "name": product.name, "stock": product.stock }),
    )
    .await;

    Ok(ApiResponse::success("Product created", product, None))
}

/// Partial update. Rating, reviews and creation time are never taken from
/// the request.
pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let _existing: Product = load(state, PRODUCTS, id, "Product").await?;

    let mut details = payload.details;
    strip_reserved(&mut details, RESERVED);
    strip_reserved(&mut details, TYPED);

    let mut patch: crate::store::Fields = details.into_iter().collect();
    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Product name is required".into()));
        }
        patch.insert("name".into(), Value::String(name.trim().to_string()));
    }
    if let Some(description) = payload.description {
        patch.insert("description".into(), Value::String(description));
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        patch.insert("price".into(), json!(price));
    }
    if let Some(stock) = payload.stock {
        validate_stock(stock)?;
        patch.insert("stock".into(), Value::from(stock));
    }
    if let Some(category) = payload.category {
        patch.insert("category".into(), Value::String(category));
    }
    patch.insert("updatedAt".into(), json!(Utc::now()));

    let updated = state
        .store
        .update(PRODUCTS, id, patch)
        .await?
        .decode::<Product>()?;

    audit(state, user, "products.update", id, json!({})).await;
    Ok(ApiResponse::success("Product updated", updated, None))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<Value>> {
    ensure_admin(user)?;
    if !state.store.delete(PRODUCTS, id).await? {
        return Err(AppError::not_found("Product"));
    }
    audit(state, user, "products.delete", id, json!({})).await;
    Ok(ApiResponse::success(
        "Product deleted",
        json!({ "id": id }),
        None,
    ))
}

/// Mean of review ratings, one decimal.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: f64 = reviews.iter().map(|r| f64::from(r.rating)).sum();
    (sum / reviews.len() as f64 * 10.0).round() / 10.0
}

pub async fn add_review(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: ReviewRequest,
) -> AppResult<ApiResponse<Product>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".into(),
        ));
    }
    let mut product: Product = load(state, PRODUCTS, id, "Product").await?;

    let user_name = match state.store.get(USERS, &user.uid).await? {
        Some(doc) => doc
            .decode::<User>()
            .ok()
            .and_then(|u| u.display_name().map(str::to_string)),
        None => None,
    }
    .unwrap_or_else(|| "Anonymous".to_string());

    product.reviews.push(Review {
        user_id: user.uid.clone(),
        user_name,
        rating: payload.rating,
        comment: payload.comment,
        created_at: Utc::now(),
    });
    product.rating = average_rating(&product.reviews);

    let patch = fields(json!({
        "reviews": product.reviews,
        "rating": product.rating,
        "updatedAt": Utc::now(),
    }));
    let updated = state
        .store
        .update(PRODUCTS, id, patch)
        .await?
        .decode::<Product>()?;

    Ok(ApiResponse::success("Review added", updated, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: u8) -> Review {
        Review {
            user_id: "u".into(),
            user_name: "Anonymous".into(),
            rating,
            comment: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rating_is_rounded_mean() {
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(average_rating(&[review(5), review(4), review(4)]), 4.3);
        assert_eq!(average_rating(&[review(1), review(2)]), 1.5);
    }
}
