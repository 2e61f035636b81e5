use std::{env, time::Duration};

use anyhow::Context;
use chrono::Utc;
use petcare_api::{
    db::{create_orm_conn, run_migrations},
    models::{Product, collections::PRODUCTS},
    store::{DocumentStore, PgDocumentStore, encode},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let timeout = Duration::from_secs(10);

    let orm = create_orm_conn(&database_url, timeout).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;
    let store = PgDocumentStore::new(orm, timeout);

    let inserted = seed_products(&store).await?;
    println!("Seed completed. {inserted} new products");
    Ok(())
}

async fn seed_products(store: &PgDocumentStore) -> anyhow::Result<usize> {
    let products = vec![
        (
            "seed-kibble-adult",
            "Adult Dog Kibble 10kg",
            "Complete dry food for adult dogs",
            2499.0,
            40,
            "food",
        ),
        (
            "seed-cat-wet-pack",
            "Cat Wet Food (12 pack)",
            "Chicken and tuna pouches",
            899.0,
            60,
            "food",
        ),
        ("seed-rope-toy", "Cotton Rope Tug Toy", "Chew-safe knotted rope", 349.0, 120, "toys"),
        ("seed-feather-wand", "Feather Teaser Wand", "Interactive toy for cats", 199.0, 80, "toys"),
        (
            "seed-leash",
            "Reflective Leash 1.5m",
            "Padded handle, night visibility",
            599.0,
            75,
            "accessories",
        ),
        (
            "seed-tick-drops",
            "Tick & Flea Drops",
            "Monthly spot-on treatment",
            749.0,
            50,
            "medicine",
        ),
    ];

    let mut inserted = 0;
    for (id, name, description, price, stock, category) in products {
        let now = Utc::now();
        let product = Product {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            stock,
            category: category.to_string(),
            rating: 0.0,
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
            details: Default::default(),
        };
        if store
            .create_if_absent(PRODUCTS, &product.id, encode(&product)?)
            .await?
        {
            inserted += 1;
            println!("Seeded {name}");
        }
    }
    Ok(inserted)
}
