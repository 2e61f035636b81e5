mod common;

use chrono::Utc;
use common::{JWT_SECRET, TestApp};
use petcare_api::{
    config::ConsistencyMode,
    dto::{
        auth::{AddPetRequest, UpdateProfileRequest, VerifyOtpRequest},
        products::{CreateProductRequest, ReviewRequest, UpdateProductRequest},
    },
    error::AppError,
    middleware::auth::{Claims, JwtAuthorizer},
    models::Role,
    routes::params::ProductQuery,
    services::{auth_service, product_service},
};
use serde_json::json;

fn identity_token(uid: &str, phone: &str) -> String {
    JwtAuthorizer::new(JWT_SECRET)
        .sign(&Claims {
            sub: uid.into(),
            phone_number: Some(phone.into()),
            admin: false,
            exp: (Utc::now().timestamp() + 600) as usize,
        })
        .expect("sign identity")
}

#[tokio::test]
async fn first_verification_registers_the_user() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);

    let session = auth_service::verify_otp(
        &app.state,
        VerifyOtpRequest {
            id_token: identity_token("phone-user", "+919999999999"),
            phone_number: None,
        },
    )
    .await?
    .data
    .expect("session");
    assert_eq!(session.user.uid, "phone-user");
    assert_eq!(session.user.role, Role::User);
    assert_eq!(session.user.phone_number.as_deref(), Some("+919999999999"));

    // The issued session token authenticates the same caller.
    let caller = app.state.authorizer.verify(&session.token).await?;
    assert_eq!(caller.uid, "phone-user");
    assert!(!caller.admin);

    let again = auth_service::verify_otp(
        &app.state,
        VerifyOtpRequest {
            id_token: identity_token("phone-user", "+919999999999"),
            phone_number: None,
        },
    )
    .await?
    .data
    .expect("session");
    assert!(again.user.last_login.is_some());
    assert_eq!(again.user.created_at, session.user.created_at);
    Ok(())
}

#[tokio::test]
async fn bad_identity_tokens_are_rejected() {
    let app = TestApp::new(ConsistencyMode::BestEffort);

    let err = auth_service::verify_otp(
        &app.state,
        VerifyOtpRequest {
            id_token: "  ".into(),
            phone_number: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = auth_service::verify_otp(
        &app.state,
        VerifyOtpRequest {
            id_token: "not-a-token".into(),
            phone_number: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn profile_updates_and_pets() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let user = app.user("u1", "", "+910000000001").await;

    let updated = auth_service::update_profile(
        &app.state,
        &user,
        UpdateProfileRequest {
            name: Some(" Asha ".into()),
            email: Some("asha@example.com".into()),
            address: None,
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(updated.profile.name, "Asha");
    assert_eq!(updated.email(), Some("asha@example.com"));

    let mut details = petcare_api::models::Extra::new();
    details.insert("name".into(), json!("Bruno"));
    details.insert("species".into(), json!("dog"));
    details.insert("id".into(), json!("forged"));
    let pet = auth_service::add_pet(&app.state, &user, AddPetRequest { details })
        .await?
        .data
        .expect("pet");
    assert!(pet.id.starts_with("pet_"));
    assert_eq!(pet.details.get("name"), Some(&json!("Bruno")));

    let profile = auth_service::get_profile(&app.state, &user)
        .await?
        .data
        .expect("user");
    assert_eq!(profile.profile.pets.len(), 1);
    assert_eq!(profile.profile.pets[0].id, pet.id);
    Ok(())
}

fn new_product(name: &str, price: f64, stock: i64, category: &str) -> CreateProductRequest {
    CreateProductRequest {
        name: name.into(),
        description: format!("{name} description"),
        price,
        stock,
        category: category.into(),
        details: Default::default(),
    }
}

#[tokio::test]
async fn catalog_management_is_admin_only() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let user = app.user("u1", "", "").await;
    let admin = app.admin();

    let err = product_service::create_product(
        &app.state,
        &user,
        new_product("Kibble", 10.0, 1, "food"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = product_service::create_product(
        &app.state,
        &admin,
        new_product("Kibble", 10.0, -1, "food"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let product = product_service::create_product(
        &app.state,
        &admin,
        new_product("Kibble", 10.0, 3, "food"),
    )
    .await?
    .data
    .expect("product");

    let mut update = UpdateProductRequest {
        stock: Some(8),
        ..Default::default()
    };
    update.details.insert("rating".into(), json!(5.0));
    let updated = product_service::update_product(&app.state, &admin, &product.id, update)
        .await?
        .data
        .expect("product");
    assert_eq!(updated.stock, 8);
    assert_eq!(updated.rating, 0.0);

    product_service::delete_product(&app.state, &admin, &product.id).await?;
    let err = product_service::get_product(&app.state, &product.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn listing_filters_and_searches() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let admin = app.admin();
    for (name, price, stock, category) in [
        ("Chicken Kibble", 900.0, 5, "food"),
        ("Salmon Treats", 300.0, 0, "food"),
        ("Rope Toy", 250.0, 12, "toys"),
    ] {
        product_service::create_product(
            &app.state,
            &admin,
            new_product(name, price, stock, category),
        )
        .await?;
    }

    let list = |query: ProductQuery| {
        let state = app.state.clone();
        async move {
            product_service::list_products(&state, query)
                .await
                .map(|r| r.data.expect("products").items)
        }
    };

    let food = list(ProductQuery {
        category: Some("food".into()),
        ..Default::default()
    })
    .await?;
    assert_eq!(food.len(), 2);

    let in_stock_food = list(ProductQuery {
        category: Some("food".into()),
        in_stock: Some(true),
        ..Default::default()
    })
    .await?;
    assert_eq!(in_stock_food.len(), 1);
    assert_eq!(in_stock_food[0].name, "Chicken Kibble");

    let cheap = list(ProductQuery {
        max_price: Some(300.0),
        ..Default::default()
    })
    .await?;
    assert_eq!(cheap.len(), 2);

    let search = list(ProductQuery {
        search: Some("KIBBLE".into()),
        ..Default::default()
    })
    .await?;
    assert_eq!(search.len(), 1);

    let categories = product_service::categories().data.expect("categories");
    let ids: Vec<&str> = categories.iter().map(|c| c.id).collect();
    assert_eq!(ids, ["food", "toys", "accessories", "medicine"]);
    Ok(())
}

#[tokio::test]
async fn reviews_update_the_rating() -> anyhow::Result<()> {
    let app = TestApp::new(ConsistencyMode::BestEffort);
    let named = app.user("u1", "", "").await;
    let anonymous = petcare_api::middleware::auth::AuthUser {
        uid: "ghost".into(),
        phone_number: None,
        admin: false,
    };
    app.product("p1", 10.0, 1).await;

    product_service::add_review(
        &app.state,
        &named,
        "p1",
        ReviewRequest {
            rating: 5,
            comment: "Great".into(),
        },
    )
    .await?;
    let product = product_service::add_review(
        &app.state,
        &anonymous,
        "p1",
        ReviewRequest {
            rating: 4,
            comment: String::new(),
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(product.rating, 4.5);
    assert_eq!(product.reviews[0].user_name, "u1 name");
    assert_eq!(product.reviews[1].user_name, "Anonymous");

    let err = product_service::add_review(
        &app.state,
        &named,
        "p1",
        ReviewRequest {
            rating: 6,
            comment: String::new(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}
