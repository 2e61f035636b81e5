#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use petcare_api::{
    config::ConsistencyMode,
    middleware::auth::{AuthUser, JwtAuthorizer},
    models::{Product, Profile, Role, User, collections::{PRODUCTS, USERS}},
    notify::{EmailMessage, NotificationSender, Notifier, NotifyError, RetryPolicy, TextMessage},
    payment::{GatewayError, GatewayOrder, PaymentGateway},
    state::{AppState, Settings},
    store::{DocumentStore, MemoryStore, encode},
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

pub const JWT_SECRET: &str = "test-secret";
pub const KEY_SECRET: &str = "rzp_test_secret";

/// Keeps every delivered notification for assertions.
#[derive(Default)]
pub struct RecordingSender {
    pub emails: Mutex<Vec<EmailMessage>>,
    pub texts: Mutex<Vec<TextMessage>>,
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.emails.lock().await.push(message.clone());
        Ok(())
    }

    async fn send_message(&self, message: &TextMessage) -> Result<(), NotifyError> {
        self.texts.lock().await.push(message.clone());
        Ok(())
    }
}

/// Gateway double that hands out sequential order ids.
#[derive(Default)]
pub struct FakeGateway {
    pub orders: Mutex<Vec<GatewayOrder>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let mut orders = self.orders.lock().await;
        let order = GatewayOrder {
            id: format!("order_test_{}", orders.len() + 1),
            amount,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
            status: Some("created".into()),
        };
        orders.push(order.clone());
        Ok(order)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Value, GatewayError> {
        Ok(json!({ "id": payment_id, "status": "captured" }))
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        _notes: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        Ok(json!({ "id": "rfnd_test", "payment_id": payment_id, "amount": amount }))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub sender: Arc<RecordingSender>,
    pub gateway: Arc<FakeGateway>,
}

impl TestApp {
    pub fn new(mode: ConsistencyMode) -> Self {
        let sender = Arc::new(RecordingSender::default());
        let gateway = Arc::new(FakeGateway::default());
        let (notifier, _worker) = Notifier::start(
            sender.clone(),
            RetryPolicy {
                max_attempts: 1,
                backoff: Duration::from_millis(1),
            },
            64,
        );
        let state = AppState {
            store: Arc::new(MemoryStore::new()),
            notifier,
            gateway: gateway.clone(),
            authorizer: Arc::new(JwtAuthorizer::new(JWT_SECRET)),
            settings: Arc::new(Settings {
                consistency: mode,
                razorpay_key_id: "rzp_test_key".into(),
                razorpay_key_secret: KEY_SECRET.into(),
            }),
        };
        Self {
            state,
            sender,
            gateway,
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.state.store.as_ref()
    }

    /// Registers a user profile and returns the matching caller identity.
    pub async fn user(&self, uid: &str, email: &str, phone: &str) -> AuthUser {
        let now = Utc::now();
        let user = User {
            uid: uid.to_string(),
            phone_number: Some(phone.to_string()).filter(|p| !p.is_empty()),
            role: Role::User,
            profile: Profile {
                name: format!("{uid} name"),
                email: email.to_string(),
                ..Default::default()
            },
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        self.store()
            .set(USERS, uid, encode(&user).expect("encode user"))
            .await
            .expect("insert user");
        AuthUser {
            uid: uid.to_string(),
            phone_number: user.phone_number,
            admin: false,
        }
    }

    pub fn admin(&self) -> AuthUser {
        AuthUser {
            uid: "admin-1".into(),
            phone_number: None,
            admin: true,
        }
    }

    pub async fn product(&self, id: &str, price: f64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            description: String::new(),
            price,
            stock,
            category: "food".into(),
            rating: 0.0,
            reviews: Vec::new(),
            created_at: now,
            updated_at: now,
            details: Default::default(),
        };
        self.store()
            .set(PRODUCTS, id, encode(&product).expect("encode product"))
            .await
            .expect("insert product");
        product
    }

    pub async fn stock_of(&self, id: &str) -> i64 {
        self.store()
            .get(PRODUCTS, id)
            .await
            .expect("read product")
            .expect("product exists")
            .decode::<Product>()
            .expect("decode product")
            .stock
    }

    /// Waits for the outbox worker to drain.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
