use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    api_v1_routes,
    auth::{AuthService, Claims},
    config::AppConfig,
    db,
    entities::{address, product},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_USER: &str = "user_test_1";
pub const TEST_EMAIL: &str = "shopper@example.com";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Helper harness spinning up the full router over a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    db_file: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Construct a new test application with fresh database state, letting the
    /// caller tweak configuration (e.g. point the payment gateway at a mock).
    pub async fn with_config(mutate: impl FnOnce(&mut AppConfig)) -> Self {
        let db_file = format!("storefront_test_{}.db", Uuid::new_v4().simple());
        let _ = std::fs::remove_file(&db_file);

        let mut cfg = AppConfig::new(
            format!("sqlite://{db_file}?mode=rwc"),
            "test_secret_key_for_testing_purposes_only_32chars",
            "sk_test_gateway",
            WEBHOOK_SECRET,
            "127.0.0.1",
            18_080,
            "test",
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        mutate(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("test database");
        db::run_migrations(&pool).await.expect("migrations");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(&cfg));
        let services =
            AppServices::new(db_arc.clone(), event_sender.clone(), &cfg).expect("app services");

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", api_v1_routes(auth_service))
            .with_state(state.clone());

        let token = issue_token(&cfg, TEST_USER, Some(TEST_EMAIL));

        Self {
            router,
            state,
            token,
            db_file,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let token = self.token.clone();
        self.request(method, uri, body, Some(&token)).await
    }

    /// Raw request with arbitrary headers (used by the webhook tests, which
    /// authenticate with a signature instead of a bearer token).
    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, String)],
        body: String,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }

        let request = builder.body(Body::from(body)).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        offer_price: Option<Decimal>,
    ) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(format!("{name} description")),
            price: Set(price),
            offer_price: Set(offer_price),
            image: Set(Some(serde_json::json!(
                "https://cdn.example.com/products/item.png"
            ))),
            category: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_address(&self, user_id: &str) -> address::Model {
        address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id.to_string()),
            full_name: Set("Asha Patel".to_string()),
            phone_number: Set("555-0100".to_string()),
            pincode: Set("400001".to_string()),
            area: Set("12 Harbor Lane".to_string()),
            city: Set("Mumbai".to_string()),
            state: Set("MH".to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed address")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_file);
    }
}

pub fn issue_token(cfg: &AppConfig, sub: &str, email: Option<&str>) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        email: email.map(str::to_string),
        iat: now,
        exp: now + 3600,
        iss: cfg.auth_issuer.clone(),
        aud: cfg.auth_audience.clone(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()),
    )
    .expect("token")
}

/// Sign a webhook body the way the provider does: hex HMAC-SHA256 over
/// `"{t}.{body}"` under the shared secret.
pub fn sign_webhook(secret: &str, body: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let ts = Utc::now().timestamp();
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(ts.to_string().as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    format!("t={},v1={}", ts, hex::encode(mac.finalize().into_bytes()))
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
