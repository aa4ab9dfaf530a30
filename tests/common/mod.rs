//! Shared harness for HTTP-level tests.

#![allow(dead_code, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use vortex_gateway::api;
use vortex_gateway::app_state::AppState;
use vortex_gateway::domain::{
    CoinCatalog, EventBus, PurchaseVerification, User, UserId, VerificationId,
};
use vortex_gateway::persistence::{MemoryStore, VerificationStore};
use vortex_gateway::service::VerificationService;

/// A running gateway bound to an ephemeral port.
pub struct TestApp {
    /// `http://127.0.0.1:<port>`.
    pub base_url: String,
    /// Direct handle on the backing store, for seeding and assertions.
    pub store: Arc<MemoryStore>,
    /// HTTP client.
    pub client: reqwest::Client,
}

impl TestApp {
    /// Starts a gateway over a fresh in-memory store.
    pub async fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn VerificationStore> = Arc::clone(&store) as _;
        let base_url = spawn_with_store(dyn_store).await;
        Self {
            base_url,
            store,
            client: reqwest::Client::new(),
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `ws://` URL of the event feed.
    pub fn ws_url(&self) -> String {
        format!("{}/ws", self.base_url.replacen("http://", "ws://", 1))
    }

    /// Inserts a user with the given balance.
    pub async fn seed_user(&self, id: &str, balance: i64) {
        let mut user = User::new(user_id(id));
        user.coin_balance = balance;
        let Ok(()) = self.store.insert_user(&user).await else {
            panic!("seeding user {id}");
        };
    }

    /// Inserts a pending verification.
    pub async fn seed_verification(&self, id: &str, user: &str, package: &str) {
        let record = PurchaseVerification::pending(verification_id(id), user_id(user), package);
        let Ok(()) = self.store.insert_verification(&record).await else {
            panic!("seeding verification {id}");
        };
    }

    /// Current balance of a seeded user.
    pub async fn balance(&self, id: &str) -> i64 {
        let Ok(Some(user)) = self.store.get_user(&user_id(id)).await else {
            panic!("user {id} should exist");
        };
        user.coin_balance
    }

    /// Current state of a seeded verification.
    pub async fn verification(&self, id: &str) -> PurchaseVerification {
        let Ok(Some(record)) = self.store.get_verification(&verification_id(id)).await else {
            panic!("verification {id} should exist");
        };
        record
    }

    /// Posts `body` to the WhatsApp webhook and returns status and JSON body.
    pub async fn post_webhook(&self, body: serde_json::Value) -> (u16, serde_json::Value) {
        let Ok(response) = self
            .client
            .post(self.url("/api/whatsapp"))
            .json(&body)
            .send()
            .await
        else {
            panic!("webhook request failed");
        };
        let status = response.status().as_u16();
        let json = response.json().await.unwrap_or_default();
        (status, json)
    }
}

/// Starts a gateway over `store` and returns its base URL.
pub async fn spawn_with_store(store: Arc<dyn VerificationStore>) -> String {
    spawn_with_timeout(store, Duration::from_secs(5)).await
}

/// Starts a gateway over `store` with the given REST request timeout.
pub async fn spawn_with_timeout(
    store: Arc<dyn VerificationStore>,
    request_timeout: Duration,
) -> String {
    let service = VerificationService::new(
        store,
        Arc::new(CoinCatalog::default()),
        EventBus::new(64),
    )
    .with_whatsapp_admin_number(Some("15550001111".to_string()));
    let app = api::build_app(AppState::new(service), request_timeout);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("binding test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("reading listener address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// Parses a user id, panicking on invalid input.
pub fn user_id(raw: &str) -> UserId {
    let Ok(id) = UserId::parse(raw) else {
        panic!("valid user id: {raw}");
    };
    id
}

/// Parses a verification id, panicking on invalid input.
pub fn verification_id(raw: &str) -> VerificationId {
    let Ok(id) = VerificationId::parse(raw) else {
        panic!("valid verification id: {raw}");
    };
    id
}
