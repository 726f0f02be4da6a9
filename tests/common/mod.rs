use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use sea_orm::ConnectionTrait;
use serde_json::Value;
use tower::ServiceExt;

use glexport_api::{
    config::AppConfig,
    db::{self, DbConfig},
    AppState,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE shipments (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        company_id INTEGER NOT NULL,
        international_transportation_mode TEXT,
        international_departure_date TEXT
    )",
    "CREATE TABLE products (
        id INTEGER PRIMARY KEY,
        sku TEXT NOT NULL,
        description TEXT NOT NULL,
        quantity INTEGER NOT NULL
    )",
    "CREATE TABLE shipment_products (
        shipment_id INTEGER NOT NULL,
        product_id INTEGER NOT NULL
    )",
];

/// Helper harness for spinning up the application router backed by an
/// in-memory SQLite database with the externally-owned glexport schema.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        // A single pooled connection keeps the in-memory database alive for
        // the lifetime of the harness.
        let db_config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..DbConfig::default()
        };
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("in-memory sqlite should connect");

        let state = AppState {
            db: Arc::new(pool),
            config: test_config(),
        };
        let router = glexport_api::app_router(state.clone());

        let app = Self { router, state };
        for stmt in SCHEMA {
            app.execute(stmt).await;
        }
        app
    }

    pub async fn execute(&self, sql: &str) {
        self.state
            .db
            .execute_unprepared(sql)
            .await
            .expect("fixture statement should execute");
    }

    /// Issues a GET request against the router and returns status + JSON body.
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should not fail at the transport level");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };
        (status, json)
    }

    /// Seeds the shared fixture: two company-1 shipments with overlapping
    /// products, plus a company-2 shipment that keeps one aggregate global.
    pub async fn seed_fixture(&self) {
        for stmt in [
            "INSERT INTO shipments (id, name, company_id, international_transportation_mode, international_departure_date)
             VALUES (1, 'Alpha Freight', 1, 'air', '2024-03-01')",
            "INSERT INTO shipments (id, name, company_id, international_transportation_mode, international_departure_date)
             VALUES (2, 'Beta Cargo', 1, 'ocean', '2024-01-15')",
            "INSERT INTO shipments (id, name, company_id, international_transportation_mode, international_departure_date)
             VALUES (3, 'Gamma Haul', 2, 'air', '2024-02-20')",
            "INSERT INTO products (id, sku, description, quantity) VALUES (10, 'SKU-10', 'Standing desk', 5)",
            "INSERT INTO products (id, sku, description, quantity) VALUES (11, 'SKU-11', 'Task chair', 2)",
            "INSERT INTO products (id, sku, description, quantity) VALUES (12, 'SKU-12', 'Desk lamp', 7)",
            "INSERT INTO shipment_products (shipment_id, product_id) VALUES (1, 10)",
            "INSERT INTO shipment_products (shipment_id, product_id) VALUES (1, 11)",
            "INSERT INTO shipment_products (shipment_id, product_id) VALUES (2, 10)",
            "INSERT INTO shipment_products (shipment_id, product_id) VALUES (2, 12)",
            "INSERT INTO shipment_products (shipment_id, product_id) VALUES (3, 10)",
        ] {
            self.execute(stmt).await;
        }
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 3000,
        environment: "test".to_string(),
        log_level: "info".to_string(),
        log_json: false,
        cors_allowed_origins: None,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 30,
        db_acquire_timeout_secs: 8,
        db_idle_timeout_secs: 600,
    }
}

/// Shipment ids in response order.
pub fn record_ids(body: &Value) -> Vec<i64> {
    body["records"]
        .as_array()
        .expect("records array expected")
        .iter()
        .map(|record| record["id"].as_i64().expect("integer id expected"))
        .collect()
}

/// Product list of one record, sorted by id. The product query carries no
/// ORDER BY, so tests normalize before comparing.
pub fn products_sorted(body: &Value, record_index: usize) -> Vec<Value> {
    let mut products = body["records"][record_index]["products"]
        .as_array()
        .expect("products array expected")
        .clone();
    products.sort_by_key(|product| product["id"].as_i64().expect("integer id expected"));
    products
}
