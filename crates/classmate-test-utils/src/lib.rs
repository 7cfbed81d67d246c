//! Shared test utilities for classmate integration tests.
//!
//! Provides a PostgreSQL instance shared across tests (each test gets its
//! own database within the instance) and a canned [`GenerativeModel`] for
//! exercising flows and HTTP handlers without the hosted API.
//!
//! Two Postgres modes:
//! - **`CLASSMATE_TEST_PG_URL`** set: use that server directly. No
//!   testcontainers overhead per process.
//! - **No env var** (`cargo test`): spin up a container via testcontainers,
//!   shared per binary through a `OnceCell`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use testcontainers::ContainerAsync;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use classmate_core::model::{GenerationRequest, GenerativeModel, ModelError};
use classmate_db::pool;

// ---------------------------------------------------------------------------
// Shared PostgreSQL
// ---------------------------------------------------------------------------

/// Shared container state: base URL and optional container handle (kept alive).
struct SharedPg {
    base_url: String,
    /// Held to keep the container alive. `None` when using an external URL.
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED_PG: OnceCell<SharedPg> = OnceCell::const_new();

async fn init_shared_pg() -> SharedPg {
    if let Ok(url) = std::env::var("CLASSMATE_TEST_PG_URL") {
        return SharedPg {
            base_url: url.trim_end_matches('/').to_string(),
            _container: None,
        };
    }

    let container = Postgres::default()
        .with_tag("16")
        .start()
        .await
        .expect("failed to start PostgreSQL container");

    let host = container.get_host().await.expect("failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("failed to get mapped port");

    SharedPg {
        base_url: format!("postgresql://postgres:postgres@{host}:{port}"),
        _container: Some(container),
    }
}

/// Base URL for the shared PostgreSQL (server root, no database name).
pub async fn pg_url() -> &'static str {
    let shared = SHARED_PG.get_or_init(init_shared_pg).await;
    &shared.base_url
}

async fn maintenance_pool() -> PgPool {
    let maint_url = format!("{}/postgres", pg_url().await);
    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&maint_url)
        .await
        .expect("failed to connect to maintenance database")
}

/// Create a temporary database with migrations applied.
///
/// Returns `(pool, db_name)`. Call [`drop_test_db`] with `db_name` when the
/// test is done.
pub async fn create_test_db() -> (PgPool, String) {
    let maint_pool = maintenance_pool().await;
    let db_name = format!("classmate_test_{}", Uuid::new_v4().simple());
    let stmt = format!("CREATE DATABASE {db_name}");
    maint_pool
        .execute(stmt.as_str())
        .await
        .unwrap_or_else(|e| panic!("failed to create temp database {db_name}: {e}"));
    maint_pool.close().await;

    let temp_url = format!("{}/{db_name}", pg_url().await);
    let temp_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&temp_url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to temp database {db_name}: {e}"));

    pool::migrate(&temp_pool)
        .await
        .expect("migrations should succeed");

    (temp_pool, db_name)
}

/// Drop a temporary database, terminating its connections first.
///
/// Safe to call even if the database was already dropped.
pub async fn drop_test_db(db_name: &str) {
    let maint_pool = maintenance_pool().await;

    let terminate = format!(
        "SELECT pg_terminate_backend(pid) \
         FROM pg_stat_activity \
         WHERE datname = '{db_name}' AND pid <> pg_backend_pid()"
    );
    let _ = maint_pool.execute(terminate.as_str()).await;

    let stmt = format!("DROP DATABASE IF EXISTS {db_name}");
    let _ = maint_pool.execute(stmt.as_str()).await;
    maint_pool.close().await;
}

// ---------------------------------------------------------------------------
// Canned model
// ---------------------------------------------------------------------------

enum Reply {
    Json(serde_json::Value),
    Failure { status: u16, message: String },
}

/// A [`GenerativeModel`] that answers from a queue of canned replies.
///
/// Every request is recorded so tests can inspect prompts and schemas.
/// Calling it with an empty queue panics.
#[derive(Default)]
pub struct CannedModel {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl CannedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model whose first call returns `value`.
    pub fn replying(value: serde_json::Value) -> Self {
        let model = Self::new();
        model.push_json(value);
        model
    }

    /// A model whose first call fails with an upstream API error.
    pub fn failing(status: u16, message: &str) -> Self {
        let model = Self::new();
        model.replies.lock().unwrap().push_back(Reply::Failure {
            status,
            message: message.to_string(),
        });
        model
    }

    pub fn push_json(&self, value: serde_json::Value) {
        self.replies.lock().unwrap().push_back(Reply::Json(value));
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.prompt).collect()
    }
}

#[async_trait]
impl GenerativeModel for CannedModel {
    fn name(&self) -> &str {
        "canned"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<serde_json::Value, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected model call for flow {}", request.flow));
        match reply {
            Reply::Json(value) => Ok(value),
            Reply::Failure { status, message } => Err(ModelError::Api { status, message }),
        }
    }
}
