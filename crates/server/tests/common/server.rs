//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bazaar_core::config::AppConfig;
use bazaar_server::catalog::Catalog;
use bazaar_server::{AppState, create_router};
use bazaar_store::{ShopStore, SqliteStore};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies on a temp-dir datastore.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server over a fresh SQLite datastore.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let db_path = temp_dir.path().join("shop.db");
        let store: Arc<dyn ShopStore> = Arc::new(
            SqliteStore::new(&db_path, None)
                .await
                .expect("Failed to create datastore"),
        );

        let catalog = Arc::new(Catalog::empty());
        let state = AppState::new(AppConfig::for_testing(), store, catalog);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying datastore.
    pub fn store(&self) -> Arc<dyn ShopStore> {
        self.state.store.clone()
    }

    /// Rebuild the catalog snapshot after seeding products directly.
    pub async fn reload_catalog(&self) {
        self.state
            .catalog
            .reload(self.state.store.as_ref(), None)
            .await
            .expect("Failed to reload catalog");
    }

    /// Issue a request with an optional JSON body and request cookies.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
        cookies: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if !cookies.is_empty() {
            let cookie_header = cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie_header);
        }

        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        let request = builder.body(body).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let set_cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(String::from))
            .collect();

        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = if body_bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null)
        };

        TestResponse {
            status,
            body,
            set_cookies,
        }
    }
}

/// A parsed test response.
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
    pub set_cookies: Vec<String>,
}

#[allow(dead_code)]
impl TestResponse {
    /// Value of a cookie set by the response, if any.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies
            .iter()
            .find(|c| c.starts_with(&prefix))
            .map(|c| {
                c[prefix.len()..]
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
    }
}
