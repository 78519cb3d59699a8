//! Routing contract tests for the local expense API.
//!
//! Requests are driven straight through the router, no socket involved.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use phone_server::store::ExpensePatch;
use phone_server::{router, Expense, ExpenseStore, StoreError, StubExpenseStore};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

type Reply = (StatusCode, HeaderMap, Vec<u8>);

async fn send(app: Router, method: Method, uri: &str, body: Body) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

async fn send_stub(method: Method, uri: &str) -> Reply {
    send(router(Arc::new(StubExpenseStore)), method, uri, Body::empty()).await
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("response body should be JSON")
}

fn assert_cors(headers: &HeaderMap) {
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(
        headers["access-control-allow-methods"],
        "GET, POST, PUT, DELETE, OPTIONS"
    );
    assert_eq!(
        headers["access-control-allow-headers"],
        "Content-Type, Authorization"
    );
}

#[tokio::test]
async fn test_health_reports_ok() {
    let before = chrono::Utc::now().timestamp_millis();
    let (status, headers, body) = send_stub(Method::GET, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_cors(&headers);
    let body = json_body(&body);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_i64().unwrap() >= before);
}

#[tokio::test]
async fn test_list_expenses_is_empty_array() {
    let (status, headers, body) = send_stub(Method::GET, "/api/expenses").await;

    assert_eq!(status, StatusCode::OK);
    assert_cors(&headers);
    assert_eq!(json_body(&body), json!([]));
}

#[tokio::test]
async fn test_create_expense_returns_201_with_id() {
    let app = router(Arc::new(StubExpenseStore));
    let payload = json!({"description": "Coffee", "amount": 45.0, "store": "Starbucks"});
    let (status, headers, body) = send(
        app,
        Method::POST,
        "/api/expenses",
        Body::from(payload.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_cors(&headers);
    let body = json_body(&body);
    assert_eq!(body["status"], "created");
    let id = body["id"].as_str().unwrap();
    assert!(!id.is_empty());
    assert!(id.parse::<i64>().is_ok());
}

#[tokio::test]
async fn test_create_expense_tolerates_garbage_body() {
    let app = router(Arc::new(StubExpenseStore));
    let (status, _, body) = send(app, Method::POST, "/api/expenses", Body::from("{oops")).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_body(&body)["status"], "created");
}

#[tokio::test]
async fn test_update_and_delete_on_trailing_slash_path() {
    let (status, headers, body) = send_stub(Method::PUT, "/api/expenses/").await;
    assert_eq!(status, StatusCode::OK);
    assert_cors(&headers);
    assert_eq!(json_body(&body), json!({"status": "updated"}));

    let (status, _, body) = send_stub(Method::DELETE, "/api/expenses/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"status": "deleted"}));
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (status, headers, body) = send_stub(Method::GET, "/unknown/path").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_cors(&headers);
    assert_eq!(json_body(&body), json!({"error": "Not found"}));
}

#[tokio::test]
async fn test_wrong_method_on_known_path_is_405() {
    for (method, uri) in [
        (Method::DELETE, "/api/expenses"),
        (Method::PUT, "/api/expenses"),
        (Method::GET, "/api/expenses/"),
        (Method::POST, "/api/expenses/"),
        (Method::POST, "/api/health"),
    ] {
        let (status, headers, body) = send_stub(method.clone(), uri).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{} {}", method, uri);
        assert_cors(&headers);
        assert_eq!(json_body(&body), json!({"error": "Method not allowed"}));
    }
}

#[tokio::test]
async fn test_head_on_get_routes_is_405() {
    for uri in ["/api/health", "/api/expenses", "/api/expenses/"] {
        let (status, headers, _) = send_stub(Method::HEAD, uri).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "HEAD {}", uri);
        assert_cors(&headers);
    }

    let (status, _, _) = send_stub(Method::HEAD, "/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_body_keeps_table_status() {
    let padding = "x".repeat(3 * 1024 * 1024);
    let body = json!({"description": "Fuel", "notes": padding}).to_string();

    let app = router(Arc::new(StubExpenseStore));
    let (status, _, reply) = send(
        app.clone(),
        Method::POST,
        "/api/expenses",
        Body::from(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(!json_body(&reply)["id"].as_str().unwrap().is_empty());

    let (status, _, _) = send(
        app.clone(),
        Method::PUT,
        "/api/expenses/",
        Body::from(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(app, Method::DELETE, "/api/expenses/", Body::from(body)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_options_is_200_everywhere() {
    for uri in ["/api/health", "/api/expenses", "/api/expenses/", "/nowhere"] {
        let (status, headers, body) = send_stub(Method::OPTIONS, uri).await;
        assert_eq!(status, StatusCode::OK, "OPTIONS {}", uri);
        assert_cors(&headers);
        assert!(body.is_empty());
    }
}

/// Store that records calls and can be told to fail
#[derive(Default)]
struct RecordingStore {
    fail: bool,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ExpenseStore for RecordingStore {
    async fn list(&self) -> Result<Vec<Expense>, StoreError> {
        self.calls.lock().unwrap().push("list".into());
        if self.fail {
            return Err(StoreError::Unavailable("disk on fire".into()));
        }
        Ok(vec![Expense {
            id: Some("1".into()),
            description: Some("Groceries".into()),
            ..Default::default()
        }])
    }

    async fn create(&self, expense: Expense) -> Result<String, StoreError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create:{}", expense.description.unwrap_or_default()));
        if self.fail {
            return Err(StoreError::Unavailable("disk on fire".into()));
        }
        Ok("new-id".into())
    }

    async fn update(&self, id: &str, patch: ExpensePatch) -> Result<(), StoreError> {
        let keys: Vec<_> = patch.keys().cloned().collect();
        self.calls
            .lock()
            .unwrap()
            .push(format!("update:{}:{}", id, keys.join(",")));
        if self.fail {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(format!("delete:{}", id));
        if self.fail {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_handlers_delegate_to_store() {
    let store = Arc::new(RecordingStore::default());
    let app = router(store.clone());

    let (_, _, body) = send(app.clone(), Method::GET, "/api/expenses", Body::empty()).await;
    assert_eq!(json_body(&body), json!([{"id": "1", "description": "Groceries"}]));

    let (status, _, body) = send(
        app.clone(),
        Method::POST,
        "/api/expenses",
        Body::from(json!({"description": "Fuel"}).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_body(&body)["id"], "new-id");

    send(
        app.clone(),
        Method::PUT,
        "/api/expenses/",
        Body::from(json!({"id": "7", "amount": 10}).to_string()),
    )
    .await;
    send(app.clone(), Method::DELETE, "/api/expenses/?id=9", Body::empty()).await;
    send(app, Method::DELETE, "/api/expenses/?id=abc%2F1%20x", Body::empty()).await;

    assert_eq!(
        *store.calls.lock().unwrap(),
        vec![
            "list",
            "create:Fuel",
            "update:7:amount",
            "delete:9",
            "delete:abc/1 x"
        ]
    );
}

#[tokio::test]
async fn test_odd_query_string_is_accepted() {
    let store = Arc::new(RecordingStore::default());
    let (status, _, _) = send(
        router(store.clone()),
        Method::DELETE,
        "/api/expenses/?id=%ZZ&&=",
        Body::empty(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_failure_is_500() {
    let store: Arc<dyn ExpenseStore> = Arc::new(RecordingStore {
        fail: true,
        ..Default::default()
    });

    for (method, uri) in [
        (Method::GET, "/api/expenses"),
        (Method::POST, "/api/expenses"),
        (Method::PUT, "/api/expenses/"),
        (Method::DELETE, "/api/expenses/"),
    ] {
        let app = router(store.clone());
        let (status, headers, body) = send(app, method.clone(), uri, Body::empty()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{} {}", method, uri);
        assert_cors(&headers);
        assert_eq!(json_body(&body), json!({"error": "Internal server error"}));
    }
}

/// Store whose every call panics
struct PanickingStore;

#[async_trait]
impl ExpenseStore for PanickingStore {
    async fn list(&self) -> Result<Vec<Expense>, StoreError> {
        panic!("list exploded")
    }

    async fn create(&self, _expense: Expense) -> Result<String, StoreError> {
        panic!("create exploded")
    }

    async fn update(&self, _id: &str, _patch: ExpensePatch) -> Result<(), StoreError> {
        panic!("update exploded")
    }

    async fn delete(&self, _id: &str) -> Result<(), StoreError> {
        panic!("delete exploded")
    }
}

#[tokio::test]
async fn test_handler_panic_is_500() {
    let app = router(Arc::new(PanickingStore));

    let (status, headers, body) =
        send(app.clone(), Method::GET, "/api/expenses", Body::empty()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_cors(&headers);
    assert_eq!(json_body(&body), json!({"error": "Internal server error"}));

    // The router keeps serving afterwards
    let (status, _, _) = send(app, Method::GET, "/api/health", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
}
