//! Request routing for the local expense API
//!
//! The table is fixed:
//!
//! | Method | Path | Response |
//! |---|---|---|
//! | `OPTIONS` | any | 200, empty |
//! | `GET` | `/api/health` | 200 health body |
//! | `GET` | `/api/expenses` | 200 expense list |
//! | `POST` | `/api/expenses` | 201 created body |
//! | `PUT` | `/api/expenses/` | 200 updated body |
//! | `DELETE` | `/api/expenses/` | 200 deleted body |
//!
//! Unknown paths get 404, known paths with another method (HEAD included)
//! get 405, and a failing or panicking handler gets 500. Every response
//! carries permissive CORS headers.

use crate::payload::{CreatedResponse, ErrorResponse, HealthResponse, StatusResponse};
use crate::store::{Expense, ExpensePatch, ExpenseStore, StoreError};
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, trace};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Failure inside a handler. Always rendered as a generic 500.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Error handling request: {}", self);
        internal_error()
    }
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn ExpenseStore>,
}

/// Build the routing table over the given store
pub fn router(store: Arc<dyn ExpenseStore>) -> Router {
    Router::new()
        .route(
            "/api/health",
            get(health)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/expenses",
            get(list_expenses)
                .head(method_not_allowed)
                .post(create_expense)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/expenses/",
            put(update_expense)
                .delete(delete_expense)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(middleware::from_fn(cors))
        .with_state(AppState { store })
}

/// Answers preflight requests directly and stamps CORS headers on everything else.
/// Handlers run on their own task so a panic becomes a 500.
async fn cors(request: Request, next: Next) -> Response {
    trace!("{} {}", request.method(), request.uri());

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        match tokio::spawn(next.run(request)).await {
            Ok(response) => response,
            Err(err) => {
                error!("Request handler failed: {}", err);
                internal_error()
            }
        }
    };

    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::internal()),
    )
        .into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::not_found())).into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::method_not_allowed()),
    )
        .into_response()
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::now())
}

async fn list_expenses(State(state): State<AppState>) -> Result<Json<Vec<Expense>>, ApiError> {
    let expenses = state.store.list().await?;
    Ok(Json(expenses))
}

async fn create_expense(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let fields = parse_body(&read_body(body));
    let expense = match serde_json::from_value::<Expense>(Value::Object(fields)) {
        Ok(expense) => expense,
        Err(e) => {
            debug!("Expense body does not match the expense shape: {}", e);
            Expense::default()
        }
    };

    let id = state.store.create(expense).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(id))))
}

async fn update_expense(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let mut patch = parse_body(&read_body(body));
    let id = take_expense_id(&mut patch, read_query(query));
    state.store.update(&id, patch).await?;
    Ok(Json(StatusResponse::updated()))
}

async fn delete_expense(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let mut fields = parse_body(&read_body(body));
    let id = take_expense_id(&mut fields, read_query(query));
    state.store.delete(&id).await?;
    Ok(Json(StatusResponse::deleted()))
}

/// Body bytes, or nothing when the body could not be read (too large,
/// aborted upload)
fn read_body(body: Result<Bytes, BytesRejection>) -> Bytes {
    body.unwrap_or_else(|rejection| {
        debug!("Ignoring unreadable request body: {}", rejection);
        Bytes::new()
    })
}

/// Decoded query parameters, or none when the query does not parse
fn read_query(
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> HashMap<String, String> {
    match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            debug!("Ignoring malformed query string: {}", rejection);
            HashMap::new()
        }
    }
}

/// Parse a request body as a JSON object. Anything else counts as empty.
fn parse_body(body: &[u8]) -> Map<String, Value> {
    if body.is_empty() {
        return Map::new();
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            debug!("Ignoring non-object request body: {}", other);
            Map::new()
        }
        Err(e) => {
            debug!("Ignoring unparsable request body: {}", e);
            Map::new()
        }
    }
}

/// Expense id from the body's `id` field, else the `id` query parameter
fn take_expense_id(fields: &mut ExpensePatch, mut query: HashMap<String, String>) -> String {
    match fields.remove("id") {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        _ => query.remove("id").unwrap_or_default(),
    }
}
