use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::{StatusCode, Uri},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower::Layer;
use tracing::{debug, info};

pub const DOCUMENT_COLLECTIONS: [&str; 5] = [
    "invoices",
    "invoice_receipts",
    "simplified_invoices",
    "credit_notes",
    "debit_notes",
];

const NOT_FOUND_PAGE: &str = "<!DOCTYPE html>\n<html><head><title>The page you were looking for doesn't exist (404)</title></head>\n<body><h1>The page you were looking for doesn't exist.</h1></body></html>\n";

type Params = Vec<(String, String)>;

/// In-memory records keyed by collection name, then id.
#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    records: HashMap<String, BTreeMap<u64, Value>>,
}

impl Store {
    fn insert(&mut self, collection: &str, mut record: Map<String, Value>) -> Value {
        self.next_id += 1;
        let id = self.next_id;
        record.insert("id".to_string(), json!(id));
        let record = Value::Object(record);
        self.records
            .entry(collection.to_string())
            .or_default()
            .insert(id, record.clone());
        record
    }

    fn list(&self, collection: &str) -> Vec<Value> {
        self.records
            .get(collection)
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default()
    }

    fn get(&self, collection: &str, id: u64) -> Option<&Value> {
        self.records.get(collection)?.get(&id)
    }

    fn get_mut(&mut self, collection: &str, id: u64) -> Option<&mut Value> {
        self.records.get_mut(collection)?.get_mut(&id)
    }

    fn remove(&mut self, collection: &str, id: u64) -> Option<Value> {
        self.records.get_mut(collection)?.remove(&id)
    }
}

#[derive(Clone)]
pub struct AppState {
    api_key: Arc<str>,
    store: Arc<RwLock<Store>>,
}

/// Routes are written without the `.json` suffix; `guard` strips it and
/// checks `api_key` before the request is routed.
pub fn app(api_key: &str) -> Router {
    let state = AppState {
        api_key: Arc::from(api_key),
        store: Arc::new(RwLock::new(Store::default())),
    };
    let routes = Router::new()
        .route("/{collection}", get(list_records).post(create_record))
        .route("/{collection}/find-by-code", get(find_by_code))
        .route("/{collection}/find-by-name", get(find_by_name))
        .route(
            "/{collection}/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/{collection}/{id}/invoices", get(client_invoices))
        .route("/{collection}/{id}/change-state", put(change_state))
        .route("/{collection}/{id}/email-document", put(email_document))
        .fallback(unknown_route)
        .with_state(state.clone());

    let guarded = middleware::from_fn_with_state(state, guard).layer(routes);
    Router::new().fallback_service(guarded)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock InvoiceXpress API listening");
    }
    axum::serve(listener, app(api_key)).await
}

async fn guard(
    State(state): State<AppState>,
    Query(params): Query<Params>,
    mut request: Request,
    next: Next,
) -> Response {
    debug!(method = %request.method(), uri = %request.uri(), "mock request");

    let Some(path) = request.uri().path().strip_suffix(".json") else {
        return not_found_page();
    };
    let rewritten = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let api_key = params.iter().find(|(k, _)| k == "api_key").map(|(_, v)| v.as_str());
    if api_key != Some(&*state.api_key) {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }

    match rewritten.parse::<Uri>() {
        Ok(uri) => *request.uri_mut() = uri,
        Err(_) => return not_found_page(),
    }
    next.run(request).await
}

async fn unknown_route() -> Response {
    not_found_page()
}

// --- collections ---

async fn list_records(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<Params>,
) -> Response {
    if !is_collection(&collection) {
        return not_found_page();
    }
    let store = state.store.read().await;
    let mut response = Map::new();
    response.insert(collection.clone(), Value::Array(store.list(&collection)));
    if is_document(&collection) {
        let filters: Map<String, Value> = params
            .into_iter()
            .filter(|(k, _)| k != "api_key")
            .map(|(k, v)| (k, json!(v)))
            .collect();
        response.insert("filters".to_string(), Value::Object(filters));
    }
    Json(Value::Object(response)).into_response()
}

async fn create_record(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if !is_collection(&collection) {
        return not_found_page();
    }
    let mut fields = match payload(&collection, body) {
        Ok(fields) => fields,
        Err(resp) => return resp,
    };
    if matches!(collection.as_str(), "clients" | "items")
        && !fields.get("name").is_some_and(Value::is_string)
    {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, "Name can't be blank");
    }
    if is_document(&collection) {
        fields.entry("status").or_insert_with(|| json!("draft"));
    }
    let record = state.store.write().await.insert(&collection, fields);
    (StatusCode::CREATED, Json(json!({ singular(&collection): record }))).into_response()
}

// --- client finders ---

async fn find_by_code(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<Params>,
) -> Response {
    find_client(&state, &collection, &params, "client_code", "code").await
}

async fn find_by_name(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<Params>,
) -> Response {
    find_client(&state, &collection, &params, "client_name", "name").await
}

async fn find_client(
    state: &AppState,
    collection: &str,
    params: &Params,
    query_key: &str,
    field: &str,
) -> Response {
    if collection != "clients" {
        return not_found_page();
    }
    let Some((_, wanted)) = params.iter().find(|(k, _)| k == query_key) else {
        return api_error(StatusCode::BAD_REQUEST, &format!("Missing {query_key}"));
    };
    let store = state.store.read().await;
    match store
        .list("clients")
        .into_iter()
        .find(|c| c.get(field).and_then(Value::as_str) == Some(wanted.as_str()))
    {
        Some(client) => Json(json!({ "client": client })).into_response(),
        None => api_error(StatusCode::NOT_FOUND, "Client not found"),
    }
}

async fn client_invoices(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
) -> Response {
    if collection != "clients" {
        return not_found_page();
    }
    let store = state.store.read().await;
    if store.get("clients", id).is_none() {
        return record_not_found("clients");
    }
    let invoices: Vec<Value> = store
        .list("invoices")
        .into_iter()
        .filter(|inv| inv["client"]["id"] == json!(id))
        .collect();
    Json(json!({ "invoices": invoices })).into_response()
}

// --- members ---

async fn get_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
) -> Response {
    if !is_collection(&collection) {
        return not_found_page();
    }
    match state.store.read().await.get(&collection, id) {
        Some(record) => Json(json!({ singular(&collection): record })).into_response(),
        None => record_not_found(&collection),
    }
}

/// Merge the posted fields into the record; the API answers with an empty 200.
async fn update_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if !is_collection(&collection) {
        return not_found_page();
    }
    let fields = match payload(&collection, body) {
        Ok(fields) => fields,
        Err(resp) => return resp,
    };
    match state.store.write().await.get_mut(&collection, id) {
        Some(Value::Object(record)) => {
            for (k, v) in fields {
                if k != "id" {
                    record.insert(k, v);
                }
            }
            StatusCode::OK.into_response()
        }
        _ => record_not_found(&collection),
    }
}

/// Only items can be deleted.
async fn delete_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
) -> Response {
    if collection != "items" {
        return not_found_page();
    }
    match state.store.write().await.remove("items", id) {
        Some(_) => StatusCode::OK.into_response(),
        None => record_not_found("items"),
    }
}

// --- documents ---

async fn change_state(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    if !is_document(&collection) {
        return not_found_page();
    }
    let fields = match payload(&collection, body) {
        Ok(fields) => fields,
        Err(resp) => return resp,
    };
    let Some(new_state) = fields.get("state").and_then(Value::as_str) else {
        return api_error(StatusCode::UNPROCESSABLE_ENTITY, "State can't be blank");
    };
    let status = match new_state {
        "finalized" => "final",
        "canceled" => "canceled",
        "settled" => "settled",
        other => {
            return api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                &format!("Invalid state transition: {other}"),
            )
        }
    };
    match state.store.write().await.get_mut(&collection, id) {
        Some(Value::Object(record)) => {
            record.insert("status".to_string(), json!(status));
            Json(json!({ singular(&collection): record.clone() })).into_response()
        }
        _ => record_not_found(&collection),
    }
}

async fn email_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
) -> Response {
    if !is_document(&collection) {
        return not_found_page();
    }
    match state.store.read().await.get(&collection, id) {
        Some(_) => StatusCode::OK.into_response(),
        None => record_not_found(&collection),
    }
}

// --- helpers ---

/// `{"errors":[{"error": message}]}` with the given status.
fn api_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "errors": [{ "error": message }] }))).into_response()
}

fn not_found_page() -> Response {
    (StatusCode::NOT_FOUND, Html(NOT_FOUND_PAGE)).into_response()
}

/// `clients` -> `client`, `credit_notes` -> `credit_note`.
fn singular(collection: &str) -> &str {
    collection.strip_suffix('s').unwrap_or(collection)
}

/// Take the object under the collection's singular key from a request body.
fn payload(
    collection: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Map<String, Value>, Response> {
    let Json(parsed) = body.map_err(|e| {
        api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("Invalid JSON: {}", e.body_text()),
        )
    })?;
    match parsed.get(singular(collection)) {
        Some(Value::Object(fields)) => Ok(fields.clone()),
        _ => Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            &format!("Missing {} attributes", singular(collection)),
        )),
    }
}

fn is_collection(segment: &str) -> bool {
    matches!(segment, "clients" | "items") || is_document(segment)
}

fn is_document(segment: &str) -> bool {
    DOCUMENT_COLLECTIONS.contains(&segment)
}

fn record_not_found(collection: &str) -> Response {
    let name = singular(collection).replace('_', " ");
    let mut chars = name.chars();
    let title: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name,
    };
    api_error(StatusCode::NOT_FOUND, &format!("{title} not found"))
}
