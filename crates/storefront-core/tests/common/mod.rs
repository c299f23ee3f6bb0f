//! In-process mock of the storefront backend.
//!
//! Bound to an ephemeral localhost port; records every authenticated call so
//! tests can assert on refresh counts and the Authorization headers sent.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post, put};
use axum::{Form, Json, Router as AxumRouter};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use storefront_core::auth::{KeyValueStore, MemoryStore, TokenStore};
use storefront_core::{AuthSessionManager, Config, Router};

pub const USER_ACCESS: &str = "tok1";
pub const USER_REFRESH: &str = "rtok1";
pub const ADMIN_ACCESS: &str = "admintok";
pub const ADMIN_REFRESH: &str = "adminrtok";
pub const REFRESHED_ACCESS: &str = "tok2";
pub const ROTATED_REFRESH: &str = "rtok2";
pub const REGISTERED_ACCESS: &str = "tok-new";

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
}

pub struct MockState {
    accepted_access: Mutex<HashSet<String>>,
    accepted_refresh: Mutex<HashSet<String>>,
    requests: Mutex<Vec<Recorded>>,
    logout_bodies: Mutex<Vec<Value>>,
    orders: Mutex<Vec<Value>>,
    categories: Mutex<Vec<Value>>,
    products: Mutex<Vec<Value>>,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    /// `auth/user/` answers 401 even for valid tokens
    pub user_always_unauthorized: AtomicBool,
    /// `auth/user/` answers 500
    pub user_fails: AtomicBool,
    /// Refresh responses carry a rotated refresh token
    pub rotate_refresh: AtomicBool,
    /// Milliseconds `auth/refresh/` waits before answering
    pub refresh_delay_ms: AtomicU64,
}

impl MockState {
    fn new() -> Self {
        Self {
            accepted_access: Mutex::new(
                [USER_ACCESS, ADMIN_ACCESS].iter().map(|s| s.to_string()).collect(),
            ),
            accepted_refresh: Mutex::new(
                [USER_REFRESH, ADMIN_REFRESH].iter().map(|s| s.to_string()).collect(),
            ),
            requests: Mutex::new(Vec::new()),
            logout_bodies: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            categories: Mutex::new(seed_categories()),
            products: Mutex::new(seed_products()),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            user_always_unauthorized: AtomicBool::new(false),
            user_fails: AtomicBool::new(false),
            rotate_refresh: AtomicBool::new(false),
            refresh_delay_ms: AtomicU64::new(0),
        }
    }

    fn record(&self, path: &str, headers: &HeaderMap) -> Option<String> {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Recorded {
            path: path.to_string(),
            authorization: authorization.clone(),
        });
        authorization.and_then(|a| a.strip_prefix("Bearer ").map(str::to_string))
    }

    fn accepts(&self, token: &Option<String>) -> bool {
        match token {
            Some(t) => self.accepted_access.lock().unwrap().contains(t),
            None => false,
        }
    }

    /// Authorization headers seen for `path`, in order
    pub fn authorizations(&self, path: &str) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .map(|r| r.authorization.clone())
            .collect()
    }

    pub fn calls(&self, path: &str) -> usize {
        self.authorizations(path).len()
    }

    pub fn logout_bodies(&self) -> Vec<Value> {
        self.logout_bodies.lock().unwrap().clone()
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn product_json(&self, id: i64) -> Option<Value> {
        self.products.lock().unwrap().iter().find(|p| p["id"] == json!(id)).cloned()
    }

    pub fn category_json(&self, id: i64) -> Option<Value> {
        self.categories.lock().unwrap().iter().find(|c| c["id"] == json!(id)).cloned()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Given token not valid for any token type"})),
    )
        .into_response()
}

fn seed_categories() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Chairs", "image": null}),
        json!({"id": 2, "name": "Tables", "image": "/media/categories/tables.jpg"}),
    ]
}

fn seed_products() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Oak Chair", "category": {"id": 1, "name": "Chairs", "image": null},
               "article": "CH-01", "price": "1500.00", "description": "Sturdy oak chair", "image": null, "images": []}),
        json!({"id": 2, "name": "Oak Table", "category": {"id": 2, "name": "Tables", "image": null},
               "article": "TB-01", "price": "12990.00", "description": "Dining table", "image": "/media/products/table.jpg", "images": []}),
        json!({"id": 3, "name": "Pine Stool", "category": {"id": 1, "name": "Chairs", "image": null},
               "article": "ST-01", "price": "700.00", "description": null, "image": null, "images": []}),
    ]
}

fn profile_for(token: &str) -> Value {
    match token {
        ADMIN_ACCESS => json!({"id": 2, "username": "admin", "email": "admin@example.com", "phone": null,
                               "role": "admin", "role_display": "Administrator", "orders": []}),
        REGISTERED_ACCESS => json!({"id": 3, "username": "newbie", "email": "n@example.com", "phone": null,
                                    "role": "customer", "role_display": "Customer", "orders": []}),
        _ => json!({"id": 1, "username": "a", "email": "a@example.com", "phone": null,
                    "role": "customer", "role_display": "Customer", "orders": []}),
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match (username, password) {
        ("a", "b") => Json(json!({"access": USER_ACCESS, "refresh": USER_REFRESH, "role": "user"})).into_response(),
        ("admin", "pw") => Json(json!({"access": ADMIN_ACCESS, "refresh": ADMIN_REFRESH, "role": "admin"})).into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid credentials"}))).into_response(),
    }
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    if username == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"username": ["A user with that username already exists."]})),
        )
            .into_response();
    }
    state.accepted_access.lock().unwrap().insert(REGISTERED_ACCESS.to_string());
    (
        StatusCode::CREATED,
        Json(json!({
            "user": {"username": username, "email": body["email"], "phone": body["phone"]},
            "refresh": "rtok-new",
            "access": REGISTERED_ACCESS,
        })),
    )
        .into_response()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let token = body["refresh"].as_str().unwrap_or_default().to_string();
    if !state.accepted_refresh.lock().unwrap().contains(&token) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Token is invalid or expired", "code": "token_not_valid"})),
        )
            .into_response();
    }

    state.accepted_access.lock().unwrap().insert(REFRESHED_ACCESS.to_string());
    if state.rotate_refresh.load(Ordering::SeqCst) {
        state.accepted_refresh.lock().unwrap().insert(ROTATED_REFRESH.to_string());
        Json(json!({"access": REFRESHED_ACCESS, "refresh": ROTATED_REFRESH})).into_response()
    } else {
        Json(json!({"access": REFRESHED_ACCESS})).into_response()
    }
}

async fn user(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let token = state.record("auth/user/", &headers);
    if state.user_always_unauthorized.load(Ordering::SeqCst) || !state.accepts(&token) {
        return unauthorized();
    }
    if state.user_fails.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    Json(profile_for(token.as_deref().unwrap_or_default())).into_response()
}

async fn logout(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    state.logout_bodies.lock().unwrap().push(body);
    Json(json!({"detail": "Successfully logged out."})).into_response()
}

async fn categories(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record("categories/", &headers);
    Json(Value::Array(state.categories.lock().unwrap().clone())).into_response()
}

async fn products(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record("products/", &headers);
    Json(Value::Array(state.products.lock().unwrap().clone())).into_response()
}

async fn product(State(state): State<Arc<MockState>>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    state.record("products/{id}/", &headers);
    match state.product_json(id) {
        Some(p) => Json(p).into_response(),
        None => not_found(),
    }
}

async fn list_orders(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let token = state.record("orders/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }
    Json(Value::Array(state.orders.lock().unwrap().clone())).into_response()
}

async fn create_order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let token = state.record("orders/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }

    let products = state.products.lock().unwrap().clone();
    let mut items = Vec::new();
    let mut total = 0.0;
    for line in body["items"].as_array().cloned().unwrap_or_default() {
        let Some(product) = products.iter().find(|p| p["id"] == line["product_id"]) else {
            return (StatusCode::BAD_REQUEST, Json(json!({"items": ["Unknown product"]}))).into_response();
        };
        let quantity = line["quantity"].as_u64().unwrap_or(0);
        let price: f64 = product["price"].as_str().unwrap_or("0").parse().unwrap_or(0.0);
        total += price * quantity as f64;
        items.push(json!({"id": items.len() + 1, "product": product, "quantity": quantity, "price": product["price"]}));
    }

    let mut orders = state.orders.lock().unwrap();
    let id = orders.len() + 1;
    let order = json!({
        "id": id,
        "code": format!("ORDR{:04}", id),
        "user": {"id": 1, "username": "a", "email": "a@example.com", "phone": null, "role": "customer"},
        "status": "pending",
        "status_display": "Awaiting pickup",
        "created_at": "2024-05-01T10:00:00Z",
        "total_price": format!("{:.2}", total),
        "items": items,
        "cancel_reason": null,
    });
    orders.push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"detail": "You do not have permission to perform this action."})),
    )
        .into_response()
}

async fn search_order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Response {
    let token = state.record("orders/search/{code}/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }
    if token.as_deref() != Some(ADMIN_ACCESS) {
        return forbidden();
    }
    match state.orders.lock().unwrap().iter().find(|o| o["code"] == json!(code)) {
        Some(order) => Json(order.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "No order with that code."}))).into_response(),
    }
}

async fn update_order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let token = state.record("orders/{code}/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }
    if token.as_deref() != Some(ADMIN_ACCESS) {
        return forbidden();
    }
    let mut orders = state.orders.lock().unwrap();
    let Some(order) = orders.iter_mut().find(|o| o["code"] == json!(code)) else {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response();
    };
    order["status"] = body["status"].clone();
    if let Some(reason) = body.get("cancel_reason") {
        order["cancel_reason"] = reason.clone();
    }
    Json(order.clone()).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
}

async fn create_category(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let token = state.record("categories/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }
    let mut categories = state.categories.lock().unwrap();
    let id = categories.iter().filter_map(|c| c["id"].as_i64()).max().unwrap_or(0) + 1;
    let category = json!({"id": id, "name": form.get("name"), "image": null});
    categories.push(category.clone());
    (StatusCode::CREATED, Json(category)).into_response()
}

async fn update_category(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let token = state.record("categories/{id}/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }
    let mut categories = state.categories.lock().unwrap();
    let Some(category) = categories.iter_mut().find(|c| c["id"] == json!(id)) else {
        return not_found();
    };
    category["name"] = json!(form.get("name"));
    Json(category.clone()).into_response()
}

async fn delete_category(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let token = state.record("categories/{id}/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }
    let mut categories = state.categories.lock().unwrap();
    let before = categories.len();
    categories.retain(|c| c["id"] != json!(id));
    if categories.len() == before {
        return not_found();
    }
    // Products go with their category
    state
        .products
        .lock()
        .unwrap()
        .retain(|p| p["category"]["id"] != json!(id));
    StatusCode::NO_CONTENT.into_response()
}

fn apply_product_form(
    state: &MockState,
    product: &mut Value,
    form: &HashMap<String, String>,
) -> Result<(), Response> {
    for key in ["name", "article", "specifications", "description"] {
        if let Some(value) = form.get(key) {
            product[key] = json!(value);
        }
    }
    if let Some(price) = form.get("price") {
        if price.parse::<f64>().is_err() {
            return Err((StatusCode::BAD_REQUEST, Json(json!({"price": ["A valid number is required."]})))
                .into_response());
        }
        product["price"] = json!(price);
    }
    if let Some(category_id) = form.get("category_id") {
        let category = category_id.parse::<i64>().ok().and_then(|id| state.category_json(id));
        match category {
            Some(category) => product["category"] = category,
            None => {
                return Err((StatusCode::BAD_REQUEST, Json(json!({"category_id": ["Invalid pk."]})))
                    .into_response())
            }
        }
    }
    Ok(())
}

async fn create_product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let token = state.record("products/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }
    let id = {
        let products = state.products.lock().unwrap();
        products.iter().filter_map(|p| p["id"].as_i64()).max().unwrap_or(0) + 1
    };
    let mut product = json!({"id": id, "category": null, "specifications": null,
                             "description": null, "image": null, "images": []});
    if let Err(response) = apply_product_form(&state, &mut product, &form) {
        return response;
    }
    state.products.lock().unwrap().push(product.clone());
    (StatusCode::CREATED, Json(product)).into_response()
}

async fn update_product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let token = state.record("products/{id}/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }
    let Some(mut product) = state.product_json(id) else {
        return not_found();
    };
    if let Err(response) = apply_product_form(&state, &mut product, &form) {
        return response;
    }
    let mut products = state.products.lock().unwrap();
    if let Some(slot) = products.iter_mut().find(|p| p["id"] == json!(id)) {
        *slot = product.clone();
    }
    Json(product).into_response()
}

async fn delete_product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let token = state.record("products/{id}/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }
    let mut products = state.products.lock().unwrap();
    let before = products.len();
    products.retain(|p| p["id"] != json!(id));
    if products.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_product_image(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let token = state.record("products/{id}/delete-image/", &headers);
    if !state.accepts(&token) {
        return unauthorized();
    }
    let mut products = state.products.lock().unwrap();
    let Some(product) = products.iter_mut().find(|p| p["id"] == json!(id)) else {
        return not_found();
    };
    if product["image"].is_null() {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "No image to delete"}))).into_response();
    }
    product["image"] = Value::Null;
    StatusCode::NO_CONTENT.into_response()
}

pub struct MockBackend {
    pub state: Arc<MockState>,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState::new());
    let app = AxumRouter::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/register/", post(register))
        .route("/api/auth/refresh/", post(refresh))
        .route("/api/auth/user/", get(user))
        .route("/api/auth/logout/", post(logout))
        .route("/api/categories/", get(categories).post(create_category))
        .route("/api/categories/{id}/", put(update_category).delete(delete_category))
        .route("/api/products/", get(products).post(create_product))
        .route(
            "/api/products/{id}/",
            get(product).patch(update_product).delete(delete_product),
        )
        .route("/api/products/{id}/delete-image/", delete(delete_product_image))
        .route("/api/orders/", get(list_orders).post(create_order))
        .route("/api/orders/search/{code}/", get(search_order))
        .route("/api/orders/{code}/", patch(update_order))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock backend error: {e}");
        }
    });

    MockBackend {
        state,
        base_url: format!("http://{}/api/", addr),
        handle,
    }
}

pub struct Harness {
    pub manager: AuthSessionManager,
    pub storage: Arc<MemoryStore>,
    pub router: Arc<Router>,
}

/// A manager against `base_url`, starting from whatever `storage` holds
pub fn harness_with(base_url: &str, storage: Arc<MemoryStore>, start: &str) -> Harness {
    let router = Arc::new(Router::starting_at(start));
    let manager = AuthSessionManager::new(
        Config::for_base_url(base_url),
        TokenStore::new(storage.clone()),
        router.clone(),
    )
    .expect("build manager");
    Harness {
        manager,
        storage,
        router,
    }
}

pub fn harness(backend: &MockBackend) -> Harness {
    harness_with(&backend.base_url, Arc::new(MemoryStore::new()), "/")
}

/// Storage holding a session as if left by an earlier run
pub fn seeded_storage(access: &str, refresh: &str) -> Arc<MemoryStore> {
    let storage = Arc::new(MemoryStore::new());
    storage.set("access_token", access).unwrap();
    storage.set("refresh_token", refresh).unwrap();
    storage.set("user_role", "user").unwrap();
    storage.set("user_data", r#"{"id": 1, "username": "a"}"#).unwrap();
    storage
}
