//! In-process fake of the policy API.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// What the fake server has seen and holds.
#[derive(Default)]
pub struct FakeState {
    pub carts: HashMap<String, Vec<String>>,
    pub tracked: Vec<Value>,
    pub filters: Vec<Value>,
    pub next_filter_id: u64,
    pub promotions: Vec<Value>,
}

pub type Shared = Arc<Mutex<FakeState>>;

pub fn catalog() -> Vec<Value> {
    vec![
        json!({
            "policy_id": "P1",
            "policy_name": "Smart Term Shield",
            "policy_type": "Term",
            "description": "Pure protection cover",
            "keywords": "protection, life",
            "premium_amount (INR)": 12000,
            "sum_assured (INR)": "1,00,00,000",
            "policy_duration_years": 30,
            "risk_category": "Low",
            "customer_target_group": "Young Professionals, Families"
        }),
        json!({
            "policy_id": "P2",
            "policy_name": "Family Health Plus",
            "policy_type": "Health",
            "description": "Hospitalisation cover for the whole family",
            "keywords": "medical, family",
            "premium_amount (INR)": 18500,
            "sum_assured (INR)": 1000000,
            "policy_duration_years": 1,
            "risk_category": "Medium"
        }),
        json!({
            "policy_id": "P3",
            "policy_name": "Wealth Builder ULIP",
            "policy_type": "ULIP",
            "description": "Market-linked savings with life cover",
            "keywords": "investment, long term",
            "premium_amount (INR)": "50,000",
            "sum_assured (INR)": 2500000,
            "policy_duration_years": 15,
            "risk_category": "High"
        }),
    ]
}

fn text_matches(policy: &Value, needle: &str) -> bool {
    ["policy_name", "policy_type", "description", "keywords"]
        .iter()
        .filter_map(|field| policy[*field].as_str())
        .any(|text| text.to_lowercase().contains(needle))
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search(Query(query): Query<SearchQuery>) -> Json<Vec<Value>> {
    let needle = query.q.trim().to_lowercase();
    Json(
        catalog()
            .into_iter()
            .filter(|p| needle.is_empty() || text_matches(p, &needle) || p["policy_id"] == query.q)
            .collect(),
    )
}

#[derive(Deserialize)]
struct RecommendQuery {
    customer_id: String,
    top_n: Option<usize>,
}

async fn recommend(Query(query): Query<RecommendQuery>) -> Result<Json<Vec<Value>>, StatusCode> {
    if query.customer_id.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut policies = catalog();
    for (i, policy) in policies.iter_mut().enumerate() {
        policy["score"] = json!(0.9 - i as f64 * 0.1);
    }
    policies.truncate(query.top_n.unwrap_or(5));
    Ok(Json(policies))
}

#[derive(Deserialize)]
struct CustomerQuery {
    customer_id: String,
}

async fn get_cart(State(state): State<Shared>, Query(query): Query<CustomerQuery>) -> Json<Value> {
    let state = state.lock().unwrap();
    let ids = state.carts.get(&query.customer_id).cloned().unwrap_or_default();
    let items: Vec<Value> = catalog()
        .into_iter()
        .filter(|p| ids.iter().any(|id| p["policy_id"] == id.as_str()))
        .map(|p| {
            json!({
                "policy_id": p["policy_id"],
                "policy_name": p["policy_name"],
                "premium_amount": p["premium_amount (INR)"],
            })
        })
        .collect();
    Json(json!({ "items": items }))
}

#[derive(Deserialize)]
struct CartBody {
    customer_id: String,
    policy_id: Option<String>,
}

async fn cart_add(
    State(state): State<Shared>,
    Json(body): Json<CartBody>,
) -> Result<Json<Value>, StatusCode> {
    let policy_id = body.policy_id.ok_or(StatusCode::BAD_REQUEST)?;
    if !catalog().iter().any(|p| p["policy_id"] == policy_id.as_str()) {
        return Err(StatusCode::NOT_FOUND);
    }
    let mut state = state.lock().unwrap();
    let cart = state.carts.entry(body.customer_id).or_default();
    if !cart.contains(&policy_id) {
        cart.push(policy_id);
    }
    Ok(Json(json!({ "message": "added" })))
}

async fn cart_remove(
    State(state): State<Shared>,
    Json(body): Json<CartBody>,
) -> Result<Json<Value>, StatusCode> {
    let policy_id = body.policy_id.ok_or(StatusCode::BAD_REQUEST)?;
    let mut state = state.lock().unwrap();
    if let Some(cart) = state.carts.get_mut(&body.customer_id) {
        cart.retain(|id| *id != policy_id);
    }
    Ok(Json(json!({ "message": "removed" })))
}

async fn cart_checkout(State(state): State<Shared>, Json(body): Json<CartBody>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    let purchased = state.carts.remove(&body.customer_id).unwrap_or_default();
    Json(json!({ "message": "checked out", "purchased": purchased }))
}

#[derive(Deserialize)]
struct RangeQuery {
    range: String,
}

async fn analytics(Query(query): Query<RangeQuery>) -> Result<Json<Value>, (StatusCode, String)> {
    if !["7d", "30d", "90d", "1y"].contains(&query.range.as_str()) {
        return Err((StatusCode::BAD_REQUEST, format!("bad range {}", query.range)));
    }
    Ok(Json(json!({
        "metrics": {
            "total_policies": 3,
            "total_customers": 1200,
            "conversion_rate": 4.5,
            "avg_premium": 26833.33
        },
        "policy_performance": {
            "labels": ["Term", "Health", "ULIP"],
            "datasets": [{ "label": "Sales", "data": [120.0, 80.0, 40.0] }]
        },
        "customer_segments": { "labels": [], "datasets": [] },
        "sales_trend": {
            "labels": ["Mon", "Tue"],
            "datasets": [{ "data": [10.0, 12.0] }]
        },
        "top_policies": [
            { "policy_id": "P1", "policy_name": "Smart Term Shield", "value": 120.0 }
        ],
        "recent_activities": [
            { "id": "1", "type": "purchase", "customer": "C1", "policy": "P1", "time": "2 min ago" }
        ]
    })))
}

async fn list_filters(State(state): State<Shared>) -> Json<Vec<Value>> {
    Json(state.lock().unwrap().filters.clone())
}

async fn create_filter(
    State(state): State<Shared>,
    Json(mut body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut state = state.lock().unwrap();
    state.next_filter_id += 1;
    body["id"] = json!(state.next_filter_id);
    state.filters.push(body.clone());
    (StatusCode::CREATED, Json(body))
}

async fn delete_filter(State(state): State<Shared>, Path(id): Path<u64>) -> StatusCode {
    let mut state = state.lock().unwrap();
    let before = state.filters.len();
    state.filters.retain(|f| f["id"] != id);
    if state.filters.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn promote(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let count = body["policy_ids"].as_array().map(Vec::len).unwrap_or(0);
    state.lock().unwrap().promotions.push(body);
    Json(json!({ "promoted": count }))
}

async fn create_policy(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({ "policy_id": "P100", "policy_name": body["policy_name"] })),
    )
}

async fn track(State(state): State<Shared>, Json(payload): Json<Value>) -> Json<Value> {
    state.lock().unwrap().tracked.push(payload);
    Json(json!({ "status": "success" }))
}

/// Starts the fake API on an ephemeral port. Returns its base URL and state.
pub async fn spawn_fake_api() -> (String, Shared) {
    let state: Shared = Arc::default();

    let app = Router::new()
        .route("/track", post(track))
        .route("/search_policies", get(search))
        .route("/recommend_policies", get(recommend))
        .route("/cart", get(get_cart))
        .route("/cart/add", post(cart_add))
        .route("/cart/remove", post(cart_remove))
        .route("/cart/checkout", post(cart_checkout))
        .route("/analytics", get(analytics))
        .route("/custom_filters", get(list_filters).post(create_filter))
        .route("/custom_filters/:id", delete(delete_filter))
        .route("/promote_policies", post(promote))
        .route("/policies", post(create_policy))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}
