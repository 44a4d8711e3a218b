//! Admin surface: catalog management, order handling, dashboard, reports
//!
//! Every handler names the capability it needs and checks it first; there is
//! no route-level magic. Validation failures are 422 with field messages and
//! never leave partial writes behind.

use super::auth::{AuthSession, Capability};
use super::state::AppState;
use crate::error::Result;
use crate::storage::{NewProduct, ProductFilter, ProductUpdate};
use crate::types::{CategoryId, OrderId, OrderStatus, PredictionId, ProductId};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", post(create_category_handler))
        .route("/brands", post(create_brand_handler))
        .route("/products", get(list_products_handler))
        .route("/products", post(create_product_handler))
        .route("/products/:id", put(update_product_handler))
        .route("/products/:id/stock", post(adjust_stock_handler))
        .route("/orders", get(list_orders_handler))
        .route("/orders/:id/status", post(transition_order_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/reports/sales-by-category", get(sales_by_category_handler))
        .route(
            "/reports/prediction-accuracy",
            get(prediction_accuracy_handler),
        )
        .route("/reports/top-rules", get(top_rules_handler))
        .route(
            "/predictions/:id/outcome",
            post(prediction_outcome_handler),
        )
        .route("/model/reload", post(model_reload_handler))
        .route("/rules/regenerate", post(regenerate_rules_handler))
}

// -- catalog ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CreateCategoryRequest {
    name: String,
    slug: String,
    parent_id: Option<CategoryId>,
    #[serde(default)]
    sort_order: i64,
}

async fn create_category_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<Value>> {
    session.require(Capability::ManageCatalog)?;
    let category = state
        .store
        .create_category(&req.name, &req.slug, req.parent_id, req.sort_order)
        .await?;
    Ok(Json(json!({ "category": category })))
}

#[derive(Debug, Deserialize)]
struct CreateBrandRequest {
    name: String,
    slug: String,
}

async fn create_brand_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<CreateBrandRequest>,
) -> Result<Json<Value>> {
    session.require(Capability::ManageCatalog)?;
    let brand = state.store.create_brand(&req.name, &req.slug).await?;
    Ok(Json(json!({ "brand": brand })))
}

/// Unlike the public listing, this one may include inactive products
async fn list_products_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Value>> {
    session.require(Capability::ManageCatalog)?;
    let products = state.store.list_products(&filter).await?;
    Ok(Json(json!({ "products": products })))
}

async fn create_product_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Json(new): Json<NewProduct>,
) -> Result<Json<Value>> {
    session.require(Capability::ManageCatalog)?;
    let product = state.store.create_product(&new).await?;
    Ok(Json(json!({ "product": product })))
}

async fn update_product_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<Value>> {
    session.require(Capability::ManageCatalog)?;
    let product = state
        .store
        .update_product(ProductId::from_string(&id)?, &update)
        .await?;
    Ok(Json(json!({ "product": product })))
}

#[derive(Debug, Deserialize)]
struct StockAdjustRequest {
    delta: i64,
}

async fn adjust_stock_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<StockAdjustRequest>,
) -> Result<Json<Value>> {
    session.require(Capability::ManageCatalog)?;
    let product = state
        .store
        .adjust_stock(ProductId::from_string(&id)?, req.delta)
        .await?;
    info!(
        "stock adjusted by {} on {} by {}: now {}",
        req.delta, product.sku, session.user.username, product.stock_quantity
    );
    Ok(Json(json!({ "product": product })))
}

// -- orders -----------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct OrderListQuery {
    status: Option<OrderStatus>,
    limit: Option<i64>,
}

async fn list_orders_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Value>> {
    session.require(Capability::ManageOrders)?;
    let orders = state
        .store
        .list_orders(query.status, query.limit.unwrap_or(100))
        .await?;
    Ok(Json(json!({ "orders": orders })))
}

#[derive(Debug, Deserialize)]
struct TransitionRequest {
    status: OrderStatus,
}

async fn transition_order_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<Value>> {
    session.require(Capability::ManageOrders)?;
    let order = state
        .store
        .transition_order_status(OrderId::from_string(&id)?, req.status)
        .await?;
    info!(
        "order {} moved to {} by {}",
        order.order_number, order.status, session.user.username
    );
    Ok(Json(json!({ "order": order })))
}

// -- dashboard and reports --------------------------------------------------

async fn dashboard_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    session.require(Capability::ViewReports)?;
    let orders = state.store.order_metrics().await?;
    let low_stock = state.store.low_stock_products().await?;
    let loyalty = state.store.loyalty_stats().await?;
    let (rule_count, rule_generation) = state.store.rule_set_info().await?;
    Ok(Json(json!({
        "orders": orders,
        "low_stock": low_stock,
        "loyalty": loyalty,
        "rules": { "count": rule_count, "generation": rule_generation },
    })))
}

async fn sales_by_category_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    session.require(Capability::ViewReports)?;
    let rows = state.store.sales_by_category().await?;
    Ok(Json(json!({ "sales_by_category": rows })))
}

async fn prediction_accuracy_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    session.require(Capability::ViewReports)?;
    let accuracy = state.store.prediction_accuracy().await?;
    Ok(Json(json!({ "accuracy": accuracy })))
}

async fn top_rules_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    session.require(Capability::ViewReports)?;
    let rules = state.store.top_rules(20).await?;
    Ok(Json(json!({ "rules": rules })))
}

#[derive(Debug, Deserialize)]
struct OutcomeRequest {
    correct: bool,
}

/// Label a recorded prediction against observed purchase behavior;
/// labeled records feed the accuracy report
async fn prediction_outcome_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
    Json(req): Json<OutcomeRequest>,
) -> Result<Json<Value>> {
    session.require(Capability::ViewReports)?;
    let id = PredictionId::from_string(&id)?;
    state.store.mark_prediction_outcome(id, req.correct).await?;
    let prediction = state.store.get_prediction(id).await?;
    Ok(Json(json!({ "prediction": prediction })))
}

// -- model and mining -------------------------------------------------------

async fn model_reload_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    session.require(Capability::ManageModel)?;
    let status = state.predictor.reload()?;
    info!("model reloaded by {}", session.user.username);
    Ok(Json(json!({ "model": status })))
}

async fn regenerate_rules_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    session.require(Capability::ManageModel)?;
    let report = state.miner.regenerate().await?;
    Ok(Json(json!({ "mining": report })))
}
