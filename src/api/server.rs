//! HTTP API server
//!
//! Public storefront surface plus the capability-gated admin routes from
//! `admin`. Handlers are thin: extract, call storage or a service, map the
//! error through `StoreError`'s response impl.

use super::admin;
use super::auth::AuthSession;
use super::state::AppState;
use crate::error::{Result, StoreError};
use crate::storage::{NewUser, ProductFilter, ProfileUpdate};
use crate::types::{ProductId, ShippingDetails, User};
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// API server over a fully constructed application state
pub struct ApiServer {
    addr: SocketAddr,
    state: AppState,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self { addr, state }
    }

    /// Build the full router, public surface plus admin
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            // Accounts and sessions
            .route("/auth/register", post(register_handler))
            .route("/auth/login", post(login_handler))
            .route("/auth/logout", post(logout_handler))
            // Catalog browsing
            .route("/catalog/categories", get(list_categories_handler))
            .route("/catalog/brands", get(list_brands_handler))
            .route("/catalog/products", get(list_products_handler))
            .route("/catalog/products/:id", get(get_product_handler))
            .route(
                "/catalog/products/:id/recommendations",
                get(recommendations_handler),
            )
            // Cart
            .route("/cart", get(cart_handler))
            .route("/cart/items", post(add_cart_item_handler))
            .route("/cart/items/:product_id", put(set_cart_quantity_handler))
            .route(
                "/cart/items/:product_id",
                delete(remove_cart_item_handler),
            )
            .route("/cart/redeem-points", post(redeem_points_handler))
            .route("/cart/discounts/:id", delete(cancel_discount_handler))
            .route("/cart/quote", get(quote_handler))
            // Checkout and orders
            .route("/checkout", post(checkout_handler))
            .route("/orders", get(list_orders_handler))
            .route("/orders/:id", get(get_order_handler))
            // Loyalty
            .route("/loyalty", get(loyalty_handler))
            .route("/loyalty/transactions", get(loyalty_transactions_handler))
            // Profile and prediction
            .route("/profile", get(get_profile_handler))
            .route("/profile", put(update_profile_handler))
            .route("/profile/predict", post(predict_handler))
            // Health check
            .route("/health", get(health_handler))
            // Admin surface
            .nest("/admin", admin::router())
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        let router = Self::build_router(self.state);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!("API server listening on http://{}", self.addr);
        axum::serve(listener, router).await?;
        Ok(())
    }
}

// -- auth -------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    user: User,
    token: String,
}

/// Public registration always creates a customer; elevated roles are
/// assigned through the admin surface
async fn register_handler(
    State(state): State<AppState>,
    Json(mut new): Json<NewUser>,
) -> Result<Json<SessionResponse>> {
    new.role = None;
    let user = state.store.register_user(&new).await?;
    let token = state
        .store
        .create_session(user.id, state.config.http.session_ttl_hours)
        .await?;
    Ok(Json(SessionResponse { user, token }))
}

async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let user = state.store.verify_login(&req.username, &req.password).await?;
    let token = state
        .store
        .create_session(user.id, state.config.http.session_ttl_hours)
        .await?;
    Ok(Json(SessionResponse { user, token }))
}

async fn logout_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    state.store.delete_session(&session.token).await?;
    Ok(Json(json!({ "logged_out": true })))
}

// -- catalog ----------------------------------------------------------------

async fn list_categories_handler(State(state): State<AppState>) -> Result<Json<Value>> {
    let categories = state.store.list_categories().await?;
    Ok(Json(json!({ "categories": categories })))
}

async fn list_brands_handler(State(state): State<AppState>) -> Result<Json<Value>> {
    let brands = state.store.list_brands().await?;
    Ok(Json(json!({ "brands": brands })))
}

/// Public listing never includes inactive products regardless of the query
async fn list_products_handler(
    State(state): State<AppState>,
    Query(mut filter): Query<ProductFilter>,
) -> Result<Json<Value>> {
    filter.include_inactive = false;
    let products = state.store.list_products(&filter).await?;
    Ok(Json(json!({ "products": products })))
}

async fn get_product_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let product = state.store.get_product(ProductId::from_string(&id)?).await?;
    if !product.is_active {
        return Err(StoreError::NotFound(format!("product {}", id)));
    }
    Ok(Json(json!({ "product": product })))
}

#[derive(Debug, Deserialize)]
struct RecommendationQuery {
    n: Option<usize>,
}

/// Frequently-bought-together. Unknown or rule-less products produce an
/// empty list, never an error.
async fn recommendations_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<Value>> {
    let n = query
        .n
        .unwrap_or(state.config.mining.default_top_n)
        .clamp(1, 50);
    let recommendations = match ProductId::from_string(&id) {
        Ok(product_id) => state.store.top_consequents(product_id, n).await?,
        Err(_) => Vec::new(),
    };
    Ok(Json(json!({ "recommendations": recommendations })))
}

// -- cart -------------------------------------------------------------------

async fn cart_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    let (cart, quote) = state.checkout.quote(session.user.id).await?;
    Ok(Json(json!({ "cart": cart, "quote": quote })))
}

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    product_id: ProductId,
    quantity: i64,
}

async fn add_cart_item_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<Value>> {
    let cart = state
        .store
        .add_cart_item(session.user.id, req.product_id, req.quantity)
        .await?;
    Ok(Json(json!({ "cart": cart })))
}

#[derive(Debug, Deserialize)]
struct QuantityRequest {
    quantity: i64,
}

async fn set_cart_quantity_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Path(product_id): Path<String>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<Value>> {
    let product_id = ProductId::from_string(&product_id)?;
    let cart = state
        .store
        .set_cart_quantity(session.user.id, product_id, req.quantity)
        .await?;
    Ok(Json(json!({ "cart": cart })))
}

async fn remove_cart_item_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Path(product_id): Path<String>,
) -> Result<Json<Value>> {
    let product_id = ProductId::from_string(&product_id)?;
    let cart = state
        .store
        .remove_cart_item(session.user.id, product_id)
        .await?;
    Ok(Json(json!({ "cart": cart })))
}

#[derive(Debug, Deserialize)]
struct RedeemRequest {
    points: i64,
}

async fn redeem_points_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<Value>> {
    let discount = state
        .store
        .redeem_points_to_cart(
            session.user.id,
            req.points,
            state.config.loyalty.points_per_currency_unit,
        )
        .await?;
    let (cart, quote) = state.checkout.quote(session.user.id).await?;
    Ok(Json(json!({ "discount": discount, "cart": cart, "quote": quote })))
}

async fn cancel_discount_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Path(discount_id): Path<i64>,
) -> Result<Json<Value>> {
    state
        .store
        .cancel_cart_discount(session.user.id, discount_id)
        .await?;
    let (cart, quote) = state.checkout.quote(session.user.id).await?;
    Ok(Json(json!({ "cart": cart, "quote": quote })))
}

async fn quote_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    let (_, quote) = state.checkout.quote(session.user.id).await?;
    Ok(Json(json!({ "quote": quote })))
}

// -- checkout and orders ----------------------------------------------------

async fn checkout_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Json(shipping): Json<ShippingDetails>,
) -> Result<Json<Value>> {
    let order = state.checkout.place_order(session.user.id, shipping).await?;
    let items = state.store.order_items(order.id).await?;
    Ok(Json(json!({ "order": order, "items": items })))
}

async fn list_orders_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    let orders = state.store.list_orders_for_user(session.user.id).await?;
    Ok(Json(json!({ "orders": orders })))
}

async fn get_order_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let order_id = crate::types::OrderId::from_string(&id)?;
    let order = state
        .store
        .get_order_for_user(order_id, session.user.id)
        .await?;
    let items = state.store.order_items(order.id).await?;
    Ok(Json(json!({ "order": order, "items": items })))
}

// -- loyalty ----------------------------------------------------------------

async fn loyalty_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    let account = state.store.get_loyalty_account(session.user.id).await?;
    let to_next = crate::services::loyalty::points_to_next_tier(account.lifetime_points);
    Ok(Json(json!({
        "account": account,
        "points_to_next_tier": to_next,
    })))
}

async fn loyalty_transactions_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    let transactions = state
        .store
        .list_loyalty_transactions(session.user.id, 50)
        .await?;
    Ok(Json(json!({ "transactions": transactions })))
}

// -- profile and prediction -------------------------------------------------

async fn get_profile_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    let profile = state.store.get_profile(session.user.id).await?;
    Ok(Json(json!({ "profile": profile })))
}

async fn update_profile_handler(
    State(state): State<AppState>,
    session: AuthSession,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Value>> {
    let profile = state.store.update_profile(session.user.id, &update).await?;
    Ok(Json(json!({ "profile": profile })))
}

/// Predict the user's preferred category and persist both the prediction
/// record and the profile's cached prediction
async fn predict_handler(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<Value>> {
    let profile = state.store.get_profile(session.user.id).await?;
    let prediction = state.predictor.predict(&profile);

    let category = state
        .store
        .get_category_by_name(&prediction.category_name)
        .await?;
    let record = state
        .store
        .record_prediction(
            session.user.id,
            category.id,
            prediction.confidence,
            &prediction.model_version,
            prediction.fallback,
        )
        .await?;
    state
        .store
        .set_profile_prediction(session.user.id, category.id, prediction.confidence)
        .await?;

    Ok(Json(json!({
        "prediction": prediction,
        "category": category,
        "record_id": record.id,
    })))
}

// -- health -----------------------------------------------------------------

async fn health_handler(State(state): State<AppState>) -> Result<Json<Value>> {
    // A trivial query proves the pool is alive
    sqlx::query("SELECT 1").execute(state.store.pool()).await?;
    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
