//! Core data types for the AuroraMart backend
//!
//! This module defines the fundamental data structures used throughout the
//! crate: catalog entities, carts and orders, loyalty accounts, demographic
//! profiles, and the derived prediction/association artifacts. Monetary
//! amounts are integer minor units (cents) everywhere so that the staged
//! rounding in checkout is exact and reproducible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an identifier from a string
            pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for users
    UserId
}
uuid_id! {
    /// Unique identifier for products
    ProductId
}
uuid_id! {
    /// Unique identifier for orders
    OrderId
}
uuid_id! {
    /// Unique identifier for loyalty ledger entries
    TransactionId
}
uuid_id! {
    /// Unique identifier for prediction records
    PredictionId
}

/// Row identifier for categories (small, DB-assigned)
pub type CategoryId = i64;
/// Row identifier for brands (small, DB-assigned)
pub type BrandId = i64;

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Product category; `parent_id` gives a two-level hierarchy
/// (category -> subcategory). Top-level names are the prediction label space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub sort_order: i64,
    pub is_active: bool,
}

impl Category {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Product brand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

/// Main product entity. Stock is mutated only by order placement and by
/// admin stock adjustment; never by the prediction/association components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price_cents: i64,
    pub discount_price_cents: Option<i64>,
    pub category_id: CategoryId,
    pub subcategory_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub stock_quantity: i64,
    pub reorder_threshold: i64,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Effective unit price: discount price when set, regular price otherwise
    pub fn current_price_cents(&self) -> i64 {
        self.discount_price_cents.unwrap_or(self.price_cents)
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    pub fn needs_reorder(&self) -> bool {
        self.stock_quantity <= self.reorder_threshold
    }
}

// ---------------------------------------------------------------------------
// Users, roles, profiles
// ---------------------------------------------------------------------------

/// Account role; determines which capabilities a session carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Staff,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Role::Customer),
            "staff" => Some(Role::Staff),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A registered user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Declared gender on a profile; feeds the one-hot encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Training-time label; must match the model artifact's column names
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Male" => Some(Gender::Male),
            "Female" => Some(Gender::Female),
            "Other" => Some(Gender::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    FullTime,
    PartTime,
    SelfEmployed,
    Student,
    Retired,
    Unemployed,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::FullTime => "Full-time",
            EmploymentStatus::PartTime => "Part-time",
            EmploymentStatus::SelfEmployed => "Self-employed",
            EmploymentStatus::Student => "Student",
            EmploymentStatus::Retired => "Retired",
            EmploymentStatus::Unemployed => "Unemployed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Full-time" => Some(EmploymentStatus::FullTime),
            "Part-time" => Some(EmploymentStatus::PartTime),
            "Self-employed" => Some(EmploymentStatus::SelfEmployed),
            "Student" => Some(EmploymentStatus::Student),
            "Retired" => Some(EmploymentStatus::Retired),
            "Unemployed" => Some(EmploymentStatus::Unemployed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupation {
    Tech,
    Sales,
    Service,
    Admin,
    Education,
    SkilledTrades,
    Other,
}

impl Occupation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Occupation::Tech => "Tech",
            Occupation::Sales => "Sales",
            Occupation::Service => "Service",
            Occupation::Admin => "Admin",
            Occupation::Education => "Education",
            Occupation::SkilledTrades => "Skilled Trades",
            Occupation::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Tech" => Some(Occupation::Tech),
            "Sales" => Some(Occupation::Sales),
            "Service" => Some(Occupation::Service),
            "Admin" => Some(Occupation::Admin),
            "Education" => Some(Occupation::Education),
            "Skilled Trades" => Some(Occupation::SkilledTrades),
            "Other" => Some(Occupation::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Education {
    Secondary,
    Diploma,
    Bachelor,
    Master,
    Doctorate,
}

impl Education {
    pub fn as_str(&self) -> &'static str {
        match self {
            Education::Secondary => "Secondary",
            Education::Diploma => "Diploma",
            Education::Bachelor => "Bachelor",
            Education::Master => "Master",
            Education::Doctorate => "Doctorate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Secondary" => Some(Education::Secondary),
            "Diploma" => Some(Education::Diploma),
            "Bachelor" => Some(Education::Bachelor),
            "Master" => Some(Education::Master),
            "Doctorate" => Some(Education::Doctorate),
            _ => None,
        }
    }
}

/// Declared income band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeRange {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl IncomeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeRange::Low => "low",
            IncomeRange::Medium => "medium",
            IncomeRange::High => "high",
            IncomeRange::VeryHigh => "very_high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(IncomeRange::Low),
            "medium" => Some(IncomeRange::Medium),
            "high" => Some(IncomeRange::High),
            "very_high" => Some(IncomeRange::VeryHigh),
            _ => None,
        }
    }
}

/// Demographic profile; the feature source for the prediction service.
/// Created explicitly inside the registration transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    pub employment_status: Option<EmploymentStatus>,
    pub occupation: Option<Occupation>,
    pub education: Option<Education>,
    pub income_range: Option<IncomeRange>,
    pub household_size: i64,
    pub has_children: bool,
    pub monthly_income_cents: Option<i64>,
    pub predicted_category_id: Option<CategoryId>,
    pub prediction_confidence: Option<f64>,
    pub prediction_updated_at: Option<DateTime<Utc>>,
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Fields the classifier requires; anything missing triggers the
    /// population-level fallback prediction instead of an error
    pub fn demographics_complete(&self) -> bool {
        self.age.is_some()
            && self.gender.is_some()
            && self.occupation.is_some()
            && self.education.is_some()
    }
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

/// One product line in a cart, joined with its product row
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: i64,
}

impl CartLine {
    pub fn line_total_cents(&self) -> i64 {
        self.product.current_price_cents() * self.quantity
    }
}

/// Kind of discount applied to a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    LoyaltyPoints,
    PromoCode,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::LoyaltyPoints => "loyalty_points",
            DiscountKind::PromoCode => "promo_code",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "loyalty_points" => Some(DiscountKind::LoyaltyPoints),
            "promo_code" => Some(DiscountKind::PromoCode),
            _ => None,
        }
    }
}

/// A discount row attached to a cart. Loyalty discounts are written in the
/// same transaction that debits the point balance.
#[derive(Debug, Clone, Serialize)]
pub struct CartDiscount {
    pub id: i64,
    pub kind: DiscountKind,
    pub amount_cents: i64,
    pub points_used: i64,
    pub description: String,
    pub applied_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order life cycle. Orders are immutable once placed except for these
/// transitions; cancellation is only allowed before shipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Returned,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Returned => "returned",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "returned" => Some(OrderStatus::Returned),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Returned)
        )
    }

    /// Terminal states never accrue further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Returned | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipping destination captured at checkout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub name: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub country: String,
    pub phone: Option<String>,
}

/// Priced cart breakdown; every stage already rounded to cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
}

/// A placed order
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub shipping: ShippingDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Line item within an order; unit price is snapshotted at purchase time.
/// These rows are the input corpus for association mining.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub price_cents_at_purchase: i64,
}

impl OrderItem {
    pub fn line_total_cents(&self) -> i64 {
        self.price_cents_at_purchase * self.quantity
    }
}

// ---------------------------------------------------------------------------
// Loyalty
// ---------------------------------------------------------------------------

/// Loyalty tier, a pure function of lifetime accrued points.
/// Never lowered by spending points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoyaltyTier::Bronze => "bronze",
            LoyaltyTier::Silver => "silver",
            LoyaltyTier::Gold => "gold",
            LoyaltyTier::Platinum => "platinum",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bronze" => Some(LoyaltyTier::Bronze),
            "silver" => Some(LoyaltyTier::Silver),
            "gold" => Some(LoyaltyTier::Gold),
            "platinum" => Some(LoyaltyTier::Platinum),
            _ => None,
        }
    }
}

/// Customer loyalty account; balance is never negative by construction
/// (guarded updates at the storage layer)
#[derive(Debug, Clone, Serialize)]
pub struct LoyaltyAccount {
    pub user_id: UserId,
    pub points_balance: i64,
    pub lifetime_points: i64,
    pub tier: LoyaltyTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoyaltyTransactionKind {
    Earned,
    Redeemed,
    Adjusted,
}

impl LoyaltyTransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoyaltyTransactionKind::Earned => "earned",
            LoyaltyTransactionKind::Redeemed => "redeemed",
            LoyaltyTransactionKind::Adjusted => "adjusted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "earned" => Some(LoyaltyTransactionKind::Earned),
            "redeemed" => Some(LoyaltyTransactionKind::Redeemed),
            "adjusted" => Some(LoyaltyTransactionKind::Adjusted),
            _ => None,
        }
    }
}

/// One row of the append-only loyalty ledger.
/// `points` is positive for accruals and negative for redemptions.
#[derive(Debug, Clone, Serialize)]
pub struct LoyaltyTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub points: i64,
    pub kind: LoyaltyTransactionKind,
    pub order_id: Option<OrderId>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Derived artifacts: association rules and prediction records
// ---------------------------------------------------------------------------

/// A mined antecedent -> consequent pair with its statistics.
/// Read-only between regeneration runs; regeneration fully replaces the set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationRule {
    pub antecedent_product_id: ProductId,
    pub consequent_product_id: ProductId,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub generation: i64,
}

/// A recommendation produced from the rule table
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub product: Product,
    pub confidence: f64,
    pub support: f64,
}

/// A recorded user -> category prediction. `correct` is set later when
/// actual purchase behavior is observed; used only for offline accuracy
/// reporting, no runtime feedback loop.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionRecord {
    pub id: PredictionId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub confidence: f64,
    pub model_version: String,
    pub fallback: bool,
    pub correct: Option<bool>,
    pub created_at: DateTime<Utc>,
}
