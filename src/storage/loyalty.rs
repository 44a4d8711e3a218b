//! Loyalty ledger storage
//!
//! The point balance is only ever mutated through guarded UPDATEs, so it can
//! never go negative even under concurrent redemption attempts. Redemption
//! and the resulting cart discount are one transaction; accrual happens
//! inside the order placement transaction (see `orders.rs`).

use crate::error::{FieldError, Result, StoreError};
use crate::services::loyalty::{points_to_cents, tier_for_lifetime};
use crate::storage::SqliteStore;
use crate::types::{
    CartDiscount, DiscountKind, LoyaltyAccount, LoyaltyTier, LoyaltyTransaction,
    LoyaltyTransactionKind, OrderId, TransactionId, UserId,
};
use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, info};

/// Aggregate numbers for the admin dashboard
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoyaltyStats {
    pub total_accounts: i64,
    pub total_points_outstanding: i64,
    pub total_lifetime_points: i64,
    pub accounts_by_tier: Vec<(String, i64)>,
}

impl SqliteStore {
    pub async fn get_loyalty_account(&self, user_id: UserId) -> Result<LoyaltyAccount> {
        let row = sqlx::query("SELECT * FROM loyalty_accounts WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("loyalty account for user {}", user_id)))?;

        let tier_str: String = row.try_get("tier")?;
        Ok(LoyaltyAccount {
            user_id,
            points_balance: row.try_get("points_balance")?,
            lifetime_points: row.try_get("lifetime_points")?,
            tier: LoyaltyTier::parse(&tier_str)
                .ok_or_else(|| StoreError::Other(format!("unknown tier '{}'", tier_str)))?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Redeem points into a cart discount: the balance debit, the ledger row,
    /// and the discount row commit together or not at all. A request
    /// exceeding the balance is rejected with no state change.
    pub async fn redeem_points_to_cart(
        &self,
        user_id: UserId,
        points: i64,
        points_per_currency_unit: i64,
    ) -> Result<CartDiscount> {
        if points <= 0 {
            return Err(StoreError::Validation(vec![FieldError::new(
                "points",
                "must be positive",
            )]));
        }
        let amount_cents = points_to_cents(points, points_per_currency_unit);
        if amount_cents == 0 {
            return Err(StoreError::Validation(vec![FieldError::new(
                "points",
                format!("fewer than {} points convert to nothing", points_per_currency_unit / 100),
            )]));
        }

        let cart_id = self.get_or_create_cart_id(user_id).await?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let debited = sqlx::query(
            "UPDATE loyalty_accounts
             SET points_balance = points_balance - ?, updated_at = ?
             WHERE user_id = ? AND points_balance >= ?",
        )
        .bind(points)
        .bind(now)
        .bind(user_id.to_string())
        .bind(points)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            // Roll back and report how far short the balance is
            drop(tx);
            let account = self.get_loyalty_account(user_id).await?;
            return Err(StoreError::InsufficientPoints {
                requested: points,
                balance: account.points_balance,
            });
        }

        let description = format!("Redeemed {} points", points);
        sqlx::query(
            "INSERT INTO loyalty_transactions (id, user_id, points, kind, order_id, description, created_at)
             VALUES (?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(TransactionId::new().to_string())
        .bind(user_id.to_string())
        .bind(-points)
        .bind(LoyaltyTransactionKind::Redeemed.as_str())
        .bind(&description)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let discount_id = sqlx::query(
            "INSERT INTO cart_discounts (cart_id, kind, amount_cents, points_used, description, applied_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(cart_id)
        .bind(DiscountKind::LoyaltyPoints.as_str())
        .bind(amount_cents)
        .bind(points)
        .bind(&description)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;
        info!(
            "user {} redeemed {} points for {} cents off",
            user_id, points, amount_cents
        );

        Ok(CartDiscount {
            id: discount_id,
            kind: DiscountKind::LoyaltyPoints,
            amount_cents,
            points_used: points,
            description,
            applied_at: now,
        })
    }

    /// Remove a cart discount; loyalty-point discounts refund the points
    /// in the same transaction
    pub async fn cancel_cart_discount(&self, user_id: UserId, discount_id: i64) -> Result<()> {
        let cart_id = self.get_or_create_cart_id(user_id).await?;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT kind, points_used FROM cart_discounts WHERE id = ? AND cart_id = ?",
        )
        .bind(discount_id)
        .bind(cart_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("cart discount {}", discount_id)))?;

        let kind: String = row.try_get("kind")?;
        let points_used: i64 = row.try_get("points_used")?;
        let now = Utc::now();

        sqlx::query("DELETE FROM cart_discounts WHERE id = ?")
            .bind(discount_id)
            .execute(&mut *tx)
            .await?;

        if kind == DiscountKind::LoyaltyPoints.as_str() && points_used > 0 {
            sqlx::query(
                "UPDATE loyalty_accounts
                 SET points_balance = points_balance + ?, updated_at = ?
                 WHERE user_id = ?",
            )
            .bind(points_used)
            .bind(now)
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO loyalty_transactions (id, user_id, points, kind, order_id, description, created_at)
                 VALUES (?, ?, ?, ?, NULL, ?, ?)",
            )
            .bind(TransactionId::new().to_string())
            .bind(user_id.to_string())
            .bind(points_used)
            .bind(LoyaltyTransactionKind::Adjusted.as_str())
            .bind("Cancelled redemption")
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("discount {} removed for user {}", discount_id, user_id);
        Ok(())
    }

    /// Accrue points inside an order placement transaction and recompute the
    /// tier from lifetime points. Tier never moves down here: lifetime only
    /// grows, and the thresholds are monotonic.
    pub(crate) async fn accrue_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        user_id: UserId,
        points: i64,
        order_id: OrderId,
    ) -> Result<()> {
        if points <= 0 {
            return Ok(());
        }
        let now = Utc::now();

        let row = sqlx::query(
            "UPDATE loyalty_accounts
             SET points_balance = points_balance + ?,
                 lifetime_points = lifetime_points + ?,
                 updated_at = ?
             WHERE user_id = ?
             RETURNING lifetime_points",
        )
        .bind(points)
        .bind(points)
        .bind(now)
        .bind(user_id.to_string())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("loyalty account for user {}", user_id)))?;

        let lifetime: i64 = row.try_get("lifetime_points")?;
        let tier = tier_for_lifetime(lifetime);
        sqlx::query("UPDATE loyalty_accounts SET tier = ? WHERE user_id = ?")
            .bind(tier.as_str())
            .bind(user_id.to_string())
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            "INSERT INTO loyalty_transactions (id, user_id, points, kind, order_id, description, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(TransactionId::new().to_string())
        .bind(user_id.to_string())
        .bind(points)
        .bind(LoyaltyTransactionKind::Earned.as_str())
        .bind(order_id.to_string())
        .bind(format!("Purchase points for order {}", order_id))
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn list_loyalty_transactions(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<LoyaltyTransaction>> {
        let rows = sqlx::query(
            "SELECT * FROM loyalty_transactions
             WHERE user_id = ?
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(user_id.to_string())
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id_str: String = row.try_get("id")?;
                let kind_str: String = row.try_get("kind")?;
                let order_id: Option<String> = row.try_get("order_id")?;
                Ok(LoyaltyTransaction {
                    id: TransactionId::from_string(&id_str)?,
                    user_id,
                    points: row.try_get("points")?,
                    kind: LoyaltyTransactionKind::parse(&kind_str).ok_or_else(|| {
                        StoreError::Other(format!("unknown transaction kind '{}'", kind_str))
                    })?,
                    order_id: order_id.as_deref().map(OrderId::from_string).transpose()?,
                    description: row.try_get("description")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    pub async fn loyalty_stats(&self) -> Result<LoyaltyStats> {
        let totals = sqlx::query(
            "SELECT COUNT(*) AS accounts,
                    COALESCE(SUM(points_balance), 0) AS outstanding,
                    COALESCE(SUM(lifetime_points), 0) AS lifetime
             FROM loyalty_accounts",
        )
        .fetch_one(&self.pool)
        .await?;

        let tier_rows = sqlx::query(
            "SELECT tier, COUNT(*) AS n FROM loyalty_accounts GROUP BY tier ORDER BY n DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut accounts_by_tier = Vec::with_capacity(tier_rows.len());
        for row in &tier_rows {
            accounts_by_tier.push((row.try_get::<String, _>("tier")?, row.try_get("n")?));
        }

        Ok(LoyaltyStats {
            total_accounts: totals.try_get("accounts")?,
            total_points_outstanding: totals.try_get("outstanding")?,
            total_lifetime_points: totals.try_get("lifetime")?,
            accounts_by_tier,
        })
    }
}
