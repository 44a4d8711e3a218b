//! User accounts, sessions, and demographic profiles
//!
//! Registration is one explicit transaction that creates the user row, an
//! empty demographic profile, and a loyalty account together. There are no
//! implicit creation hooks anywhere else in the crate.

use crate::error::{FieldError, Result, StoreError};
use crate::storage::SqliteStore;
use crate::types::{
    Education, EmploymentStatus, Gender, IncomeRange, Occupation, Role, User, UserId, UserProfile,
};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

/// Input for account registration
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Partial demographic update submitted by the customer
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ProfileUpdate {
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    pub employment_status: Option<EmploymentStatus>,
    pub occupation: Option<Occupation>,
    pub education: Option<Education>,
    pub income_range: Option<IncomeRange>,
    pub household_size: Option<i64>,
    pub has_children: Option<bool>,
    pub monthly_income_cents: Option<i64>,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    let id_str: String = row.try_get("id")?;
    let role_str: String = row.try_get("role")?;
    Ok(User {
        id: UserId::from_string(&id_str)?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        role: Role::parse(&role_str)
            .ok_or_else(|| StoreError::Other(format!("unknown role '{}'", role_str)))?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_profile(row: &SqliteRow) -> Result<UserProfile> {
    let user_id_str: String = row.try_get("user_id")?;
    let gender: Option<String> = row.try_get("gender")?;
    let employment: Option<String> = row.try_get("employment_status")?;
    let occupation: Option<String> = row.try_get("occupation")?;
    let education: Option<String> = row.try_get("education")?;
    let income: Option<String> = row.try_get("income_range")?;

    Ok(UserProfile {
        user_id: UserId::from_string(&user_id_str)?,
        age: row.try_get("age")?,
        gender: gender.as_deref().and_then(Gender::parse),
        employment_status: employment.as_deref().and_then(EmploymentStatus::parse),
        occupation: occupation.as_deref().and_then(Occupation::parse),
        education: education.as_deref().and_then(Education::parse),
        income_range: income.as_deref().and_then(IncomeRange::parse),
        household_size: row.try_get("household_size")?,
        has_children: row.try_get("has_children")?,
        monthly_income_cents: row.try_get("monthly_income_cents")?,
        predicted_category_id: row.try_get("predicted_category_id")?,
        prediction_confidence: row.try_get("prediction_confidence")?,
        prediction_updated_at: row.try_get("prediction_updated_at")?,
        onboarding_complete: row.try_get("onboarding_complete")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl SqliteStore {
    /// Register a new account: user + profile + loyalty account in one
    /// transaction. Either all three rows exist afterwards or none do.
    pub async fn register_user(&self, new: &NewUser) -> Result<User> {
        let mut errors = Vec::new();
        if new.username.trim().is_empty() {
            errors.push(FieldError::new("username", "must not be empty"));
        }
        if new.password.len() < 8 {
            errors.push(FieldError::new("password", "must be at least 8 characters"));
        }
        if !new.email.contains('@') {
            errors.push(FieldError::new("email", "must be a valid email address"));
        }
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        let id = UserId::new();
        let role = new.role.unwrap_or(Role::Customer);
        let salt = Uuid::new_v4().to_string();
        let password_hash = hash_password(&salt, &new.password);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, salt, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&new.username)
        .bind(&new.email)
        .bind(&password_hash)
        .bind(&salt)
        .bind(role.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            return Err(match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    StoreError::AlreadyExists(format!("username '{}'", new.username))
                }
                other => other.into(),
            });
        }

        // Explicit post-registration steps, same transaction (no hooks)
        sqlx::query(
            "INSERT INTO user_profiles (user_id, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO loyalty_accounts (user_id, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("registered user '{}' ({})", new.username, id);

        Ok(User {
            id,
            username: new.username.clone(),
            email: new.email.clone(),
            role,
            created_at: now,
        })
    }

    pub async fn get_user(&self, id: UserId) -> Result<User> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?;
        row_to_user(&row)
    }

    /// Verify credentials; any mismatch is plain Unauthorized
    pub async fn verify_login(&self, username: &str, password: &str) -> Result<User> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::Unauthorized)?;

        let salt: String = row.try_get("salt")?;
        let stored: String = row.try_get("password_hash")?;
        if hash_password(&salt, password) != stored {
            return Err(StoreError::Unauthorized);
        }
        row_to_user(&row)
    }

    // -- sessions -----------------------------------------------------------

    pub async fn create_session(&self, user_id: UserId, ttl_hours: i64) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id.to_string())
        .bind(now)
        .bind(now + Duration::hours(ttl_hours))
        .execute(&self.pool)
        .await?;

        debug!("session created for user {}", user_id);
        Ok(token)
    }

    /// Resolve a bearer token to its user; expired or unknown tokens are
    /// Unauthorized
    pub async fn session_user(&self, token: &str) -> Result<User> {
        let row = sqlx::query(
            "SELECT u.* FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = ? AND s.expires_at > ?",
        )
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::Unauthorized)?;
        row_to_user(&row)
    }

    pub async fn delete_session(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // -- profiles -----------------------------------------------------------

    pub async fn get_profile(&self, user_id: UserId) -> Result<UserProfile> {
        let row = sqlx::query("SELECT * FROM user_profiles WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("profile for user {}", user_id)))?;
        row_to_profile(&row)
    }

    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<UserProfile> {
        let mut profile = self.get_profile(user_id).await?;

        if let Some(age) = update.age {
            if !(13..=120).contains(&age) {
                return Err(StoreError::Validation(vec![FieldError::new(
                    "age",
                    "must be between 13 and 120",
                )]));
            }
            profile.age = Some(age);
        }
        if let Some(gender) = update.gender {
            profile.gender = Some(gender);
        }
        if let Some(status) = update.employment_status {
            profile.employment_status = Some(status);
        }
        if let Some(occupation) = update.occupation {
            profile.occupation = Some(occupation);
        }
        if let Some(education) = update.education {
            profile.education = Some(education);
        }
        if let Some(income_range) = update.income_range {
            profile.income_range = Some(income_range);
        }
        if let Some(size) = update.household_size {
            if size < 1 {
                return Err(StoreError::Validation(vec![FieldError::new(
                    "household_size",
                    "must be at least 1",
                )]));
            }
            profile.household_size = size;
        }
        if let Some(has_children) = update.has_children {
            profile.has_children = has_children;
        }
        if let Some(income) = update.monthly_income_cents {
            profile.monthly_income_cents = Some(income);
        }

        profile.onboarding_complete = profile.demographics_complete();
        let now = Utc::now();

        sqlx::query(
            "UPDATE user_profiles SET
               age = ?, gender = ?, employment_status = ?, occupation = ?, education = ?,
               income_range = ?, household_size = ?, has_children = ?, monthly_income_cents = ?,
               onboarding_complete = ?, updated_at = ?
             WHERE user_id = ?",
        )
        .bind(profile.age)
        .bind(profile.gender.map(|g| g.as_str()))
        .bind(profile.employment_status.map(|e| e.as_str()))
        .bind(profile.occupation.map(|o| o.as_str()))
        .bind(profile.education.map(|e| e.as_str()))
        .bind(profile.income_range.map(|i| i.as_str()))
        .bind(profile.household_size)
        .bind(profile.has_children)
        .bind(profile.monthly_income_cents)
        .bind(profile.onboarding_complete)
        .bind(now)
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        profile.updated_at = now;
        Ok(profile)
    }

    /// Store the served prediction on the profile for display
    pub async fn set_profile_prediction(
        &self,
        user_id: UserId,
        category_id: i64,
        confidence: f64,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE user_profiles SET
               predicted_category_id = ?, prediction_confidence = ?,
               prediction_updated_at = ?, updated_at = ?
             WHERE user_id = ?",
        )
        .bind(category_id)
        .bind(confidence)
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("profile for user {}", user_id)));
        }
        Ok(())
    }
}
