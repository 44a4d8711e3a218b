//! Session authentication and capability checks
//!
//! Authorization is an explicit function call, not an ambient decorator:
//! handlers name the capability they need and check it at the top. The
//! role-to-capability mapping lives in exactly one place here.

use super::state::AppState;
use crate::error::{Result, StoreError};
use crate::types::{Role, User};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

/// Things a request can be allowed to do beyond its own account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create and edit categories, brands, products, and stock
    ManageCatalog,
    /// View all orders and drive status transitions
    ManageOrders,
    /// Dashboard metrics and reports
    ViewReports,
    /// Reload the prediction model and trigger rule mining
    ManageModel,
}

/// The single role-to-capability mapping
pub fn allows(role: Role, capability: Capability) -> bool {
    match capability {
        Capability::ManageCatalog | Capability::ManageOrders => matches!(
            role,
            Role::Staff | Role::Manager | Role::Admin
        ),
        Capability::ViewReports => matches!(role, Role::Manager | Role::Admin),
        Capability::ManageModel => matches!(role, Role::Admin),
    }
}

/// An authenticated request: the session token plus the user it belongs to
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

impl AuthSession {
    /// Fail with Forbidden unless the session's role has the capability
    pub fn require(&self, capability: Capability) -> Result<()> {
        if allows(self.user.role, capability) {
            Ok(())
        } else {
            debug!(
                "user {} ({}) denied {:?}",
                self.user.username,
                self.user.role.as_str(),
                capability
            );
            Err(StoreError::Forbidden(format!(
                "role '{}' cannot perform this action",
                self.user.role.as_str()
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = StoreError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(StoreError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(StoreError::Unauthorized)?
            .trim();
        if token.is_empty() {
            return Err(StoreError::Unauthorized);
        }

        let user = state.store.session_user(token).await?;
        Ok(AuthSession {
            user,
            token: token.to_string(),
        })
    }
}
