/// Authentication extractors and utilities
use crate::{
    account::ValidatedSession,
    api::middleware::extract_bearer_token,
    context::AppContext,
    error::QueueError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated context - extracts and validates the session token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: String,
    pub session: ValidatedSession,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.session.role.is_admin()
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = QueueError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            QueueError::Authentication("Missing authorization header".to_string())
        })?;

        let session = state.account_manager.validate_token(&token).await?;
        let account_id = session.account_id.clone();

        Ok(AuthContext {
            account_id,
            session,
        })
    }
}

/// Same as AuthContext but rejects sessions without the admin role
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub account_id: String,
    pub session: ValidatedSession,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = QueueError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthContext {
            account_id,
            session,
        } = AuthContext::from_request_parts(parts, state).await?;

        if !session.role.is_admin() {
            tracing::warn!("Account {} attempted an admin endpoint", account_id);
            return Err(QueueError::Authorization(
                "Admin role required".to_string(),
            ));
        }

        Ok(AdminAuthContext {
            account_id,
            session,
        })
    }
}
