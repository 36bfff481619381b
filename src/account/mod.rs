/// Account management system
///
/// Handles applicant registration, authentication, sessions, profile
/// updates, and password reset.

mod manager;

pub use manager::AccountManager;

use crate::db::models::Account;
use crate::error::{QueueError, QueueResult};
use serde::{Deserialize, Serialize};

/// Account role levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Prospective student
    Applicant,
    /// Parent or guardian acting for an applicant
    Parent,
    /// Admissions office staff
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Applicant => "applicant",
            Role::Parent => "parent",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> QueueResult<Self> {
        match s.to_lowercase().as_str() {
            "applicant" => Ok(Role::Applicant),
            "parent" => Ok(Role::Parent),
            "admin" => Ok(Role::Admin),
            _ => Err(QueueError::Validation(format!("Invalid role: {}", s))),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    /// "applicant" or "parent"; admin is granted by configuration only
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Authentication response: session token plus the user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub avatar: Option<String>,
}

impl From<&Account> for UserProfile {
    fn from(account: &Account) -> Self {
        UserProfile {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            role: account.role.clone(),
            avatar: account.avatar.clone(),
        }
    }
}

/// Profile update request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

/// Password reset request (step 1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Password reset request (step 2)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Validated session from bearer token
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub account_id: String,
    pub session_id: String,
    pub role: Role,
}
