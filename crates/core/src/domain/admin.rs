use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Three-tier permission model for the slash-command surface.
///
/// The order is total: VIEWER < EDITOR < ADMIN, expressed through an explicit
/// numeric rank rather than enum declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Viewer,
    Editor,
    Admin,
}

impl Permission {
    pub fn rank(&self) -> u8 {
        match self {
            Self::Viewer => 0,
            Self::Editor => 1,
            Self::Admin => 2,
        }
    }

    pub fn allows(&self, required: Permission) -> bool {
        self.rank() >= required.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Editor => "editor",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError::PermissionLevel(other.to_owned())),
        }
    }
}

/// One row per external Slack user id; a user without a row has an implicit
/// VIEWER level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub user_id: String,
    pub username: String,
    pub permission: Permission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AdminUser {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        permission: Permission,
    ) -> Result<Self, ValidationError> {
        let user_id = user_id.into();
        let username = username.into();
        if user_id.trim().is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        if username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        Ok(Self { user_id, username, permission, created_at: None, updated_at: None })
    }

    pub fn has_permission(&self, required: Permission) -> bool {
        self.permission.allows(required)
    }
}
