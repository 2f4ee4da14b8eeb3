use chrono::{DateTime, Utc};
use fennec_core::BindValue;
use serde::{Deserialize, Serialize};

/// Account state. Binds from `active`, `Inactive`, `2`, ...
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, BindValue)]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

/// A user as stored and returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub age: Option<u32>,
    pub phone_number: Option<String>,
    pub status: UserStatus,
    /// Why the status last changed, if a reason was given.
    pub status_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
