use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

pub type OwnerId = i64;

/// Username of the owner created together with a fresh database.
pub const DEFAULT_OWNER: &str = "demo";

/// The key every transaction is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Trim a username and make sure something is left.
pub fn normalize_username(username: &str) -> Result<String, ValidationError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    Ok(username.to_string())
}
