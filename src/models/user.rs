use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Stored under `user:<username>`; never updated after registration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub password_hash: String,  // bcrypt, salt included
    pub created_at: DateTime<Utc>,
}

/// Identity the client keeps in its local cache.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub username: String,
}
