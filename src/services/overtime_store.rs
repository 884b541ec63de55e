use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use crate::errors::store::{StoreError, StoreResult};
use crate::models::User;
use crate::services::KvStore;

/// Typed access to the three record kinds the API keeps:
/// `user:<username>`, `token:<token>` and `data:<username>`.
#[derive(Clone)]
pub struct OvertimeStore {
    kv: Arc<dyn KvStore>,
    token_ttl: Duration,
}

impl OvertimeStore {
    pub fn new(kv: Arc<dyn KvStore>, token_ttl: Duration) -> Self {
        Self { kv, token_ttl }
    }

    pub async fn get_user(&self, username: &str) -> StoreResult<Option<User>> {
        let key = user_key(username);
        match self.kv.get(&key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreError::Corrupt { key, source }),
            None => Ok(None),
        }
    }

    pub async fn save_user(&self, user: &User) -> StoreResult<()> {
        let raw = serde_json::to_string(user)?;
        self.kv.put(&user_key(&user.username), &raw).await
    }

    pub async fn save_token(&self, token: &str, username: &str) -> StoreResult<()> {
        self.kv
            .put_with_ttl(&token_key(token), username, self.token_ttl)
            .await
    }

    /// Owner of a live token; expired and unknown tokens both yield `None`.
    pub async fn username_for_token(&self, token: &str) -> StoreResult<Option<String>> {
        self.kv.get(&token_key(token)).await
    }

    /// The user's dataset exactly as last saved, or an empty object.
    pub async fn get_data(&self, username: &str) -> StoreResult<Value> {
        let key = data_key(username);
        match self.kv.get(&key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt { key, source }),
            None => Ok(Value::Object(Map::new())),
        }
    }

    pub async fn save_data(&self, username: &str, data: &Value) -> StoreResult<()> {
        let raw = serde_json::to_string(data)?;
        self.kv.put(&data_key(username), &raw).await
    }
}

fn user_key(username: &str) -> String {
    format!("user:{}", username)
}

fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

fn data_key(username: &str) -> String {
    format!("data:{}", username)
}
