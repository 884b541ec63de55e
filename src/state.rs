use std::sync::Arc;
use crate::config::Config;
use crate::services::{KvStore, OvertimeStore};

// Application state that can be shared between handlers
#[derive(Clone)]
pub struct AppState {
    pub store: OvertimeStore,
    pub config: Config,
}

impl AppState {
    pub fn new(kv: Arc<dyn KvStore>, config: Config) -> Self {
        Self {
            store: OvertimeStore::new(kv, config.auth.token_ttl()),
            config,
        }
    }
}
