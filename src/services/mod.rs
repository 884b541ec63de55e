mod kv;
mod redis_service;
mod overtime_store;
pub mod credentials;

pub use kv::{KvStore, MemoryStore};
pub use redis_service::RedisService;
pub use overtime_store::OvertimeStore;
