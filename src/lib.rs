pub mod app;
pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use app::router;
pub use config::{ClientConfig, Config};
pub use state::AppState;
