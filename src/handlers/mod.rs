mod auth;
mod data;

pub use auth::{handle_login, handle_register};
pub use data::{get_data, not_found, save_data};
