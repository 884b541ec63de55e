//! Client half of the sync protocol: the HTTP API wrapper, the on-disk
//! cache and the session object that ties them together.
mod api;
mod local_store;
mod tracker;

pub use api::ApiClient;
pub use local_store::{LocalStore, Session};
pub use tracker::{OvertimeTracker, SkipReason, SyncOutcome, SyncStatus};
