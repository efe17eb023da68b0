// Public API for integration tests and the terminal frontend

pub mod assign;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod gesture;
pub mod reconcile;
pub mod reveal;
pub mod session;
pub mod store;
pub mod types;
