pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod rate_limit;
pub mod reviews;
pub mod state;
