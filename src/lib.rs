pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod reconcile;
pub mod schema;
pub mod services;
pub mod types;
