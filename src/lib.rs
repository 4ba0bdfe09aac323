pub mod canonical;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod services;
pub mod store;
