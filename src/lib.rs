pub mod config;
pub mod errors;
pub mod schema;
pub mod services;
pub mod types;
