pub mod auth;
pub mod config;
pub mod results;
pub mod session;
pub mod upload;
