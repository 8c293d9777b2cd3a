//! Core engine: configuration, errors, data models and the translation stack

pub mod cache;
pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod models;
pub mod session;
