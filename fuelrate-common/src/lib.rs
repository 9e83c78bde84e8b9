//! # FuelRate Common Library
//!
//! Shared code for the FuelRate backend including:
//! - Database initialization, schema, and row models
//! - Token authentication primitives and identity resolution
//! - Configuration loading
//! - Error types
//! - Time utilities

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
