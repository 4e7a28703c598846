//! Shared types, errors, and configuration for the warehouse engine.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - The application-wide error taxonomy
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{EngineError, EngineResult};
