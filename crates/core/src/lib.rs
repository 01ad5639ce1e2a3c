//! Core types and shared functionality for namewatch.
//!
//! This crate provides:
//! - Name cache implementation with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - The cached and resolved record types

pub mod cache;
pub mod config;
pub mod error;
pub mod record;

pub use cache::{CacheDb, NameStore};
pub use config::{AppConfig, ConfigError, ConfigFile};
pub use error::Error;
pub use record::{CacheEntry, DEFAULT_CACHE_TTL_SECS, ResolvedRecord, normalize_name};
