//! # Tickstream Core
//!
//! Core types, traits, and interfaces for the Tickstream quote server.
//!
//! This crate provides:
//! - Validated `Symbol` newtype for ticker identifiers
//! - The immutable `Quote` price snapshot
//! - Error types for validation, upstream fetches, and caching
//! - The `QuoteSource` trait implemented by upstream data providers
//! - The `Cache` trait with a TTL-aware in-memory implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

/// Core type definitions
pub mod types;

/// Error types and handling
pub mod error;

/// Upstream quote source trait
pub mod source;

/// TTL cache trait and implementations
pub mod cache;

pub use cache::{Cache, MemoryCache};
pub use error::{CacheError, FetchError, ValidationError};
pub use source::QuoteSource;
pub use types::{Quote, Symbol};
