// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # airtable-client
//!
//! Async client for the Airtable Web API.
//!
//! ## Features
//!
//! - **Rate-limit retry**: 429 responses are resent with full-jitter exponential backoff
//! - **Error classification**: every failure surfaces as a typed [`ApiError`]
//! - **Cursor pagination**: page callbacks, bulk collection, iterator-expiry restarts
//! - **Resource wrappers**: bases, tables, records and comments
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use airtable_client::{Airtable, ClientOptions, ListRecordsOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let airtable = Airtable::new(ClientOptions::new().api_key("pat..."))?;
//!     let table = airtable.base("appEpvhkjHcG8OvKu").table("Tasks");
//!
//!     for record in table.list(ListRecordsOptions::default()).all().await? {
//!         println!("{} {:?}", record.id(), record.get("Name"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │   Airtable → Base → Table → Record / Comment / Query      │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────────┬─────────┴────────┬────────────────────┐
//! │    Pagination    │   HTTP client    │      Transport     │
//! ├──────────────────┼──────────────────┼────────────────────┤
//! │ Offset cursor    │ Bearer auth      │ reqwest            │
//! │ Page callbacks   │ 429 backoff      │ custom (tests)     │
//! │ Iterator reset   │ Classification   │                    │
//! └──────────────────┴──────────────────┴────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Client options and resolved configuration
pub mod config;

/// HTTP client with retry and rate limiting
pub mod http;

/// Cursor pagination
pub mod pagination;

/// Bases, tables, records and comments
pub mod resources;

mod airtable;

// ============================================================================
// Re-exports
// ============================================================================

pub use airtable::Airtable;
pub use config::{ApiKey, ClientConfig, ClientOptions, HeaderMerge, RateLimitRetry, RetryOptions};
pub use error::{ApiError, Error, ErrorKind, Result};
pub use http::{RequestDescriptor, RetryPolicy};
pub use pagination::{IteratorReset, PageContext, PageControl};
pub use resources::{
    Base, Comment, CommentQuery, GetRecordOptions, ListCommentsOptions, ListRecordsOptions, Query,
    Record, Table, UpdateMethod, UpdateRecordOptions,
};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
