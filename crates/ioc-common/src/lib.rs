//! IOC Sync Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the IOC Sync workspace.
//!
//! # Overview
//!
//! - **Types**: the source indicator model, the normalized UDM entity, and the
//!   pagination cursor
//! - **Errors**: the ingestion error taxonomy and result alias
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use ioc_common::types::{Cursor, SourceKind};
//!
//! let kind = SourceKind::from("IPv4-Addr");
//! assert!(kind.is_supported());
//! assert_eq!(Cursor::from_persisted(Some("NO MORE DATA")), Cursor::Exhausted);
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{IngestError, Result};
