//! Common types used across IOC Sync
//!
//! - [`source`]: indicators as the feed delivers them
//! - [`event`]: the normalized UDM entity uploaded to the ingestion sink
//! - [`cursor`]: the pagination resume state

pub mod cursor;
pub mod event;
pub mod source;

pub use cursor::{Cursor, EXHAUSTED_SENTINEL};
pub use event::{
    Additional, Entity, EntityType, EventMetadata, Interval, NormalizedEvent, ThreatInfo,
};
pub use source::{FeedObject, Page, SourceKind, SourceObject, VENDOR_EXTENSION_KEY};
