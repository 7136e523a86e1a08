//! Indicator to UDM entity transformation
//!
//! The kind is read before anything else is decoded: unsupported kinds fall
//! through to `None` whatever their shape. For supported kinds
//! [`SourceKind::entity_type`] picks the entity type and the entity sub-shape
//! follows from it. Everything else on the event is copied the same way for
//! all kinds.

use chrono::{DateTime, Utc};
use ioc_common::types::{
    Additional, Entity, EntityType, EventMetadata, FeedObject, Interval, NormalizedEvent,
    SourceObject, ThreatInfo,
};
use ioc_common::{IngestError, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::info;

/// Vendor and product name stamped on every event by default
pub const DEFAULT_VENDOR_NAME: &str = "CTM_CUSTOM_IOC";

static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+\.[0-9]+\.[0-9]+\.[0-9]+)").expect("valid IPv4 pattern"));

/// Maps indicators onto normalized events
#[derive(Debug, Clone)]
pub struct Transformer {
    vendor_name: String,
    product_name: String,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new(DEFAULT_VENDOR_NAME)
    }
}

impl Transformer {
    /// Transformer stamping `vendor` as both vendor and product name
    pub fn new(vendor: impl Into<String>) -> Self {
        let vendor = vendor.into();
        Self {
            product_name: vendor.clone(),
            vendor_name: vendor,
        }
    }

    /// Transform using the current wall-clock time as collection timestamp
    pub fn transform(&self, object: &FeedObject) -> Result<Option<NormalizedEvent>> {
        self.transform_at(object, Utc::now())
    }

    /// Transform with an explicit collection timestamp
    ///
    /// Returns `Ok(None)` for unsupported kinds. A supported indicator fails
    /// with [`IngestError::InvalidIndicator`] when it does not decode, and
    /// with [`IngestError::MalformedIndicator`] when it is IPv4 and its name
    /// holds no dotted quad.
    pub fn transform_at(
        &self,
        object: &FeedObject,
        collected_at: DateTime<Utc>,
    ) -> Result<Option<NormalizedEvent>> {
        let kind = object.kind();
        let Some(entity_type) = kind.entity_type() else {
            info!(id = %object.id(), kind = %kind, "Skipping unsupported indicator kind");
            return Ok(None);
        };

        let object = object.decode()?;
        let entity = entity_for(entity_type, &object)?;

        let metadata = EventMetadata {
            vendor_name: self.vendor_name.clone(),
            product_name: self.product_name.clone(),
            collected_timestamp: collected_timestamp(collected_at),
            product_entity_id: object.id.clone(),
            entity_type,
            threat: vec![ThreatInfo {
                confidence_details: object.confidence.as_ref().map(ToString::to_string),
                first_discovered_time: object.created_at.clone(),
                last_updated_time: object.updated_at.clone(),
            }],
            interval: Interval {
                start_time: object.valid_from.clone(),
                end_time: object.valid_until.clone(),
            },
        };

        let additional = Additional {
            score: object.score.clone(),
            detection: value_text(&object.detection),
            extension_type: object.extension_type.clone(),
            indicator_type: object.indicator_type.clone(),
            pattern: object.pattern.clone(),
            pattern_type: object.pattern_type.clone(),
            description: object.description.clone(),
            labels: object.labels.clone(),
            pattern_version: object.pattern_version.clone(),
        };

        Ok(Some(NormalizedEvent {
            metadata,
            entity,
            additional,
        }))
    }
}

fn entity_for(entity_type: EntityType, object: &SourceObject) -> Result<Entity> {
    let name = object.name.clone();
    let entity = match entity_type {
        EntityType::File => Entity::File { sha256: name },
        EntityType::Url => Entity::Url(name),
        EntityType::DomainName => Entity::Hostname(name),
        EntityType::IpAddress => {
            let ip = extract_ipv4(&object.name).ok_or_else(|| IngestError::MalformedIndicator {
                id: object.id.clone(),
                name: object.name.clone(),
            })?;
            Entity::Ip(ip.to_string())
        },
        EntityType::User => Entity::User {
            email_addresses: vec![name],
        },
    };
    Ok(entity)
}

/// First dotted-quad substring of `name`
pub fn extract_ipv4(name: &str) -> Option<&str> {
    IPV4.find(name).map(|m| m.as_str())
}

/// `2026-10-16T08:00:00.123456Z`
pub fn collected_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Strings verbatim, anything else as its JSON text
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
