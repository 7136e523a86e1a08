//! Normalized threat-intelligence events (UDM entities)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// UDM entity type recorded in the event metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    File,
    Url,
    DomainName,
    IpAddress,
    User,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::File => "FILE",
            EntityType::Url => "URL",
            EntityType::DomainName => "DOMAIN_NAME",
            EntityType::IpAddress => "IP_ADDRESS",
            EntityType::User => "USER",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event as accepted by the ingestion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub metadata: EventMetadata,
    pub entity: Entity,
    pub additional: Additional,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub vendor_name: String,
    pub product_name: String,
    /// When this event was built, not when the indicator was created
    pub collected_timestamp: String,
    /// Source indicator id; downstream deduplicates on it
    pub product_entity_id: String,
    pub entity_type: EntityType,
    pub threat: Vec<ThreatInfo>,
    pub interval: Interval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_details: Option<String>,
    pub first_discovered_time: String,
    pub last_updated_time: String,
}

/// Validity window of the indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// The observable, as exactly one populated UDM sub-shape
///
/// Serializes externally tagged, e.g. `{"ip": "10.0.0.5"}` or
/// `{"user": {"emailAddresses": ["a@b.c"]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    File {
        sha256: String,
    },
    Url(String),
    Hostname(String),
    Ip(String),
    User {
        #[serde(rename = "emailAddresses")]
        email_addresses: Vec<String>,
    },
}

/// Vendor attributes carried through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Additional {
    pub score: Value,
    pub detection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_type: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub indicator_type: Option<String>,
    pub pattern: String,
    pub pattern_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_version: Option<String>,
}
