//! Indicators as delivered by the source feed
//!
//! The feed speaks STIX 2.1 over a TAXII-style envelope. Vendor attributes
//! (observable type, score, detection, timestamps) live in a single extension
//! block keyed by [`VENDOR_EXTENSION_KEY`].
//!
//! Pages hold [`FeedObject`]s, which stay raw JSON until their kind is known.
//! Only supported kinds are decoded into a [`SourceObject`], so an object of
//! another kind can carry any shape without affecting the rest of the page.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;

use super::event::EntityType;
use crate::error::IngestError;

/// Extension definition carrying the vendor attributes of every indicator
pub const VENDOR_EXTENSION_KEY: &str =
    "extension-definition--ea279b3e-5c71-4632-ac08-831c66a786ba";

/// Observable kind of an indicator
///
/// Wire values outside the supported set are kept verbatim in
/// [`SourceKind::Unsupported`] so they can be logged when skipped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceKind {
    File,
    Url,
    DomainName,
    Ipv4,
    Hostname,
    EmailAddr,
    Unsupported(String),
}

impl SourceKind {
    /// Wire discriminator used by the feed
    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::File => "StixFile",
            SourceKind::Url => "Url",
            SourceKind::DomainName => "Domain-Name",
            SourceKind::Ipv4 => "IPv4-Addr",
            SourceKind::Hostname => "Hostname",
            SourceKind::EmailAddr => "Email-Addr",
            SourceKind::Unsupported(raw) => raw,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.entity_type().is_some()
    }

    /// Entity type the normalized event carries for this kind
    pub fn entity_type(&self) -> Option<EntityType> {
        match self {
            SourceKind::File => Some(EntityType::File),
            SourceKind::Url => Some(EntityType::Url),
            SourceKind::DomainName | SourceKind::Hostname => Some(EntityType::DomainName),
            SourceKind::Ipv4 => Some(EntityType::IpAddress),
            SourceKind::EmailAddr => Some(EntityType::User),
            SourceKind::Unsupported(_) => None,
        }
    }
}

impl From<String> for SourceKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "StixFile" => SourceKind::File,
            "Url" => SourceKind::Url,
            "Domain-Name" => SourceKind::DomainName,
            "IPv4-Addr" => SourceKind::Ipv4,
            "Hostname" => SourceKind::Hostname,
            "Email-Addr" => SourceKind::EmailAddr,
            _ => SourceKind::Unsupported(raw),
        }
    }
}

impl From<&str> for SourceKind {
    fn from(raw: &str) -> Self {
        SourceKind::from(raw.to_string())
    }
}

impl From<SourceKind> for String {
    fn from(kind: SourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indicator from the feed, with its vendor extension flattened in
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireIndicator")]
pub struct SourceObject {
    pub id: String,
    pub kind: SourceKind,
    /// Observable value (hash, URL, domain, address, ...)
    pub name: String,
    pub confidence: Option<Number>,
    pub created_at: String,
    pub updated_at: String,
    pub score: Value,
    pub detection: Value,
    pub extension_type: Option<String>,
    pub indicator_type: Option<String>,
    pub pattern: String,
    pub pattern_type: String,
    pub pattern_version: Option<String>,
    pub description: Option<String>,
    pub labels: Option<Vec<String>>,
    pub valid_from: String,
    pub valid_until: Option<String>,
}

#[derive(Deserialize)]
struct WireIndicator {
    id: String,
    name: String,
    #[serde(default)]
    confidence: Option<Number>,
    pattern: String,
    pattern_type: String,
    #[serde(default)]
    pattern_version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    labels: Option<Vec<String>>,
    valid_from: String,
    #[serde(default)]
    valid_until: Option<String>,
    #[serde(default)]
    extensions: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct VendorExtension {
    main_observable_type: String,
    created_at: String,
    updated_at: String,
    score: Value,
    detection: Value,
    #[serde(default)]
    extension_type: Option<String>,
    #[serde(rename = "type", default)]
    indicator_type: Option<String>,
}

impl TryFrom<WireIndicator> for SourceObject {
    type Error = String;

    fn try_from(mut wire: WireIndicator) -> Result<Self, Self::Error> {
        let extension = wire
            .extensions
            .remove(VENDOR_EXTENSION_KEY)
            .ok_or_else(|| format!("indicator {} has no vendor extension block", wire.id))?;
        let extension: VendorExtension = serde_json::from_value(extension)
            .map_err(|e| format!("indicator {} has an invalid vendor extension: {}", wire.id, e))?;

        Ok(SourceObject {
            id: wire.id,
            kind: SourceKind::from(extension.main_observable_type),
            name: wire.name,
            confidence: wire.confidence,
            created_at: extension.created_at,
            updated_at: extension.updated_at,
            score: extension.score,
            detection: extension.detection,
            extension_type: extension.extension_type,
            indicator_type: extension.indicator_type,
            pattern: wire.pattern,
            pattern_type: wire.pattern_type,
            pattern_version: wire.pattern_version,
            description: wire.description,
            labels: wire.labels,
            valid_from: wire.valid_from,
            valid_until: wire.valid_until,
        })
    }
}

/// One undecoded object from a feed page
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FeedObject(Value);

impl FeedObject {
    /// Object id, or an empty string when the object has none
    pub fn id(&self) -> &str {
        self.0.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    /// Observable kind from the vendor extension
    ///
    /// An object without the extension or its `main_observable_type` has no
    /// kind and comes back as `Unsupported("")`.
    pub fn kind(&self) -> SourceKind {
        self.0
            .get("extensions")
            .and_then(|extensions| extensions.get(VENDOR_EXTENSION_KEY))
            .and_then(|extension| extension.get("main_observable_type"))
            .and_then(Value::as_str)
            .map(SourceKind::from)
            .unwrap_or_else(|| SourceKind::Unsupported(String::new()))
    }

    /// Decode the full indicator
    ///
    /// A shape mismatch is reported as [`IngestError::InvalidIndicator`] for
    /// this object alone.
    pub fn decode(&self) -> crate::Result<SourceObject> {
        SourceObject::deserialize(&self.0).map_err(|e| IngestError::InvalidIndicator {
            id: self.id().to_string(),
            reason: e.to_string(),
        })
    }
}

impl From<Value> for FeedObject {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// One page of the feed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    /// Absent when the page is empty
    #[serde(default)]
    pub objects: Vec<FeedObject>,

    /// More pages follow this one
    #[serde(default)]
    pub more: bool,

    /// Token for the following page
    #[serde(default)]
    pub next: Option<String>,
}

impl Page {
    /// Continuation token, ignoring blank values
    pub fn next_token(&self) -> Option<&str> {
        self.next.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}
