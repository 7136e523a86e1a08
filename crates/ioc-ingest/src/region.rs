//! Ingestion regions and their hosts

use ioc_common::IngestError;
use std::fmt;
use std::str::FromStr;

/// Regional deployment of the ingestion API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Europe,
    Singapore,
    Us,
    London,
    Sydney,
    TelAviv,
    Frankfurt,
    Zurich,
}

impl Region {
    pub const ALL: [Region; 8] = [
        Region::Europe,
        Region::Singapore,
        Region::Us,
        Region::London,
        Region::Sydney,
        Region::TelAviv,
        Region::Frankfurt,
        Region::Zurich,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Europe => "europe",
            Region::Singapore => "singapore",
            Region::Us => "us",
            Region::London => "london",
            Region::Sydney => "sydney",
            Region::TelAviv => "telaviv",
            Region::Frankfurt => "frankfurt",
            Region::Zurich => "zurich",
        }
    }

    /// Base URL of the regional ingestion host
    pub fn base_url(&self) -> &'static str {
        match self {
            Region::Europe => "https://europe-malachiteingestion-pa.googleapis.com",
            Region::Singapore => "https://asia-southeast1-malachiteingestion-pa.googleapis.com",
            Region::Us => "https://malachiteingestion-pa.googleapis.com",
            Region::London => "https://europe-west2-malachiteingestion-pa.googleapis.com",
            Region::Sydney => "https://australia-southeast1-malachiteingestion-pa.googleapis.com",
            Region::TelAviv => "https://me-west1-malachiteingestion-pa.googleapis.com",
            Region::Frankfurt => "https://europe-west3-malachiteingestion-pa.googleapis.com",
            Region::Zurich => "https://europe-west6-malachiteingestion-pa.googleapis.com",
        }
    }
}

impl FromStr for Region {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Region::ALL
            .into_iter()
            .find(|region| region.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Region::ALL.iter().map(Region::as_str).collect();
                IngestError::config(format!(
                    "Unknown region '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
