//! Pagination cursor

/// Persisted marker recording that the feed was fully drained
pub const EXHAUSTED_SENTINEL: &str = "NO MORE DATA";

/// Where the next fetch should start
///
/// `Exhausted` fetches exactly like `Unset` (from the lookback window) but is
/// persisted distinctly so the store records that the last run caught up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Nothing was ever persisted
    #[default]
    Unset,
    /// Resume from this page token
    Active(String),
    /// Feed drained on the last run
    Exhausted,
}

impl Cursor {
    /// Decode the value held by the checkpoint store
    pub fn from_persisted(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Cursor::Unset,
            Some(EXHAUSTED_SENTINEL) => Cursor::Exhausted,
            Some(token) => Cursor::Active(token.to_string()),
        }
    }

    /// Value to hand to the checkpoint store, `None` for `Unset`
    pub fn to_persisted(&self) -> Option<&str> {
        match self {
            Cursor::Unset => None,
            Cursor::Active(token) => Some(token),
            Cursor::Exhausted => Some(EXHAUSTED_SENTINEL),
        }
    }

    /// Page token to resume from, if any
    pub fn resume_token(&self) -> Option<&str> {
        match self {
            Cursor::Active(token) => Some(token),
            Cursor::Unset | Cursor::Exhausted => None,
        }
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cursor::Unset => write!(f, "unset"),
            Cursor::Active(token) => write!(f, "active({})", token),
            Cursor::Exhausted => write!(f, "exhausted"),
        }
    }
}
