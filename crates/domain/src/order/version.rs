use serde::{Deserialize, Serialize};

/// Record version used for optimistic concurrency on order updates.
///
/// A freshly placed order is at [`Version::initial`] until it has been
/// saved for the first time; every successful save advances it by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub const fn new(version: i64) -> Self {
        Self(version)
    }

    /// The version of an order that has never been stored.
    pub const fn initial() -> Self {
        Self(0)
    }

    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub const fn is_initial(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
