//! Core consumer trait.

use async_trait::async_trait;
use messaging::Message;

use crate::Result;

/// What handling a message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The order (or the outside world) changed.
    Applied,
    /// Valid message with nothing to do, e.g. a duplicate.
    Unchanged,
    /// Recorded on the order, to take effect once it catches up.
    Deferred,
    /// The message could not be acted on and was dropped.
    Dropped,
}

impl ConsumeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Unchanged => "unchanged",
            Self::Deferred => "deferred",
            Self::Dropped => "dropped",
        }
    }
}

/// A handler for one topic.
///
/// Delivery is at-least-once, so `handle` must tolerate duplicates and
/// out-of-order messages.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Topic this consumer listens on.
    fn topic(&self) -> &'static str;

    async fn handle(&self, message: &Message) -> Result<ConsumeOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(ConsumeOutcome::Applied.as_str(), "applied");
        assert_eq!(ConsumeOutcome::Unchanged.as_str(), "unchanged");
        assert_eq!(ConsumeOutcome::Deferred.as_str(), "deferred");
        assert_eq!(ConsumeOutcome::Dropped.as_str(), "dropped");
    }
}
