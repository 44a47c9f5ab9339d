//! Publisher order status.

use serde::{Deserialize, Serialize};

/// ```text
/// Pending ──┬──► Confirmed
///           └──► Cancelled
/// ```
///
/// Both outcomes are terminal; each order leaves `Pending` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PublisherOrderStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl PublisherOrderStatus {
    /// Returns true if the order may still be confirmed or cancelled.
    pub fn can_transition(&self) -> bool {
        matches!(self, PublisherOrderStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.can_transition()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PublisherOrderStatus::Pending => "Pending",
            PublisherOrderStatus::Confirmed => "Confirmed",
            PublisherOrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(PublisherOrderStatus::Pending),
            "Confirmed" => Some(PublisherOrderStatus::Confirmed),
            "Cancelled" => Some(PublisherOrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for PublisherOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
