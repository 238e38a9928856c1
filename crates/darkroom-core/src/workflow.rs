//! Booking workflow stages and the transitions between them.

use serde::{Deserialize, Serialize};

use crate::actor::Rank;
use crate::error::{CoreError, CoreResult};

/// Workflow stage of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum BookingStatus {
    Inquiry,
    Confirmed,
    Shooting,
    /// Client is choosing photos on the portal.
    Selection,
    Editing,
    Printing,
    Ready,
    Delivered,
    Cancelled,
}

impl BookingStatus {
    const WORKFLOW: [Self; 8] = [
        Self::Inquiry,
        Self::Confirmed,
        Self::Shooting,
        Self::Selection,
        Self::Editing,
        Self::Printing,
        Self::Ready,
        Self::Delivered,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inquiry => "inquiry",
            Self::Confirmed => "confirmed",
            Self::Shooting => "shooting",
            Self::Selection => "selection",
            Self::Editing => "editing",
            Self::Printing => "printing",
            Self::Ready => "ready",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// ## Summary
    /// Parses a stored status name, accepting the cloud's upper-case spelling.
    ///
    /// ## Errors
    /// Returns `InvalidInput` for an unknown status name.
    pub fn parse(value: &str) -> CoreResult<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "inquiry" | "pending" => Ok(Self::Inquiry),
            "confirmed" => Ok(Self::Confirmed),
            "shooting" => Ok(Self::Shooting),
            "selection" => Ok(Self::Selection),
            "editing" => Ok(Self::Editing),
            "printing" => Ok(Self::Printing),
            "ready" | "ready_for_pickup" => Ok(Self::Ready),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(CoreError::InvalidInput(format!("unknown booking status '{value}'"))),
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    fn position(self) -> Option<usize> {
        Self::WORKFLOW.iter().position(|stage| *stage == self)
    }

    /// ## Summary
    /// Validates a transition for an actor of the given rank.
    ///
    /// Forward moves (skipping stages is allowed) and cancellation of a live
    /// booking are open to everyone; moving backwards or reopening a terminal
    /// booking requires manager rank.
    ///
    /// ## Errors
    /// - `ValidationError` for a no-op or impossible transition
    /// - `NotAuthorized` when a backward move is attempted below manager rank
    pub fn check_transition(self, next: Self, rank: Rank) -> CoreResult<()> {
        if self == next {
            return Err(CoreError::ValidationError(format!(
                "booking is already {}",
                self.as_str()
            )));
        }
        if next == Self::Cancelled {
            return if self == Self::Delivered {
                Err(CoreError::ValidationError(
                    "a delivered booking cannot be cancelled".to_string(),
                ))
            } else {
                Ok(())
            };
        }

        let forward = match (self.position(), next.position()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        };
        if forward && !self.is_terminal() {
            return Ok(());
        }
        if rank >= Rank::Manager {
            return Ok(());
        }
        Err(CoreError::NotAuthorized(format!(
            "moving a booking from {} to {} requires manager approval",
            self.as_str(),
            next.as_str()
        )))
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::parse(&value)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
