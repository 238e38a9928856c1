//! Acting user, authority ranks and rank-based write resolution.
//!
//! Every service call receives the acting user explicitly. The rank derived
//! from the actor's role decides whether a write may overwrite a row last
//! edited by someone else.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Authority level of an actor, ordered from least to most authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Staff,
    Reception,
    Manager,
    Owner,
}

impl Rank {
    /// Highest authority level. Adjudicated writes are stamped with it.
    pub const MAX: Self = Self::Owner;

    #[must_use]
    pub const fn level(self) -> i64 {
        match self {
            Self::Staff => 1,
            Self::Reception => 2,
            Self::Manager => 3,
            Self::Owner => 4,
        }
    }

    /// ## Summary
    /// Maps a stored level back to a rank. Unknown levels clamp to the nearest rank.
    #[must_use]
    pub const fn from_level(level: i64) -> Self {
        match level {
            i64::MIN..=1 => Self::Staff,
            2 => Self::Reception,
            3 => Self::Manager,
            _ => Self::Owner,
        }
    }
}

/// Studio role of a staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Reception,
    Photographer,
    Videographer,
    Editor,
    Printer,
}

impl Role {
    #[must_use]
    pub const fn rank(self) -> Rank {
        match self {
            Self::Admin => Rank::Owner,
            Self::Manager => Rank::Manager,
            Self::Reception => Rank::Reception,
            Self::Photographer | Self::Videographer | Self::Editor | Self::Printer => Rank::Staff,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Reception => "reception",
            Self::Photographer => "photographer",
            Self::Videographer => "videographer",
            Self::Editor => "editor",
            Self::Printer => "printer",
        }
    }

    /// Human-readable label used in audit entries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::Manager => "Studio Manager",
            Self::Reception => "Reception",
            Self::Photographer => "Photographer",
            Self::Videographer => "Videographer",
            Self::Editor => "Photo Editor",
            Self::Printer => "Print Technician",
        }
    }

    /// ## Summary
    /// Parses a role from its storage name.
    ///
    /// ## Errors
    /// Returns `InvalidInput` for an unknown role name.
    pub fn parse(value: &str) -> CoreResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "reception" => Ok(Self::Reception),
            "photographer" => Ok(Self::Photographer),
            "videographer" => Ok(Self::Videographer),
            "editor" => Ok(Self::Editor),
            "printer" => Ok(Self::Printer),
            other => Err(CoreError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    /// Background work (retention sweep, reconciliation) runs as this actor.
    #[must_use]
    pub fn system() -> Self {
        Self::new("system", "System", Role::Admin)
    }

    #[must_use]
    pub const fn rank(&self) -> Rank {
        self.role.rank()
    }

    #[must_use]
    pub const fn role_label(&self) -> &'static str {
        self.role.label()
    }

    /// ## Summary
    /// Ensures the actor holds at least `required` authority.
    ///
    /// ## Errors
    /// Returns `NotAuthorized` naming the attempted action when the rank is too low.
    pub fn require(&self, required: Rank, action: &str) -> CoreResult<()> {
        if self.rank() >= required {
            Ok(())
        } else {
            Err(CoreError::NotAuthorized(format!(
                "{} ({}) may not {action}",
                self.name,
                self.role_label()
            )))
        }
    }
}

/// How an incoming write is weighed against the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankPolicy {
    /// Lower-ranked writers never overwrite higher-ranked edits.
    Strict,
    /// Every write applies; used for adjudicated and system writes.
    Permissive,
}

/// Outcome of weighing an incoming write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Apply,
    Defer,
}

/// ## Summary
/// Decides whether a write by `incoming` may overwrite a row last edited at `stored`.
#[must_use]
pub fn resolve(incoming: Rank, stored: Rank, policy: RankPolicy) -> Resolution {
    match policy {
        RankPolicy::Permissive => Resolution::Apply,
        RankPolicy::Strict if incoming < stored => Resolution::Defer,
        RankPolicy::Strict => Resolution::Apply,
    }
}
