//! Semantic element roles.
//!
//! The role decides which generation backend an element is routed to and
//! how a failure for that element is tolerated. Scripts carry the role as
//! a free-form string; it is parsed once into a closed enum so that every
//! routing decision is an exhaustive `match`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role string for identity-preserving character images.
pub const ROLE_AVATAR: &str = "avatar";
/// Role string for general scene props.
pub const ROLE_PROP: &str = "prop";

/// Semantic category of a visual element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// The recurring on-screen character. Requires the identity provider.
    Avatar,
    /// A general prop rendered by the text-to-image provider.
    Prop,
    /// Any other role. Treated like a prop for routing purposes.
    Other(String),
}

impl Role {
    /// Parse a role string. Matching is case-insensitive and ignores
    /// surrounding whitespace; unknown values are kept verbatim.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            ROLE_AVATAR => Self::Avatar,
            ROLE_PROP => Self::Prop,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// The string form written back to JSON.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Avatar => ROLE_AVATAR,
            Self::Prop => ROLE_PROP,
            Self::Other(raw) => raw,
        }
    }

    /// Whether a generation failure for this role halts the whole run
    /// rather than degrading to a placeholder.
    pub fn requires_identity(&self) -> bool {
        matches!(self, Self::Avatar)
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
