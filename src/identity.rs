//! Session addressing for the two ends of a transport session.
//!
//! Every session has exactly two participants sharing a logical `uid`. Each
//! end registers with the peer network as `{uid}-{role}` and always targets
//! the complementary role, so the two peers resolve to each other without
//! any further negotiation.

use std::{fmt, str::FromStr};

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two fixed roles in a session.
///
/// [`Role::App`] is the initiating side: it dials the embedded side once it
/// has something to send. [`Role::Embed`] is the responding side and
/// normally waits for the inbound connection. The lower-case tags are part of
/// the addressing contract and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Initiator.
    App,
    /// Responder.
    Embed,
}

impl Role {
    /// Wire tag used when building peer identifiers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::App => "app",
            Role::Embed => "embed",
        }
    }

    /// Return the role of the other end of the session.
    #[must_use]
    pub const fn complement(self) -> Self {
        match self {
            Role::App => Role::Embed,
            Role::Embed => Role::App,
        }
    }

    /// Whether this role dials the other end of the session.
    #[must_use]
    pub const fn is_initiator(self) -> bool { matches!(self, Role::App) }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Error returned when parsing an unknown role tag.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown role {0:?}; expected \"app\" or \"embed\"")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app" => Ok(Role::App),
            "embed" => Ok(Role::Embed),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// Identifier a peer registers under with the peer network.
///
/// # Examples
///
/// ```
/// use peerframe::identity::{Identity, Role};
/// let identity = Identity::new("room1", Role::App);
/// assert_eq!(identity.peer_id().as_str(), "room1-app");
/// assert_eq!(identity.remote_peer_id().as_str(), "room1-embed");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
#[display("{_0}")]
pub struct PeerId(String);

impl PeerId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self { Self(value.to_owned()) }
}

/// A logical participant id plus its role within the session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identity {
    uid: String,
    role: Role,
}

impl Identity {
    /// Create an identity for `uid` acting as `role`.
    #[must_use]
    pub fn new(uid: impl Into<String>, role: Role) -> Self {
        Self {
            uid: uid.into(),
            role,
        }
    }

    /// Shared session identifier.
    #[must_use]
    pub fn uid(&self) -> &str { &self.uid }

    /// Local role.
    #[must_use]
    pub const fn role(&self) -> Role { self.role }

    /// Identifier this end registers under.
    #[must_use]
    pub fn peer_id(&self) -> PeerId { self.peer_id_for(self.role) }

    /// Identifier of the complementary end of the session.
    #[must_use]
    pub fn remote_peer_id(&self) -> PeerId { self.peer_id_for(self.role.complement()) }

    /// Identity of the other end of the session.
    #[must_use]
    pub fn remote(&self) -> Self { Self::new(self.uid.clone(), self.role.complement()) }

    fn peer_id_for(&self, role: Role) -> PeerId { PeerId(format!("{}-{role}", self.uid)) }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Role::App, "room1-app", "room1-embed")]
    #[case(Role::Embed, "room1-embed", "room1-app")]
    fn identities_address_the_complementary_role(
        #[case] role: Role,
        #[case] local: &str,
        #[case] remote: &str,
    ) {
        let identity = Identity::new("room1", role);
        assert_eq!(identity.peer_id().as_str(), local);
        assert_eq!(identity.remote_peer_id().as_str(), remote);
        assert_eq!(identity.remote().remote_peer_id(), identity.peer_id());
    }

    #[test]
    fn role_tags_parse_back() {
        assert_eq!("app".parse::<Role>(), Ok(Role::App));
        assert_eq!("embed".parse::<Role>(), Ok(Role::Embed));
        assert_eq!(
            "mirror".parse::<Role>(),
            Err(UnknownRole("mirror".to_owned()))
        );
    }

    #[test]
    fn only_app_initiates() {
        assert!(Role::App.is_initiator());
        assert!(!Role::Embed.is_initiator());
        assert_eq!(Role::Embed.complement(), Role::App);
    }
}
