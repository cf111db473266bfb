//! Core types for the circle ledger.
//!
//! This module defines the data structures for circles (confidential friend
//! groups), memberships, and posted activity records, along with the opaque
//! byte wrappers for encrypted content references and attestations.
//!
//! # Privacy Model
//!
//! The ledger never holds plaintext content. A posted update is an opaque
//! [`ContentRef`] pointing at ciphertext produced off-core; the ledger only
//! controls who may append and who may read the references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::LedgerError;

/// Capacity the client passes when none is chosen explicitly.
pub const DEFAULT_CAPACITY: u8 = 50;

/// Upper bound on circle capacity.
pub const MAX_CAPACITY: u8 = 100;

/// Number of activity records returned per page by `list_updates`.
pub const UPDATES_PAGE_SIZE: usize = 20;

/// Unique, monotonically assigned circle identifier. Never reused.
pub type CircleId = u64;

/// A 20-byte wallet address.
///
/// Parsed from hex with an optional `0x` prefix; rendered as lowercase
/// `0x`-prefixed hex. Serializes as a hex string so the event stream stays
/// readable for off-core indexers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Byte length of an address.
    pub const LEN: usize = 20;

    /// Creates an address from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Returns the raw address bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_part)
            .map_err(|e| LedgerError::InvalidInput(format!("Invalid address hex: {e}")))?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|b: Vec<u8>| {
            LedgerError::InvalidInput(format!(
                "Invalid address length: expected {} bytes, got {}",
                Self::LEN,
                b.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Role of a member within a circle.
///
/// The creator holds the only `Admin` role; everyone admitted later is a
/// `Member`. Admin transfer is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Circle creator; may archive the circle and cannot leave.
    Admin,
    /// Regular admitted member.
    Member,
}

impl Role {
    /// Converts to string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    /// Parses from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

/// A circle (confidential friend group).
///
/// This is the authoritative ledger row for a circle. Counters are bounded
/// `u8` values that saturate-then-reject rather than wrap, so they can never
/// undercount via overflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circle {
    /// Unique identifier, assigned at creation.
    pub id: CircleId,
    /// Circle name (non-empty, trimmed).
    pub name: String,
    /// Circle description (non-empty, trimmed).
    pub description: String,
    /// Whether posted content must be encrypted and verifier-gated.
    pub is_private: bool,
    /// Maximum number of members (1..=100).
    pub capacity: u8,
    /// Creator address; immutable, holds the `Admin` role.
    pub creator: Address,
    /// When the circle was created (Unix timestamp).
    pub created_at: i64,
    /// When membership or content last changed (Unix timestamp).
    pub last_activity: i64,
    /// False once archived; archival is irreversible.
    pub is_active: bool,
    /// Current number of members (1..=capacity while active).
    pub member_count: u8,
    /// Number of posted updates; saturates at 255.
    pub message_count: u8,
}

/// Read-only snapshot of a circle, served to external callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircleView {
    /// Circle identifier.
    pub id: CircleId,
    /// Circle name.
    pub name: String,
    /// Circle description.
    pub description: String,
    /// Current member count.
    pub member_count: u8,
    /// Current message count.
    pub message_count: u8,
    /// Whether the circle is private.
    pub is_private: bool,
    /// Whether the circle still accepts mutation.
    pub is_active: bool,
    /// Creator address.
    pub creator: Address,
    /// Creation timestamp (Unix seconds).
    pub created_at: i64,
    /// Last membership or content mutation (Unix seconds).
    pub last_activity: i64,
    /// Configured member capacity.
    pub capacity: u8,
}

impl From<Circle> for CircleView {
    fn from(circle: Circle) -> Self {
        Self {
            id: circle.id,
            name: circle.name,
            description: circle.description,
            member_count: circle.member_count,
            message_count: circle.message_count,
            is_private: circle.is_private,
            is_active: circle.is_active,
            creator: circle.creator,
            created_at: circle.created_at,
            last_activity: circle.last_activity,
            capacity: circle.capacity,
        }
    }
}

/// Membership of an address in a circle.
///
/// At most one membership exists per `(circle_id, address)` pair. The
/// Membership Ledger is the sole writer of these rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    /// Circle this membership belongs to.
    pub circle_id: CircleId,
    /// Member address.
    pub address: Address,
    /// Role within the circle.
    pub role: Role,
    /// When the address joined (Unix timestamp).
    pub joined_at: i64,
}

/// One posted update.
///
/// Immutable once appended; ordered per circle by `record_index`, which is
/// insertion order and therefore also breaks `posted_at` ties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    /// Circle the update was posted to.
    pub circle_id: CircleId,
    /// Zero-based position in the circle's activity stream.
    pub record_index: u32,
    /// Member who posted the update.
    pub author: Address,
    /// Opaque reference to the encrypted content.
    pub content_ref: ContentRef,
    /// When the update was posted (Unix timestamp).
    pub posted_at: i64,
}

/// Opaque reference to encrypted content.
///
/// The ledger never decrypts this; it only gates who may read it.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentRef(Vec<u8>);

impl ContentRef {
    /// Wraps raw reference bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw reference bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns whether the reference is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentRef(0x{})", hex::encode(&self.0))
    }
}

impl Serialize for ContentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

/// Opaque proof supplied by a caller for private-circle actions.
///
/// Produced off-core; the ledger only hands it to the verifier.
#[derive(Clone, PartialEq, Eq)]
pub struct Attestation(Vec<u8>);

impl Attestation {
    /// Wraps raw attestation bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw attestation bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Attestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Attestation bytes may embed proof material; keep them out of logs.
        f.debug_struct("Attestation")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Configuration for creating a new circle.
#[derive(Debug, Clone)]
pub struct CircleConfig {
    /// Circle name.
    pub name: String,
    /// Circle description.
    pub description: String,
    /// Whether content is encrypted and verifier-gated. Defaults to true.
    pub is_private: bool,
    /// Maximum member count. Defaults to [`DEFAULT_CAPACITY`].
    pub capacity: u8,
}

impl CircleConfig {
    /// Creates a configuration with the client defaults (private, capacity 50).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            is_private: true,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets whether the circle is private.
    #[must_use]
    pub const fn with_privacy(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    /// Sets the member capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: u8) -> Self {
        self.capacity = capacity;
        self
    }
}
