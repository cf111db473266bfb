//! Circle ledger: the authoritative state machine behind CozyCircle.
//!
//! This module implements the circle/membership/content ledger. It creates
//! circles, admits members, tracks bounded activity counters, and gates
//! visibility of posted content behind membership and a pluggable verifier.
//!
//! # Architecture
//!
//! ```text
//! CircleLedger (high-level API, one event per committed mutation)
//!     ├── CircleRegistry    (circle metadata, id allocation, archival)
//!     ├── MembershipLedger  (admissions, capacity, membership queries)
//!     ├── ActivityLog       (append-only encrypted content references)
//!     └── LedgerStore       (SQLite, shared by the three components)
//! ```
//!
//! # Privacy Model
//!
//! Content never reaches the ledger in plaintext. Private circles require a
//! verifier-accepted attestation before anything is appended, and the opaque
//! content references are released only to admitted members.
//!
//! # Types
//!
//! - [`Circle`]: a named, access-controlled group
//! - [`Membership`]: an address admitted to a circle, with its role
//! - [`ActivityRecord`]: one immutable posted update
//! - [`LedgerEvent`]: notification emitted after each committed mutation

mod activity;
mod error;
mod events;
mod ledger;
mod membership;
mod registry;
mod store;
pub mod types;

pub use activity::ActivityLog;
pub use error::{LedgerError, Result};
pub use events::{EventSink, LedgerEvent, MemoryEventLog, NullSink};
pub use ledger::CircleLedger;
pub use membership::MembershipLedger;
pub use registry::CircleRegistry;
pub use store::LedgerStore;
pub use types::{
    ActivityRecord, Address, Attestation, Circle, CircleConfig, CircleId, CircleView, ContentRef,
    Membership, Role, DEFAULT_CAPACITY, MAX_CAPACITY, UPDATES_PAGE_SIZE,
};
