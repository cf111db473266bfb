//! CozyCircle Core Library
//!
//! Authoritative ledger for CozyCircle - confidential friend circles.
//! This crate provides the circle registry, membership ledger, activity log,
//! and event stream that back the CozyCircle client, together with the
//! verifier capability the ledger consumes for private-circle posts.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

pub mod circle;
pub mod verifier;

pub use circle::CircleLedger;
