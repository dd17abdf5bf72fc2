//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Datetimes are serialised as RFC 3339 strings.
//!
//! Request bodies (`*Spec`) deserialize IDs directly as hex strings.

pub mod admin;
pub mod auth;
pub mod candidate;
pub mod election;
pub mod geography;
pub mod id;
pub mod pagination;
pub mod results;
pub mod vote;
