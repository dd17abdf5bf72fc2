//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//!
//! Each document type `X` wraps an `XCore` with its `_id`; `NewX` is the
//! core alone, for inserts where the database assigns the ID.

pub mod candidate;
pub mod election;
pub mod geography;
pub mod profile;
pub mod role;
pub mod vote;
