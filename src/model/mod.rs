//! Data types, split by where they live:
//!
//! - [`db`]: documents as stored in MongoDB.
//! - [`api`]: request and response bodies.
//! - [`common`]: domain logic shared by both (election status, region
//!   filters, result tallies).
//! - [`mongodb`]: typed collection handles and database plumbing.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
