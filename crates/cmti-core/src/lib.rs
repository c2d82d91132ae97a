//! Core types and trait definitions for the mine tailings inventory.
//!
//! Holds the entity graph (mines, tailings facilities, impoundments and their
//! owned records), the jurisdiction-scoped identifier issuer, the read-only
//! commodity lookup tables and the `MineStore` abstraction. Row handling and
//! persistence live in sibling crates; this one depends on neither.

pub mod commodity;
pub mod error;
pub mod facility;
pub mod identifier;
pub mod jurisdiction;
pub mod mine;
pub mod owner;
pub mod store;

pub use error::{Error, Result};
