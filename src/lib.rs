//! pagecask - a single-node embeddable relational data engine
//!
//! This library provides the core components of the engine:
//! - Paged record store (slotted 4 KiB pages, tombstones, vacuum)
//! - Hashed primary-column index persisted next to each table
//! - SQL statement tree and parse-tree lowering
//! - Query execution (filtering, projection, hash join, grouped aggregation)

pub mod catalog;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;

pub use error::{Error, Result};
