//! Query execution module
//!
//! This module contains the tuple codec, the hash join and aggregation
//! helpers, and the query executor itself.

pub mod aggregate;
pub mod codec;
pub mod executor;
pub mod join;

pub use codec::{pack_record, unpack_record};
pub use executor::{QueryExecutor, QueryResult};
