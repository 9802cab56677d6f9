//! Storage engine module
//!
//! This module contains the paged record store components:
//! - Slotted page layout
//! - Primary-column hash index
//! - The record store itself (files, CRUD, scan, vacuum)

pub mod index;
pub mod page;
pub mod store;

pub use index::{index_key, BucketIndex, INDEX_BUCKET_COUNT};
pub use page::{record_id, split_record_id, Page, RecordId, PAGE_SIZE, TOMBSTONE_SLOT};
pub use store::{RecordStore, ScanOptions};
