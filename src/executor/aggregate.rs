//! Grouped aggregation
//!
//! The executor supports a single aggregate shape: per-group maximum of a
//! column's string value. Whatever function name the query used, this is
//! what is computed; the executor flags unfamiliar names upstream.

use crate::error::{Error, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Group `rows` by the values at `group_indices` and compute the maximum
/// string value at `aggregate_index` per group.
///
/// Emits one row per group - the group key values followed by the maximum -
/// in first-seen input order.
pub fn group_max(
    rows: &[Vec<String>],
    group_indices: &[usize],
    aggregate_index: usize,
) -> Result<Vec<Vec<String>>> {
    let mut key_order: Vec<Vec<String>> = Vec::new();
    let mut maxima: HashMap<Vec<String>, String> = HashMap::new();

    for row in rows {
        let mut key = Vec::with_capacity(group_indices.len());
        for &index in group_indices {
            let value = row.get(index).ok_or_else(|| {
                Error::Execution(format!("group-by index {index} out of bounds"))
            })?;
            key.push(value.clone());
        }
        let value = row.get(aggregate_index).ok_or_else(|| {
            Error::Execution(format!("aggregate index {aggregate_index} out of bounds"))
        })?;

        match maxima.entry(key) {
            Entry::Occupied(mut entry) => {
                if value > entry.get() {
                    entry.insert(value.clone());
                }
            }
            Entry::Vacant(entry) => {
                key_order.push(entry.key().clone());
                entry.insert(value.clone());
            }
        }
    }

    Ok(key_order
        .into_iter()
        .map(|key| {
            let max = maxima[&key].clone();
            let mut row = key;
            row.push(max);
            row
        })
        .collect())
}
