//! Hash join
//!
//! The smaller input becomes the build side: its rows populate a multimap
//! keyed by the join column's string value. The other side streams against
//! the map. Emitted rows are always left columns followed by right columns,
//! regardless of which side was built.

use std::collections::HashMap;

/// Join two row sets on `left_rows[i][left_key] == right_rows[j][right_key]`.
///
/// Every matching pair produces exactly one output row.
pub fn hash_join(
    left_rows: &[Vec<String>],
    right_rows: &[Vec<String>],
    left_key: usize,
    right_key: usize,
) -> Vec<Vec<String>> {
    let build_left = left_rows.len() <= right_rows.len();
    let (build_rows, build_key, probe_rows, probe_key) = if build_left {
        (left_rows, left_key, right_rows, right_key)
    } else {
        (right_rows, right_key, left_rows, left_key)
    };

    let mut table: HashMap<&str, Vec<&Vec<String>>> = HashMap::new();
    for row in build_rows {
        table.entry(row[build_key].as_str()).or_default().push(row);
    }

    let mut joined = Vec::new();
    for probe_row in probe_rows {
        if let Some(matches) = table.get(probe_row[probe_key].as_str()) {
            for build_row in matches {
                let (left, right) = if build_left {
                    (*build_row, probe_row)
                } else {
                    (probe_row, *build_row)
                };
                let mut row = left.clone();
                row.extend(right.iter().cloned());
                joined.push(row);
            }
        }
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_matching_pairs_emitted_once() {
        let left = rows(&[&["1", "A"], &["2", "B"]]);
        let right = rows(&[&["2", "X"], &["2", "Y"], &["3", "Z"]]);

        let joined = hash_join(&left, &right, 0, 0);
        assert_eq!(
            joined,
            rows(&[&["2", "B", "2", "X"], &["2", "B", "2", "Y"]])
        );
    }

    #[test]
    fn test_left_right_order_is_preserved_when_right_builds() {
        // Right side is smaller, so it becomes the build side; output
        // columns must still read left-then-right.
        let left = rows(&[&["1", "A"], &["2", "B"], &["2", "C"]]);
        let right = rows(&[&["2", "X"]]);

        let joined = hash_join(&left, &right, 0, 0);
        assert_eq!(
            joined,
            rows(&[&["2", "B", "2", "X"], &["2", "C", "2", "X"]])
        );
    }

    #[test]
    fn test_no_matches() {
        let left = rows(&[&["1"]]);
        let right = rows(&[&["2"]]);
        assert!(hash_join(&left, &right, 0, 0).is_empty());
    }

    #[test]
    fn test_cartesian_product_on_duplicate_keys() {
        let left = rows(&[&["k", "l1"], &["k", "l2"]]);
        let right = rows(&[&["k", "r1"], &["k", "r2"]]);
        let joined = hash_join(&left, &right, 0, 0);
        assert_eq!(joined.len(), 4);
        for row in &joined {
            assert_eq!(row[0], "k");
            assert_eq!(row[2], "k");
            assert!(row[1].starts_with('l'));
            assert!(row[3].starts_with('r'));
        }
    }
}
