//! SQL statement tree
//!
//! This module defines the tagged statement representation consumed by the
//! query executor. It covers exactly the five supported statement shapes;
//! everything else is rejected by the lowering.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;

/// A SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
    /// INSERT statement
    Insert(InsertStatement),
    /// SELECT statement
    Select(SelectStatement),
    /// DELETE statement
    Delete(DeleteStatement),
    /// CREATE TABLE AS SELECT statement
    CreateTableAs(CreateTableAsStatement),
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub table_name: String,
    /// Column definitions as (name, type label) pairs, where the label is
    /// `"INT"` or `"VARCHAR(N)"`
    pub columns: Vec<(String, String)>,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table name
    pub table_name: String,
    /// Values in column order, carried as strings
    pub values: Vec<String>,
}

/// Comparison operator of a WHERE clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Gt,
    Lt,
    Le,
    Ge,
    Ne,
}

impl CompareOp {
    /// Parse the operator spelling used in the parse tree. libpg_query
    /// spells `!=` as `<>`; both map to [`CompareOp::Ne`].
    pub fn parse(op: &str) -> Result<Self> {
        match op {
            "=" => Ok(CompareOp::Eq),
            ">" => Ok(CompareOp::Gt),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Le),
            ">=" => Ok(CompareOp::Ge),
            "!=" | "<>" => Ok(CompareOp::Ne),
            other => Err(Error::Parse(format!("unsupported operator '{other}'"))),
        }
    }

    /// Apply the operator to two values.
    ///
    /// Every comparison is a string comparison, including on INT columns;
    /// callers that need numeric ordering must zero-pad.
    pub fn compare(&self, left: &str, right: &str) -> bool {
        let ordering = left.cmp(right);
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Ne => ordering != Ordering::Equal,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Ne => "!=",
        };
        write!(f, "{op}")
    }
}

/// A `column op value` WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub column: String,
    pub op: CompareOp,
    pub value: String,
}

/// An aggregate function call in the select list
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFunction {
    /// Function name as written (retained but not dispatched on)
    pub function_name: String,
    /// The aggregated column (first argument only)
    pub column_name: String,
}

/// A scalar function call in the select list
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFunction {
    /// Function name: substr, upper or lower
    pub function_name: String,
    /// First argument is the input column; the rest are literals
    pub arguments: Vec<String>,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    /// Base table name
    pub table_name: String,
    /// Projected column names; empty means all columns. With a JOIN present
    /// the names may be qualified as `"table.column"`.
    pub columns: Vec<String>,
    /// Optional WHERE clause
    pub where_clause: Option<WhereClause>,
    /// Optional ORDER BY column
    pub order_by: Option<String>,
    /// Optional LIMIT
    pub limit: Option<usize>,
    /// Joined table name
    pub join_table: Option<String>,
    /// Join column on the base table side
    pub join_left_column: Option<String>,
    /// Join column on the joined table side
    pub join_right_column: Option<String>,
    /// Set whenever a JOIN is present; the executor only has a hash join
    pub use_hash_join: bool,
    /// Aggregate calls (only the first is honored)
    pub aggregate_functions: Vec<AggregateFunction>,
    /// GROUP BY column names
    pub group_by: Vec<String>,
    /// Scalar function calls
    pub scalar_functions: Vec<ScalarFunction>,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table name
    pub table_name: String,
    /// Optional WHERE clause
    pub where_clause: Option<WhereClause>,
}

/// CREATE TABLE AS SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableAsStatement {
    /// New table name
    pub table_name: String,
    /// The embedded select
    pub select: SelectStatement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_op_parse() {
        assert_eq!(CompareOp::parse("=").unwrap(), CompareOp::Eq);
        assert_eq!(CompareOp::parse("<>").unwrap(), CompareOp::Ne);
        assert_eq!(CompareOp::parse("!=").unwrap(), CompareOp::Ne);
        assert!(CompareOp::parse("~~").is_err());
    }

    #[test]
    fn test_string_comparison_semantics() {
        assert!(CompareOp::Gt.compare("2", "1"));
        assert!(CompareOp::Le.compare("abc", "abd"));
        assert!(CompareOp::Ne.compare("a", "b"));
        // The documented string-ordering quirk: "10" sorts below "9".
        assert!(CompareOp::Lt.compare("10", "9"));
    }
}
