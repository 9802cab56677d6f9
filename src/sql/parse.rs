//! SQL text front-end
//!
//! Parsing proper is delegated to `pg_parse`, the Rust binding of the
//! PostgreSQL parser library. Its syntax tree is serialized to an owned
//! JSON value and handed to the lowering; nothing of the parser's own
//! types leaks into the statement tree.

use crate::error::{Error, Result};
use crate::sql::ast::Statement;
use crate::sql::lower;

/// Parse a single SQL statement and lower it into a [`Statement`].
pub fn parse_statement(sql: &str) -> Result<Statement> {
    let (nodes, raw) = pg_parse::parse_debug(sql).map_err(|e| Error::Parse(format!("{e:?}")))?;
    if nodes.is_empty() {
        return Err(Error::Parse("empty statement".to_string()));
    }
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let tree = parsed["stmts"][0]["stmt"].clone();
    lower::lower_statement(&tree)
}
