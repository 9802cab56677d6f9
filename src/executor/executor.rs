//! Query executor for pagecask
//!
//! Executes statement trees against the record store. The executor owns all
//! schema-aware work - packing and unpacking tuples, predicate evaluation,
//! hash joins, grouped aggregation and scalar functions - and delegates all
//! persistence to [`RecordStore`].
//!
//! Every WHERE, ORDER BY and aggregate comparison is a *string* comparison,
//! including on INT columns; callers that need numeric ordering must
//! zero-pad.

use crate::catalog::{Column, DataType, TableSchema};
use crate::error::{Error, Result};
use crate::executor::aggregate::group_max;
use crate::executor::codec::{pack_record, unpack_record};
use crate::executor::join::hash_join;
use crate::sql::ast::{
    CreateTableAsStatement, CreateTableStatement, DeleteStatement, InsertStatement,
    SelectStatement, Statement, WhereClause,
};
use crate::storage::{RecordId, RecordStore, ScanOptions};
use tracing::{debug, warn};

/// Result of executing a statement
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Column names of the result set
    pub columns: Vec<String>,
    /// Result rows as positional strings
    pub rows: Vec<Vec<String>>,
    /// Number of rows affected by a mutation
    pub affected_rows: usize,
    /// Human-readable status message
    pub message: Option<String>,
}

impl QueryResult {
    /// An empty result
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            message: None,
        }
    }

    /// A result carrying only a status message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::empty()
        }
    }

    /// A result carrying an affected-row count and a status message
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            message: Some(message.into()),
            ..Self::empty()
        }
    }
}

/// The query executor; borrows the store for its lifetime
pub struct QueryExecutor<'a> {
    storage: &'a mut RecordStore,
}

impl<'a> QueryExecutor<'a> {
    /// Create an executor over an open record store
    pub fn new(storage: &'a mut RecordStore) -> Self {
        Self { storage }
    }

    /// Execute a statement tree
    pub fn execute(&mut self, statement: Statement) -> Result<QueryResult> {
        match statement {
            Statement::CreateTable(stmt) => self.execute_create_table(&stmt),
            Statement::Insert(stmt) => self.execute_insert(&stmt),
            Statement::Select(stmt) => self.execute_select(&stmt),
            Statement::Delete(stmt) => self.execute_delete(&stmt),
            Statement::CreateTableAs(stmt) => self.execute_create_table_as(&stmt),
        }
    }

    fn execute_create_table(&mut self, stmt: &CreateTableStatement) -> Result<QueryResult> {
        let mut columns = Vec::with_capacity(stmt.columns.len());
        for (name, label) in &stmt.columns {
            columns.push(Column::new(name.clone(), DataType::parse_label(label)?));
        }
        let schema = TableSchema::new(columns)?;
        self.storage.create_table(&stmt.table_name, schema)?;
        Ok(QueryResult::with_message(format!(
            "Table '{}' created",
            stmt.table_name
        )))
    }

    fn execute_insert(&mut self, stmt: &InsertStatement) -> Result<QueryResult> {
        if stmt.values.is_empty() {
            return Err(Error::Execution(format!(
                "no values provided for insert into '{}'",
                stmt.table_name
            )));
        }
        let schema = self.storage.schema(&stmt.table_name)?.clone();
        let record = pack_record(&schema, &stmt.values)?;
        let id = self.storage.insert(&stmt.table_name, &record)?;
        Ok(QueryResult::with_affected_rows(
            1,
            format!("Inserted record {} into '{}'", id, stmt.table_name),
        ))
    }

    /// Build the raw-record predicate for a WHERE clause.
    fn build_filter(
        schema: &TableSchema,
        clause: &WhereClause,
    ) -> Result<impl Fn(&[u8]) -> bool> {
        let index = schema
            .column_index(&clause.column)
            .ok_or_else(|| Error::UnknownColumn(clause.column.clone()))?;
        let schema = schema.clone();
        let op = clause.op;
        let value = clause.value.clone();

        Ok(move |record: &[u8]| match unpack_record(&schema, record) {
            Ok(fields) => op.compare(&fields[index], &value),
            Err(_) => false,
        })
    }

    fn execute_select(&mut self, stmt: &SelectStatement) -> Result<QueryResult> {
        let schema = self.storage.schema(&stmt.table_name)?.clone();

        // Filtered scan of the base table.
        let left_raws = {
            let filter_holder;
            let mut opts = ScanOptions::default();
            if let Some(clause) = &stmt.where_clause {
                filter_holder = Self::build_filter(&schema, clause)?;
                opts.filter = Some(&filter_holder);
            }
            self.storage.scan(&stmt.table_name, opts)?
        };

        // The projection list; aggregate and scalar columns are appended to
        // it as they are computed.
        let mut columns = stmt.columns.clone();

        // Join, or plain unpack.
        let mut result_schema: Vec<String>;
        let mut rows: Vec<Vec<String>>;
        if let Some(join_table) = &stmt.join_table {
            let join_schema = self.storage.schema(join_table)?.clone();
            let right_raws = self.storage.scan_all(join_table)?;

            let left_rows = unpack_all(&schema, &left_raws)?;
            let right_rows = unpack_all(&join_schema, &right_raws)?;

            let left_column = stmt
                .join_left_column
                .as_deref()
                .ok_or_else(|| Error::Execution("join without a left column".to_string()))?;
            let right_column = stmt
                .join_right_column
                .as_deref()
                .ok_or_else(|| Error::Execution("join without a right column".to_string()))?;
            let left_key = schema
                .column_index(left_column)
                .ok_or_else(|| Error::UnknownColumn(left_column.to_string()))?;
            let right_key = join_schema
                .column_index(right_column)
                .ok_or_else(|| Error::UnknownColumn(right_column.to_string()))?;

            rows = hash_join(&left_rows, &right_rows, left_key, right_key);

            // Joined result columns are qualified with their table name.
            result_schema = schema
                .column_names()
                .iter()
                .map(|c| format!("{}.{}", stmt.table_name, c))
                .collect();
            result_schema.extend(
                join_schema
                    .column_names()
                    .iter()
                    .map(|c| format!("{}.{}", join_table, c)),
            );
        } else {
            rows = unpack_all(&schema, &left_raws)?;
            result_schema = schema
                .column_names()
                .iter()
                .map(|c| c.to_string())
                .collect();
        }

        // Grouped aggregation: only the first aggregate entry is honored,
        // and whatever it is named it computes the per-group string maximum.
        if let Some(aggregate) = stmt.aggregate_functions.first() {
            if !aggregate.function_name.eq_ignore_ascii_case("max") {
                warn!(
                    function = %aggregate.function_name,
                    "aggregate is not implemented; computing string maximum"
                );
            }
            let mut group_indices = Vec::with_capacity(stmt.group_by.len());
            for group_column in &stmt.group_by {
                group_indices.push(
                    schema
                        .column_index(group_column)
                        .ok_or_else(|| Error::UnknownColumn(group_column.clone()))?,
                );
            }
            let aggregate_index = schema
                .column_index(&aggregate.column_name)
                .ok_or_else(|| Error::UnknownColumn(aggregate.column_name.clone()))?;

            rows = group_max(&rows, &group_indices, aggregate_index)?;

            let aggregate_name =
                format!("{}({})", aggregate.function_name, aggregate.column_name);
            result_schema = stmt.group_by.clone();
            result_schema.push(aggregate_name.clone());
            if !columns.is_empty() {
                columns.push(aggregate_name);
            }
        }

        // Scalar functions each append a computed column named fn(col).
        for function in &stmt.scalar_functions {
            let input_column = function
                .arguments
                .first()
                .ok_or_else(|| Error::Execution("scalar function without arguments".to_string()))?;
            let input_index = result_schema
                .iter()
                .position(|c| c == input_column)
                .ok_or_else(|| Error::UnknownColumn(input_column.clone()))?;

            for row in &mut rows {
                let computed =
                    apply_scalar(&function.function_name, &function.arguments, &row[input_index])?;
                row.push(computed);
            }
            let name = format!("{}({})", function.function_name, input_column);
            result_schema.push(name.clone());
            if !columns.is_empty() {
                columns.push(name);
            }
        }

        // Projection by name against the current result schema.
        let (out_columns, mut out_rows) = if columns.is_empty() {
            (result_schema, rows)
        } else {
            let mut indices = Vec::with_capacity(columns.len());
            for name in &columns {
                indices.push(
                    result_schema
                        .iter()
                        .position(|c| c == name)
                        .ok_or_else(|| Error::UnknownColumn(name.clone()))?,
                );
            }
            let projected = rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect();
            (columns, projected)
        };

        // LIMIT keeps the first N rows in scan order, before any sorting -
        // the historical pipeline order.
        if let Some(limit) = stmt.limit {
            out_rows.truncate(limit);
        }

        // ORDER BY sorts by string comparison. A column that is not in the
        // projected result set (e.g. a JOIN-qualified name that was never
        // projected) silently leaves the rows unsorted.
        if let Some(order_column) = &stmt.order_by {
            match out_columns.iter().position(|c| c == order_column) {
                Some(index) => out_rows.sort_by(|a, b| a[index].cmp(&b[index])),
                None => debug!(column = %order_column, "ORDER BY column not in result set"),
            }
        }

        Ok(QueryResult {
            columns: out_columns,
            rows: out_rows,
            affected_rows: 0,
            message: None,
        })
    }

    fn execute_delete(&mut self, stmt: &DeleteStatement) -> Result<QueryResult> {
        let schema = self.storage.schema(&stmt.table_name)?.clone();

        let mut ids: Vec<RecordId> = Vec::new();
        {
            let mut collect = |id: RecordId, _record: &[u8]| {
                ids.push(id);
                true
            };
            let filter_holder;
            let mut opts = ScanOptions {
                callback: Some(&mut collect),
                ..Default::default()
            };
            if let Some(clause) = &stmt.where_clause {
                filter_holder = Self::build_filter(&schema, clause)?;
                opts.filter = Some(&filter_holder);
            }
            self.storage.scan(&stmt.table_name, opts)?;
        }

        // Each delete may trigger a vacuum that renumbers later ids, so some
        // of the collected ids can fail; report what actually succeeded.
        let mut deleted = 0;
        for id in ids {
            if self.storage.delete(&stmt.table_name, id).is_ok() {
                deleted += 1;
            }
        }
        Ok(QueryResult::with_affected_rows(
            deleted,
            format!("{deleted} row(s) deleted from '{}'", stmt.table_name),
        ))
    }

    fn execute_create_table_as(&mut self, stmt: &CreateTableAsStatement) -> Result<QueryResult> {
        let result = self.execute_select(&stmt.select)?;

        // The new table inherits the *source* table's full schema, not the
        // projected columns.
        let schema = self.storage.schema(&stmt.select.table_name)?.clone();
        self.storage.create_table(&stmt.table_name, schema.clone())?;

        for row in &result.rows {
            let record = pack_record(&schema, row)?;
            self.storage.insert(&stmt.table_name, &record)?;
        }
        Ok(QueryResult::with_affected_rows(
            result.rows.len(),
            format!(
                "Table '{}' created with {} row(s)",
                stmt.table_name,
                result.rows.len()
            ),
        ))
    }
}

fn unpack_all(schema: &TableSchema, raws: &[Vec<u8>]) -> Result<Vec<Vec<String>>> {
    raws.iter().map(|raw| unpack_record(schema, raw)).collect()
}

/// Apply a scalar function to one input value.
fn apply_scalar(name: &str, arguments: &[String], input: &str) -> Result<String> {
    match name.to_ascii_lowercase().as_str() {
        "upper" => Ok(input.to_ascii_uppercase()),
        "lower" => Ok(input.to_ascii_lowercase()),
        "substr" => {
            let start = scalar_int_argument(arguments, 1)?;
            let length = scalar_int_argument(arguments, 2)?;
            let bytes = input.as_bytes();
            let start = start.min(bytes.len());
            let end = start.saturating_add(length).min(bytes.len());
            Ok(String::from_utf8_lossy(&bytes[start..end]).into_owned())
        }
        other => Err(Error::Execution(format!(
            "unknown scalar function '{other}'"
        ))),
    }
}

fn scalar_int_argument(arguments: &[String], position: usize) -> Result<usize> {
    let raw = arguments
        .get(position)
        .ok_or_else(|| Error::Execution("substr requires start and length".to_string()))?;
    let value: i64 = raw
        .parse()
        .map_err(|_| Error::InvalidInteger(raw.clone()))?;
    Ok(value.max(0) as usize)
}
