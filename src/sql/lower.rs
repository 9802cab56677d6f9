//! Parse-tree lowering
//!
//! The SQL parser is an external library; what reaches this module is its
//! already-parsed, owned JSON tree (libpg_query shape). Lowering does not
//! interpret SQL syntax - it walks the tree by key names and emits the
//! statement tree of [`crate::sql::ast`].
//!
//! Both a bare statement node (`{"SelectStmt": ...}`) and a full parse
//! result (`{"stmts": [{"stmt": ...}]}`) are accepted.

use crate::error::{Error, Result};
use crate::sql::ast::{
    AggregateFunction, CompareOp, CreateTableAsStatement, CreateTableStatement, DeleteStatement,
    InsertStatement, ScalarFunction, SelectStatement, Statement, WhereClause,
};
use serde_json::Value;

/// Lower a parse tree into a [`Statement`].
pub fn lower_statement(tree: &Value) -> Result<Statement> {
    let node = unwrap_root(tree)?;
    if let Some(v) = node.get("CreateStmt") {
        Ok(Statement::CreateTable(lower_create_table(v)?))
    } else if let Some(v) = node.get("InsertStmt") {
        Ok(Statement::Insert(lower_insert(v)?))
    } else if let Some(v) = node.get("SelectStmt") {
        Ok(Statement::Select(lower_select(v)?))
    } else if let Some(v) = node.get("DeleteStmt") {
        Ok(Statement::Delete(lower_delete(v)?))
    } else if let Some(v) = node.get("CreateTableAsStmt") {
        Ok(Statement::CreateTableAs(lower_ctas(v)?))
    } else {
        Err(Error::UnknownStatement)
    }
}

fn unwrap_root(tree: &Value) -> Result<&Value> {
    match tree.get("stmts") {
        Some(stmts) => {
            let first = stmts.get(0).ok_or_else(|| missing("stmts[0]"))?;
            first.get("stmt").ok_or_else(|| missing("stmts[0].stmt"))
        }
        None => Ok(tree),
    }
}

// ===== tree access helpers =====

fn missing(key: &str) -> Error {
    Error::Parse(format!("missing key '{key}' in parse tree"))
}

fn get<'a>(node: &'a Value, key: &str) -> Result<&'a Value> {
    node.get(key).ok_or_else(|| missing(key))
}

fn get_str<'a>(node: &'a Value, key: &str) -> Result<&'a str> {
    get(node, key)?
        .as_str()
        .ok_or_else(|| Error::Parse(format!("key '{key}' is not a string")))
}

fn get_array<'a>(node: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    get(node, key)?
        .as_array()
        .ok_or_else(|| Error::Parse(format!("key '{key}' is not an array")))
}

/// The "..." of a `{"String": {"sval": "..."}}` node.
fn string_node(node: &Value) -> Result<&str> {
    get_str(get(node, "String")?, "sval")
}

/// Integer value of an A_Const. libpg_query omits protobuf defaults, so a
/// constant 0 arrives as `{"ival": {}}`; a missing inner `ival` reads as 0.
fn const_int(aconst: &Value) -> Result<i64> {
    let ival = get(aconst, "ival")?;
    Ok(ival.get("ival").and_then(Value::as_i64).unwrap_or(0))
}

/// Stringify an A_Const: integers in decimal, string constants verbatim,
/// anything else as its raw JSON.
fn const_string(aconst: &Value) -> String {
    if let Some(ival) = aconst.get("ival") {
        return ival
            .get("ival")
            .and_then(Value::as_i64)
            .unwrap_or(0)
            .to_string();
    }
    if let Some(sval) = aconst
        .get("sval")
        .and_then(|v| v.get("sval"))
        .and_then(Value::as_str)
    {
        return sval.to_string();
    }
    aconst.to_string()
}

/// Last field of a ColumnRef, e.g. the `k` of `l.k`.
fn column_ref_last_field(cref: &Value) -> Result<String> {
    let fields = get_array(cref, "fields")?;
    let last = fields.last().ok_or_else(|| missing("fields"))?;
    Ok(string_node(last)?.to_string())
}

/// All fields of a ColumnRef joined with '.', or `None` for `*`.
fn column_ref_name(cref: &Value) -> Result<Option<String>> {
    let fields = get_array(cref, "fields")?;
    let mut parts = Vec::with_capacity(fields.len());
    for field in fields {
        if field.get("A_Star").is_some() {
            return Ok(None);
        }
        parts.push(string_node(field)?.to_string());
    }
    Ok(Some(parts.join(".")))
}

fn relname(node: &Value) -> Result<String> {
    Ok(get_str(get(node, "relation")?, "relname")?.to_string())
}

fn lower_where(expr: &Value) -> Result<WhereClause> {
    let a_expr = get(expr, "A_Expr")?;
    let name = get_array(a_expr, "name")?;
    let op = string_node(name.first().ok_or_else(|| missing("name[0]"))?)?;
    let column = column_ref_last_field(get(get(a_expr, "lexpr")?, "ColumnRef")?)?;
    let value = const_string(get(get(a_expr, "rexpr")?, "A_Const")?);
    Ok(WhereClause {
        column,
        op: CompareOp::parse(op)?,
        value,
    })
}

// ===== statement lowerings =====

fn lower_create_table(node: &Value) -> Result<CreateTableStatement> {
    let table_name = relname(node)?;
    let mut columns = Vec::new();

    for elt in get_array(node, "tableElts")? {
        let def = get(elt, "ColumnDef")?;
        let name = get_str(def, "colname")?.to_string();
        let type_name = get(def, "typeName")?;
        let names = get_array(type_name, "names")?;
        // Type names come qualified as ["pg_catalog", "int4"].
        let raw = string_node(names.get(1).ok_or_else(|| missing("names[1]"))?)?;

        let label = match raw {
            "int4" => "INT".to_string(),
            "varchar" => {
                let typmods = get_array(type_name, "typmods")?;
                let first = typmods.first().ok_or_else(|| missing("typmods[0]"))?;
                let len = const_int(get(first, "A_Const")?)?;
                format!("VARCHAR({len})")
            }
            other => other.to_string(),
        };
        columns.push((name, label));
    }

    Ok(CreateTableStatement {
        table_name,
        columns,
    })
}

fn lower_insert(node: &Value) -> Result<InsertStatement> {
    let table_name = relname(node)?;
    let mut values = Vec::new();

    let select = get(get(node, "selectStmt")?, "SelectStmt")?;
    let lists = get_array(select, "valuesLists")?;
    if let Some(first) = lists.first() {
        for item in get_array(get(first, "List")?, "items")? {
            values.push(const_string(get(item, "A_Const")?));
        }
    }

    Ok(InsertStatement { table_name, values })
}

/// Lower the contents of a SelectStmt node.
pub fn lower_select(node: &Value) -> Result<SelectStatement> {
    let mut stmt = SelectStatement::default();

    let from = get_array(node, "fromClause")?;
    let from0 = from.first().ok_or_else(|| missing("fromClause[0]"))?;
    if let Some(range_var) = from0.get("RangeVar") {
        stmt.table_name = get_str(range_var, "relname")?.to_string();
    } else if let Some(join) = from0.get("JoinExpr") {
        stmt.table_name = get_str(get(get(join, "larg")?, "RangeVar")?, "relname")?.to_string();
        stmt.join_table =
            Some(get_str(get(get(join, "rarg")?, "RangeVar")?, "relname")?.to_string());
        let quals = get(get(join, "quals")?, "A_Expr")?;
        stmt.join_left_column = Some(column_ref_last_field(get(
            get(quals, "lexpr")?,
            "ColumnRef",
        )?)?);
        stmt.join_right_column = Some(column_ref_last_field(get(
            get(quals, "rexpr")?,
            "ColumnRef",
        )?)?);
        stmt.use_hash_join = true;
    } else {
        return Err(Error::Parse("unsupported FROM clause".to_string()));
    }

    let grouped = node.get("groupClause").is_some();
    let mut select_all = false;

    if let Some(targets) = node.get("targetList").and_then(Value::as_array) {
        for target in targets {
            let value = get(get(target, "ResTarget")?, "val")?;
            if let Some(cref) = value.get("ColumnRef") {
                match column_ref_name(cref)? {
                    Some(name) => stmt.columns.push(name),
                    None => select_all = true,
                }
            } else if let Some(call) = value.get("FuncCall") {
                let funcname = get_array(call, "funcname")?;
                let function_name = string_node(funcname.last().ok_or_else(|| missing("funcname"))?)?.to_string();
                let args = get_array(call, "args")?;

                if grouped {
                    // Aggregate over the first argument only.
                    let first = args.first().ok_or_else(|| missing("args[0]"))?;
                    let column_name = column_ref_last_field(get(first, "ColumnRef")?)?;
                    stmt.aggregate_functions.push(AggregateFunction {
                        function_name,
                        column_name,
                    });
                } else {
                    let mut arguments = Vec::with_capacity(args.len());
                    for arg in args {
                        if let Some(cref) = arg.get("ColumnRef") {
                            arguments.push(column_ref_last_field(cref)?);
                        } else if let Some(aconst) = arg.get("A_Const") {
                            arguments.push(const_string(aconst));
                        } else {
                            return Err(Error::Parse(
                                "unsupported function argument".to_string(),
                            ));
                        }
                    }
                    stmt.scalar_functions.push(ScalarFunction {
                        function_name,
                        arguments,
                    });
                }
            } else {
                return Err(Error::Parse("unsupported select target".to_string()));
            }
        }
    }

    if let Some(groups) = node.get("groupClause").and_then(Value::as_array) {
        for group in groups {
            stmt.group_by
                .push(column_ref_last_field(get(group, "ColumnRef")?)?);
        }
    }

    if let Some(where_clause) = node.get("whereClause") {
        stmt.where_clause = Some(lower_where(where_clause)?);
    }

    if let Some(sorts) = node.get("sortClause").and_then(Value::as_array) {
        if let Some(sort) = sorts.first() {
            let cref = get(get(get(sort, "SortBy")?, "node")?, "ColumnRef")?;
            stmt.order_by = column_ref_name(cref)?;
        }
    }

    if let Some(limit) = node.get("limitCount") {
        let value = const_int(get(limit, "A_Const")?)?;
        stmt.limit = Some(value.max(0) as usize);
    }

    if select_all {
        stmt.columns.clear();
    }
    Ok(stmt)
}

fn lower_delete(node: &Value) -> Result<DeleteStatement> {
    let table_name = relname(node)?;
    let where_clause = match node.get("whereClause") {
        Some(expr) => Some(lower_where(expr)?),
        None => None,
    };
    Ok(DeleteStatement {
        table_name,
        where_clause,
    })
}

fn lower_ctas(node: &Value) -> Result<CreateTableAsStatement> {
    let table_name = get_str(get(get(node, "into")?, "rel")?, "relname")?.to_string();
    let select = lower_select(get(get(node, "query")?, "SelectStmt")?)?;
    Ok(CreateTableAsStatement { table_name, select })
}
