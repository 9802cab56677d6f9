//! pagecask - storage CLI
//!
//! Line-oriented dispatcher over the record store and the query executor.
//! Every failure prints a single diagnostic line; the process exits 0 on
//! `exit`/`quit`.

use std::io::{self, Write};

use pagecask::catalog::{Column, DataType, TableSchema};
use pagecask::executor::{pack_record, unpack_record, QueryExecutor, QueryResult};
use pagecask::sql;
use pagecask::storage::{RecordId, RecordStore, ScanOptions};
use pagecask::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Print help message
fn print_help() {
    println!(
        r#"pagecask CLI - available commands:
  open <path>                              - Open storage at the given directory
  close                                    - Close the storage
  create <name> <col>:<type>[,<col>:<type>]* - Create a table (INT or VARCHAR(N))
  drop <name>                              - Drop a table
  list                                     - List all tables
  insert <table> <v1>,<v2>,...             - Insert a record
  get <table> <id>                         - Read a record by id
  update <table> <id> <v1>,<v2>,...        - Update a record
  delete <table> <id>                      - Delete a record
  scan <table> [--projection i1,i2,...]    - Scan a table (projection is byte indices)
  find <table> <key>                       - Index lookup by first-column key
  vacuum <table>                           - Rebuild a table without tombstones
  flush                                    - Persist all index buckets
  --query "<sql>"                          - Run a SQL statement
  help                                     - Show this help
  exit / quit                              - Exit"#
    );
}

/// Parse `name:TYPE[,name:TYPE]*` into a schema.
fn parse_schema(spec: &str) -> Result<TableSchema> {
    let mut columns = Vec::new();
    for part in spec.split(',') {
        let (name, label) = part
            .split_once(':')
            .ok_or_else(|| Error::Parse(format!("bad column spec '{part}'")))?;
        columns.push(Column::new(name.trim(), DataType::parse_label(label.trim())?));
    }
    TableSchema::new(columns)
}

fn parse_values(spec: &str) -> Vec<String> {
    spec.split(',').map(|v| v.to_string()).collect()
}

fn parse_record_id(token: &str) -> Result<RecordId> {
    token
        .parse()
        .map_err(|_| Error::Parse(format!("bad record id '{token}'")))
}

/// Render a query result: a header line, the rows, and a count line.
fn print_result(result: &QueryResult) {
    if let Some(message) = &result.message {
        println!("{message}");
        return;
    }
    if !result.columns.is_empty() {
        println!("{}", result.columns.join(" | "));
    }
    for row in &result.rows {
        println!("{}", row.join(" | "));
    }
    println!("{} row(s)", result.rows.len());
}

fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

struct Session {
    storage: Option<RecordStore>,
}

impl Session {
    fn new() -> Self {
        Self { storage: None }
    }

    fn storage(&self) -> Result<&RecordStore> {
        self.storage.as_ref().ok_or(Error::StorageNotOpen)
    }

    fn storage_mut(&mut self) -> Result<&mut RecordStore> {
        self.storage.as_mut().ok_or(Error::StorageNotOpen)
    }

    fn dispatch(&mut self, line: &str) -> Result<()> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "help" => print_help(),
            "open" => {
                if rest.is_empty() {
                    return Err(Error::Parse("usage: open <path>".to_string()));
                }
                if self.storage.is_some() {
                    return Err(Error::Execution(
                        "storage already open; close it first".to_string(),
                    ));
                }
                self.storage = Some(RecordStore::open(rest)?);
                println!("Storage opened at {rest}");
            }
            "close" => {
                match self.storage.take() {
                    Some(mut store) => {
                        store.close()?;
                        println!("Storage closed");
                    }
                    None => return Err(Error::StorageNotOpen),
                }
            }
            "create" => {
                let (name, spec) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::Parse("usage: create <name> <col>:<type>,...".to_string()))?;
                let schema = parse_schema(spec.trim())?;
                self.storage_mut()?.create_table(name, schema)?;
                println!("Table '{name}' created");
            }
            "drop" => {
                if rest.is_empty() {
                    return Err(Error::Parse("usage: drop <name>".to_string()));
                }
                self.storage_mut()?.drop_table(rest)?;
                println!("Table '{rest}' dropped");
            }
            "list" => {
                let tables = self.storage()?.list_tables()?;
                if tables.is_empty() {
                    println!("No tables found");
                } else {
                    for table in tables {
                        println!("  {table}");
                    }
                }
            }
            "insert" => {
                let (table, values) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::Parse("usage: insert <table> <v1>,<v2>,...".to_string()))?;
                let store = self.storage_mut()?;
                let mut executor = QueryExecutor::new(store);
                let result = executor.execute(sql::Statement::Insert(sql::InsertStatement {
                    table_name: table.to_string(),
                    values: parse_values(values.trim()),
                }))?;
                print_result(&result);
            }
            "get" => {
                let (table, id) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::Parse("usage: get <table> <id>".to_string()))?;
                let store = self.storage()?;
                let record = store.get(table, parse_record_id(id.trim())?)?;
                match unpack_record(store.schema(table)?, &record) {
                    Ok(fields) => println!("{}", fields.join(",")),
                    Err(_) => println!("{}", hex_string(&record)),
                }
            }
            "update" => {
                let mut parts = rest.splitn(3, char::is_whitespace);
                let (table, id, values) = match (parts.next(), parts.next(), parts.next()) {
                    (Some(t), Some(i), Some(v)) => (t, i, v),
                    _ => {
                        return Err(Error::Parse(
                            "usage: update <table> <id> <v1>,<v2>,...".to_string(),
                        ))
                    }
                };
                let store = self.storage_mut()?;
                let schema = store.schema(table)?.clone();
                let record = pack_record(&schema, &parse_values(values.trim()))?;
                store.update(table, parse_record_id(id.trim())?, &record)?;
                println!("Record updated");
            }
            "delete" => {
                let (table, id) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::Parse("usage: delete <table> <id>".to_string()))?;
                self.storage_mut()?.delete(table, parse_record_id(id.trim())?)?;
                println!("Record deleted");
            }
            "scan" => {
                let mut parts = rest.split_whitespace();
                let table = parts
                    .next()
                    .ok_or_else(|| Error::Parse("usage: scan <table> [--projection i1,i2,...]".to_string()))?;
                let mut projection: Option<Vec<usize>> = None;
                if let Some("--projection") = parts.next() {
                    let indices = parts
                        .next()
                        .ok_or_else(|| Error::Parse("--projection needs indices".to_string()))?;
                    let parsed: std::result::Result<Vec<usize>, _> =
                        indices.split(',').map(|i| i.trim().parse()).collect();
                    projection = Some(parsed.map_err(|_| {
                        Error::Parse(format!("bad projection indices '{indices}'"))
                    })?);
                }

                let store = self.storage()?;
                let records = store.scan(
                    table,
                    ScanOptions {
                        projection: projection.as_deref(),
                        ..Default::default()
                    },
                )?;
                let schema = store.schema(table)?;
                for record in &records {
                    if projection.is_some() {
                        println!("{}", hex_string(record));
                    } else {
                        match unpack_record(schema, record) {
                            Ok(fields) => println!("{}", fields.join(",")),
                            Err(_) => println!("{}", hex_string(record)),
                        }
                    }
                }
                println!("{} record(s)", records.len());
            }
            "find" => {
                let (table, key) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| Error::Parse("usage: find <table> <key>".to_string()))?;
                let ids = self.storage()?.find(table, key.trim())?;
                if ids.is_empty() {
                    println!("No index entries");
                } else {
                    println!(
                        "{}",
                        ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
                    );
                }
            }
            "vacuum" => {
                if rest.is_empty() {
                    return Err(Error::Parse("usage: vacuum <table>".to_string()));
                }
                self.storage_mut()?.vacuum(rest)?;
                println!("Table '{rest}' vacuumed");
            }
            "flush" => {
                self.storage()?.flush()?;
                println!("Storage flushed");
            }
            "--query" => {
                let sql_text = rest.trim().trim_matches('"');
                if sql_text.is_empty() {
                    return Err(Error::Parse("usage: --query \"<sql>\"".to_string()));
                }
                let statement = sql::parse_statement(sql_text)?;
                let store = self.storage_mut()?;
                let mut executor = QueryExecutor::new(store);
                let result = executor.execute(statement)?;
                print_result(&result);
            }
            other => {
                println!("Unknown command: {other}");
                println!("Type 'help' for available commands");
            }
        }
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let mut session = Session::new();
    println!("pagecask CLI - type 'help' for available commands or 'exit' to quit");

    loop {
        print!("pagecask> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        if let Err(e) = session.dispatch(line) {
            println!("Error: {e}");
        }
    }

    // Dropping the session closes any open storage.
    println!("Goodbye!");
}
