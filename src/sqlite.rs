use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::{debug, info};

use crate::error::{DbboxError, Result};
use crate::schema::{is_id_column, quote_identifier, ColumnDefinition, ID_COLUMN};

/// File extension of every database managed by dbbox.
pub const DB_EXTENSION: &str = "db";

/// A single SQLite value as read back from a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            // Debug keeps the fractional part, so 1.0 stays "1.0".
            Value::Real(r) => write!(f, "{r:?}"),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => f.write_str(&hex(b)),
        }
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Column names plus rows, in the order SQLite produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub position: i64,
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

impl ColumnInfo {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            position: row.get(0)?,
            name: row.get(1)?,
            data_type: row.get(2)?,
            not_null: row.get::<_, i64>(3)? != 0,
            default_value: row.get(4)?,
            is_primary_key: row.get::<_, i64>(5)? != 0,
        })
    }
}

/// Returns `<dir>/<name>.db`, rejecting names that are not a plain file stem.
pub fn database_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(DbboxError::Validation(format!(
            "Invalid database name '{}'",
            name.escape_default()
        )));
    }
    Ok(dir.join(format!("{name}.{DB_EXTENSION}")))
}

/// Manager for a single named database file.
///
/// The connection is closed when the manager is dropped, so holding a manager
/// for the length of one command is enough to guarantee cleanup.
#[derive(Debug)]
pub struct DbManager {
    name: String,
    path: PathBuf,
    connection: Option<Connection>,
}

impl DbManager {
    /// Creates a manager in the closed state. No file is touched.
    pub fn new(dir: &Path, name: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            path: database_path(dir, name)?,
            connection: None,
        })
    }

    /// Creates a manager and connects it, creating `dir` if needed.
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        let mut manager = Self::new(dir, name)?;
        manager.connect()?;
        Ok(manager)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Opens the connection. Connecting an open manager is a no-op.
    pub fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!(path = %self.path.display(), "opening database");
        let connection =
            Connection::open(&self.path).map_err(DbboxError::operation("opening database"))?;
        self.connection = Some(connection);
        Ok(())
    }

    pub fn close(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            debug!(path = %self.path.display(), "closing database");
            connection
                .close()
                .map_err(|(_, e)| DbboxError::operation("closing database")(e))?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .ok_or_else(|| DbboxError::NotOpen(self.name.clone()))
    }

    /// User tables, sorted by name.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
                 ORDER BY name",
            )
            .map_err(DbboxError::operation("listing tables"))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<String>>>())
            .map_err(DbboxError::operation("listing tables"))?;
        Ok(names)
    }

    /// Column descriptors in declaration order, or `None` if the table does not exist.
    pub fn table_info(&self, table: &str) -> Result<Option<Vec<ColumnInfo>>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT cid, name, type, \"notnull\", dflt_value, pk \
                 FROM pragma_table_info(?1) ORDER BY cid",
            )
            .map_err(DbboxError::operation("reading table info"))?;
        let columns = stmt
            .query_map([table], ColumnInfo::from_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .map_err(DbboxError::operation("reading table info"))?;
        Ok((!columns.is_empty()).then_some(columns))
    }

    /// Creates the table unless one with that name already exists.
    ///
    /// An existing table is left as is even if its columns differ.
    pub fn create_table(&self, table: &str, columns: &[ColumnDefinition]) -> Result<()> {
        let conn = self.conn()?;
        let column_sql = columns
            .iter()
            .map(ColumnDefinition::to_sql)
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({column_sql})",
            quote_identifier(table)?
        );
        debug!(%sql, "creating table");
        conn.execute(&sql, [])
            .map_err(DbboxError::operation("creating table"))?;
        info!(table, "table created");
        Ok(())
    }

    /// Names of the columns values bind to, in declaration order.
    fn value_columns(&self, table: &str) -> Result<Vec<String>> {
        let info = self.table_info(table)?.ok_or_else(|| {
            DbboxError::Validation(format!(
                "Table '{table}' does not exist. Create it first with --schema"
            ))
        })?;
        Ok(info
            .into_iter()
            .map(|c| c.name)
            .filter(|name| !is_id_column(name))
            .collect())
    }

    fn check_value_count(columns: &[String], values: &[String]) -> Result<()> {
        if columns.len() != values.len() {
            return Err(DbboxError::Validation(format!(
                "Expected {} values for columns [{}], got {}",
                columns.len(),
                columns.join(", "),
                values.len()
            )));
        }
        Ok(())
    }

    /// Inserts one row and returns its id.
    pub fn insert(&self, table: &str, values: &[String]) -> Result<i64> {
        let columns = self.value_columns(table)?;
        Self::check_value_count(&columns, values)?;

        let table_sql = quote_identifier(table)?;
        let sql = if columns.is_empty() {
            format!("INSERT INTO {table_sql} DEFAULT VALUES")
        } else {
            let names = columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Result<Vec<_>>>()?
                .join(", ");
            let placeholders = (1..=values.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("INSERT INTO {table_sql} ({names}) VALUES ({placeholders})")
        };

        let conn = self.conn()?;
        debug!(%sql, "inserting row");
        conn.execute(&sql, params_from_iter(values))
            .map_err(DbboxError::operation("inserting row"))?;
        let id = conn.last_insert_rowid();
        info!(table, id, "row inserted");
        Ok(id)
    }

    /// All rows, or the row with the given id.
    ///
    /// No `ORDER BY` is applied: rows come back in whatever order SQLite
    /// scans them, which is usually insertion order but is not guaranteed.
    pub fn select(&self, table: &str, id: Option<i64>) -> Result<ResultSet> {
        let conn = self.conn()?;
        let table_sql = quote_identifier(table)?;
        let sql = match id {
            Some(_) => format!("SELECT * FROM {table_sql} WHERE \"{ID_COLUMN}\" = ?1"),
            None => format!("SELECT * FROM {table_sql}"),
        };
        debug!(%sql, "selecting rows");

        let select = || -> rusqlite::Result<ResultSet> {
            let mut stmt = conn.prepare(&sql)?;
            let columns: Vec<String> =
                stmt.column_names().into_iter().map(String::from).collect();
            let width = columns.len();
            let mut rows = match id {
                Some(id) => stmt.query(params![id])?,
                None => stmt.query([])?,
            };
            let mut result = ResultSet {
                columns,
                rows: Vec::new(),
            };
            while let Some(row) = rows.next()? {
                let values = (0..width)
                    .map(|i| row.get_ref(i).map(Value::from))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                result.rows.push(values);
            }
            Ok(result)
        };
        select().map_err(DbboxError::operation("selecting rows"))
    }

    /// Replaces every non-id value of a row. Returns the number of rows changed.
    pub fn update(&self, table: &str, id: i64, values: &[String]) -> Result<usize> {
        let columns = self.value_columns(table)?;
        if columns.is_empty() {
            return Err(DbboxError::Validation(format!(
                "Table '{table}' has no columns to update"
            )));
        }
        Self::check_value_count(&columns, values)?;

        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, c)| Ok(format!("{} = ?{}", quote_identifier(c)?, i + 1)))
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE \"{ID_COLUMN}\" = ?{}",
            quote_identifier(table)?,
            values.len() + 1
        );

        let mut bound: Vec<rusqlite::types::Value> = values
            .iter()
            .map(|v| rusqlite::types::Value::Text(v.clone()))
            .collect();
        bound.push(rusqlite::types::Value::Integer(id));

        let conn = self.conn()?;
        debug!(%sql, "updating row");
        let changed = conn
            .execute(&sql, params_from_iter(bound))
            .map_err(DbboxError::operation("updating row"))?;
        info!(table, id, changed, "row updated");
        Ok(changed)
    }

    /// Deletes the row with the given id. Returns the number of rows removed.
    pub fn delete(&self, table: &str, id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let sql = format!(
            "DELETE FROM {} WHERE \"{ID_COLUMN}\" = ?1",
            quote_identifier(table)?
        );
        debug!(%sql, "deleting row");
        let removed = conn
            .execute(&sql, params![id])
            .map_err(DbboxError::operation("deleting row"))?;
        info!(table, id, removed, "row deleted");
        Ok(removed)
    }

    pub fn drop_table(&self, table: &str) -> Result<()> {
        let conn = self.conn()?;
        let sql = format!("DROP TABLE IF EXISTS {}", quote_identifier(table)?);
        debug!(%sql, "dropping table");
        conn.execute(&sql, [])
            .map_err(DbboxError::operation("dropping table"))?;
        info!(table, "table dropped");
        Ok(())
    }

    /// Closes the connection and deletes the database file.
    ///
    /// Returns whether a file was actually removed.
    pub fn drop_database(&mut self) -> Result<bool> {
        self.close()?;
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        info!(path = %self.path.display(), "database dropped");
        Ok(true)
    }
}
