//! Column specs of the form `name:TYPE` and SQL identifier quoting.

use crate::error::{DbboxError, Result};

/// Name of the row key every table carries.
pub const ID_COLUMN: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    AutoIncrement,
}

/// One column of a table being created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    /// Declared type, upper-cased and otherwise passed to SQLite untouched.
    pub data_type: String,
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            constraints: Vec::new(),
        }
    }

    /// The implicit `id INTEGER PRIMARY KEY AUTOINCREMENT` column.
    pub fn synthetic_id() -> Self {
        Self {
            name: ID_COLUMN.to_string(),
            data_type: "INTEGER".to_string(),
            constraints: vec![ColumnConstraint::PrimaryKey, ColumnConstraint::AutoIncrement],
        }
    }

    pub fn is_id(&self) -> bool {
        is_id_column(&self.name)
    }

    /// Renders the column as it appears inside `CREATE TABLE (...)`.
    pub fn to_sql(&self) -> Result<String> {
        let mut sql = quote_identifier(&self.name)?;
        if !self.data_type.is_empty() {
            sql.push(' ');
            sql.push_str(&self.data_type);
        }
        for constraint in &self.constraints {
            sql.push_str(match constraint {
                ColumnConstraint::PrimaryKey => " PRIMARY KEY",
                ColumnConstraint::AutoIncrement => " AUTOINCREMENT",
            });
        }
        Ok(sql)
    }
}

/// Parses `name:TYPE` specs into column definitions, in the given order.
///
/// The spec is split on its first `:`. Unless one of the names is `id`
/// (any case), a synthetic integer primary key named `id` is prepended.
pub fn parse<S: AsRef<str>>(specs: &[S]) -> Result<Vec<ColumnDefinition>> {
    let mut columns = Vec::with_capacity(specs.len() + 1);
    for spec in specs {
        let spec = spec.as_ref();
        let (name, data_type) = spec.split_once(':').ok_or_else(|| {
            DbboxError::Format(format!(
                "Invalid schema format '{spec}'. Use 'column:TYPE'"
            ))
        })?;
        if name.is_empty() {
            return Err(DbboxError::Format(format!(
                "Invalid schema format '{spec}'. Column name is empty"
            )));
        }
        columns.push(ColumnDefinition::new(name, data_type.to_uppercase()));
    }

    if !columns.iter().any(ColumnDefinition::is_id) {
        columns.insert(0, ColumnDefinition::synthetic_id());
    }
    Ok(columns)
}

pub fn is_id_column(name: &str) -> bool {
    name.eq_ignore_ascii_case(ID_COLUMN)
}

/// Quotes a table or column name for interpolation into SQL.
///
/// Embedded double quotes are doubled. Empty names and names containing NUL
/// cannot be represented and are rejected.
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(DbboxError::Validation("Identifier must not be empty".to_string()));
    }
    if name.contains('\0') {
        return Err(DbboxError::Validation(format!(
            "Invalid identifier '{}'",
            name.escape_default()
        )));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}
