//! Execution of resolved operations.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cli::Operation;
use crate::error::{DbboxError, Result};
use crate::formatter::{self, OutputFormat};
use crate::import::Importer;
use crate::schema;
use crate::sqlite::{database_path, DbManager, DB_EXTENSION};

/// Asks the user whether to go ahead with an irreversible action.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        Ok(self(prompt))
    }
}

/// Prompts on stdout and reads the answer from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut answer = String::new();
        if io::stdin().read_line(&mut answer)? == 0 {
            return Err(DbboxError::Interrupted);
        }
        Ok(is_affirmative(&answer))
    }
}

/// `yes` or `y`, in any case.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

/// How a command ended when it did not fail with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    pub fn code(self) -> u8 {
        match self {
            Status::Success => 0,
            Status::Failure => 1,
        }
    }
}

/// Formats a file size the way `--databases` lists it.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes}B")
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    }
}

/// Database files in `dir`, sorted by name, with their sizes.
pub fn list_database_files(dir: &Path) -> Result<Vec<(String, u64)>> {
    let mut databases = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(DB_EXTENSION) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            databases.push((stem.to_string(), metadata.len()));
        }
    }
    databases.sort();
    Ok(databases)
}

/// Everything a command needs from the outside world.
pub struct Session<'a> {
    pub data_dir: PathBuf,
    pub default_format: OutputFormat,
    pub out: &'a mut dyn Write,
    pub err: &'a mut dyn Write,
    pub input: &'a mut dyn BufRead,
    pub confirm: &'a mut dyn Confirm,
}

impl Session<'_> {
    pub fn execute(&mut self, operation: Operation) -> Result<Status> {
        debug!(?operation, data_dir = %self.data_dir.display(), "executing");
        match operation {
            Operation::ListDatabases => self.list_databases(),
            Operation::ShowPath { database } => self.show_path(&database),
            Operation::DropDatabase { database } => self.drop_database(&database),
            Operation::ListTables { database } => {
                let db = self.open(&database)?;
                let tables = db.list_tables()?;
                if tables.is_empty() {
                    writeln!(self.out, "No tables in '{database}'")?;
                } else {
                    writeln!(self.out, "Tables in '{database}':")?;
                    for table in tables {
                        writeln!(self.out, "  - {table}")?;
                    }
                }
                Ok(Status::Success)
            }
            Operation::TableInfo { database, table } => {
                let db = self.open(&database)?;
                match db.table_info(&table)? {
                    Some(columns) => {
                        writeln!(self.out, "{}", formatter::format_table_info(&table, &columns))?;
                        Ok(Status::Success)
                    }
                    None => self.missing_table(&table),
                }
            }
            Operation::DropTable { database, table } => {
                let db = self.open(&database)?;
                if db.table_info(&table)?.is_none() {
                    return self.missing_table(&table);
                }
                let prompt = format!(
                    "Are you sure you want to drop table '{table}' from database '{database}'? \
                     This cannot be undone. (yes/no): "
                );
                if !self.confirm.confirm(&prompt)? {
                    writeln!(self.out, "Cancelled")?;
                    return Ok(Status::Success);
                }
                db.drop_table(&table)?;
                writeln!(self.out, "✓ Dropped table '{table}'")?;
                Ok(Status::Success)
            }
            Operation::CreateTable {
                database,
                table,
                schema,
            } => {
                let columns = schema::parse(&schema)?;
                let db = self.open(&database)?;
                db.create_table(&table, &columns)?;
                writeln!(self.out, "✓ Table '{table}' created successfully")?;
                Ok(Status::Success)
            }
            Operation::Insert {
                database,
                table,
                values,
            } => {
                let db = self.open(&database)?;
                let id = db.insert(&table, &values)?;
                writeln!(self.out, "✓ Inserted row with id={id}")?;
                Ok(Status::Success)
            }
            Operation::Read {
                database,
                table,
                id,
                format,
            } => {
                let db = self.open(&database)?;
                let result = db.select(&table, id)?;
                let format = format.unwrap_or(self.default_format);
                writeln!(self.out, "{}", formatter::format_result(&result, format))?;
                Ok(Status::Success)
            }
            Operation::Update {
                database,
                table,
                id,
                values,
            } => {
                let db = self.open(&database)?;
                if db.update(&table, id, &values)? == 0 {
                    writeln!(self.out, "No row with id={id} found")?;
                } else {
                    writeln!(self.out, "✓ Updated row id={id}")?;
                }
                Ok(Status::Success)
            }
            Operation::Delete {
                database,
                table,
                id,
            } => {
                let db = self.open(&database)?;
                if db.delete(&table, id)? == 0 {
                    writeln!(self.out, "No row with id={id} found")?;
                } else {
                    writeln!(self.out, "✓ Deleted row id={id}")?;
                }
                Ok(Status::Success)
            }
            Operation::Import { database, table } => self.import(&database, &table),
        }
    }

    fn open(&self, database: &str) -> Result<DbManager> {
        DbManager::open(&self.data_dir, database)
    }

    fn missing_table(&mut self, table: &str) -> Result<Status> {
        writeln!(self.out, "Table '{table}' does not exist")?;
        Ok(Status::Failure)
    }

    fn list_databases(&mut self) -> Result<Status> {
        let dir = self.data_dir.display().to_string();
        let hint = "Create a database first with: dbbox <name> <table> --schema ...";

        if !self.data_dir.is_dir() {
            writeln!(self.out, "No databases directory found at: {dir}")?;
            writeln!(self.out, "{hint}")?;
            return Ok(Status::Success);
        }

        let databases = list_database_files(&self.data_dir)?;
        if databases.is_empty() {
            writeln!(self.out, "No databases found in: {dir}")?;
            writeln!(self.out, "{hint}")?;
            return Ok(Status::Success);
        }

        writeln!(self.out, "Databases in {dir}:")?;
        for (name, size) in &databases {
            writeln!(self.out, "  - {name:<20} ({})", format_size(*size))?;
        }
        writeln!(self.out, "\nTotal: {} database(s)", databases.len())?;
        Ok(Status::Success)
    }

    fn show_path(&mut self, database: &str) -> Result<Status> {
        let path = database_path(&self.data_dir, database)?;
        writeln!(self.out, "Database directory: {}", self.data_dir.display())?;
        writeln!(self.out, "Database path: {}", path.display())?;
        writeln!(self.out, "Exists: {}", path.exists())?;
        Ok(Status::Success)
    }

    fn drop_database(&mut self, database: &str) -> Result<Status> {
        let mut db = DbManager::new(&self.data_dir, database)?;
        if !db.path().exists() {
            writeln!(self.out, "Database '{database}' does not exist")?;
            return Ok(Status::Failure);
        }

        let prompt = format!(
            "Are you sure you want to drop database '{database}'? This cannot be undone. (yes/no): "
        );
        if !self.confirm.confirm(&prompt)? {
            writeln!(self.out, "Cancelled")?;
            return Ok(Status::Success);
        }

        db.drop_database()?;
        info!(database, "database dropped");
        writeln!(self.out, "✓ Dropped database '{database}'")?;
        Ok(Status::Success)
    }

    fn import(&mut self, database: &str, table: &str) -> Result<Status> {
        let db = self.open(database)?;
        let importer = Importer::new(&db, table)?;
        writeln!(
            self.err,
            "Importing data into '{table}' (expecting {} values per line)...",
            importer.expected_values()
        )?;

        let report = importer.run(&mut *self.input)?;
        for issue in &report.issues {
            writeln!(self.err, "{issue}")?;
        }
        writeln!(self.out, "✓ Imported {}", report.summary())?;

        if report.is_empty() {
            writeln!(self.err, "No data provided on stdin")?;
            return Ok(Status::Failure);
        }
        Ok(Status::Success)
    }
}
