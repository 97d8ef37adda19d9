//! Command-line arguments and their resolution into a single [`Operation`].

use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::config::DATA_DIR_ENV;
use crate::error::{DbboxError, Result};
use crate::formatter::OutputFormat;

/// DBBox - Simple SQLite database utility
#[derive(Parser, Debug)]
#[command(
    name = "dbbox",
    version,
    about = "DBBox - Simple SQLite database utility",
    after_help = "Examples:\n  \
        dbbox databases\n  \
        dbbox mydb tables\n  \
        dbbox mydb users --schema name:TEXT age:INTEGER email:TEXT\n  \
        dbbox mydb users -c 'John Doe' 30 'john@example.com'\n  \
        dbbox mydb users -r\n  \
        dbbox mydb users -r 1 --json\n  \
        dbbox mydb users -u 1 'Jane Doe' 31 'jane@example.com'\n  \
        dbbox mydb users -d 1\n  \
        cat data.txt | dbbox mydb users --import"
)]
#[command(group(ArgGroup::new("format").args(["json", "jsonl", "csv"])))]
pub struct Args {
    /// Database name (without .db extension)
    pub database: Option<String>,

    /// Table name
    pub table: Option<String>,

    /// Insert row with values
    #[arg(short = 'c', long, num_args = 1.., value_name = "VALUE", allow_negative_numbers = true)]
    pub create: Option<Vec<String>>,

    /// Read rows (optionally by ID)
    #[arg(short = 'r', long, num_args = 0..=1, value_name = "ID")]
    pub read: Option<Option<String>>,

    /// Update row: -u <id> <val1> <val2> ...
    #[arg(short = 'u', long, num_args = 1.., value_name = "VALUE", allow_negative_numbers = true)]
    pub update: Option<Vec<String>>,

    /// Delete row by ID
    #[arg(short = 'd', long, value_name = "ID", allow_negative_numbers = true)]
    pub delete: Option<i64>,

    /// Import data from stdin (one record per line, space/tab separated)
    #[arg(long = "import")]
    pub import_data: bool,

    /// List all databases
    #[arg(long)]
    pub databases: bool,

    /// List databases (if no db specified) or tables (if db specified)
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Create table with schema
    #[arg(long, num_args = 1.., value_name = "COL:TYPE")]
    pub schema: Option<Vec<String>>,

    /// List all tables
    #[arg(long)]
    pub tables: bool,

    /// Show table information
    #[arg(long)]
    pub info: bool,

    /// Drop (delete) a table
    #[arg(long)]
    pub drop_table: bool,

    /// Show database file path
    #[arg(long)]
    pub path: bool,

    /// Drop (delete) entire database
    #[arg(long)]
    pub drop_database: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Output as JSON Lines (one object per line)
    #[arg(long)]
    pub jsonl: bool,

    /// Output as CSV
    #[arg(long)]
    pub csv: bool,

    /// Directory holding the database files
    #[arg(long, value_name = "DIR", env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    /// The format requested by flag, if any.
    pub fn output_format(&self) -> Option<OutputFormat> {
        if self.json {
            Some(OutputFormat::Json)
        } else if self.jsonl {
            Some(OutputFormat::JsonLines)
        } else if self.csv {
            Some(OutputFormat::Csv)
        } else {
            None
        }
    }
}

/// The one thing an invocation does.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ListDatabases,
    ShowPath {
        database: String,
    },
    DropDatabase {
        database: String,
    },
    ListTables {
        database: String,
    },
    TableInfo {
        database: String,
        table: String,
    },
    DropTable {
        database: String,
        table: String,
    },
    CreateTable {
        database: String,
        table: String,
        schema: Vec<String>,
    },
    Insert {
        database: String,
        table: String,
        values: Vec<String>,
    },
    Read {
        database: String,
        table: String,
        id: Option<i64>,
        format: Option<OutputFormat>,
    },
    Update {
        database: String,
        table: String,
        id: i64,
        values: Vec<String>,
    },
    Delete {
        database: String,
        table: String,
        id: i64,
    },
    Import {
        database: String,
        table: String,
    },
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| DbboxError::Validation(format!("Invalid ID '{raw}'")))
}

impl Operation {
    /// Resolves parsed arguments into one operation.
    ///
    /// `dbbox databases` and `dbbox <db> tables` are accepted as shorthands
    /// for `--databases` and `--tables`. When several operation flags are
    /// given the first one in the order below wins.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut database = args.database.clone();
        let mut table = args.table.clone();
        let mut list_databases = args.databases;
        let mut list_tables = args.tables;

        if database.as_deref() == Some("databases") {
            list_databases = true;
            database = None;
        }
        if table.as_deref() == Some("tables") {
            list_tables = true;
            table = None;
        }

        if list_databases || (args.list && database.is_none()) {
            return Ok(Operation::ListDatabases);
        }

        let database = database.ok_or_else(|| {
            DbboxError::Usage(
                "database name is required for this operation \
                 (or use --databases/--list to list all)"
                    .to_string(),
            )
        })?;

        if args.path {
            return Ok(Operation::ShowPath { database });
        }
        if args.drop_database {
            return Ok(Operation::DropDatabase { database });
        }
        if list_tables || args.list {
            return Ok(Operation::ListTables { database });
        }

        let table = table.ok_or_else(|| {
            DbboxError::Usage("table name is required for this operation".to_string())
        })?;

        if args.info {
            return Ok(Operation::TableInfo { database, table });
        }
        if args.drop_table {
            return Ok(Operation::DropTable { database, table });
        }
        if let Some(schema) = &args.schema {
            return Ok(Operation::CreateTable {
                database,
                table,
                schema: schema.clone(),
            });
        }
        if let Some(values) = &args.create {
            return Ok(Operation::Insert {
                database,
                table,
                values: values.clone(),
            });
        }
        if let Some(read) = &args.read {
            let id = read.as_deref().map(parse_id).transpose()?;
            return Ok(Operation::Read {
                database,
                table,
                id,
                format: args.output_format(),
            });
        }
        if let Some(update) = &args.update {
            let Some((id, values)) = update.split_first().filter(|(_, v)| !v.is_empty()) else {
                return Err(DbboxError::Validation(
                    "Update requires at least ID and one value".to_string(),
                ));
            };
            return Ok(Operation::Update {
                database,
                table,
                id: parse_id(id)?,
                values: values.to_vec(),
            });
        }
        if let Some(id) = args.delete {
            return Ok(Operation::Delete {
                database,
                table,
                id,
            });
        }
        if args.import_data {
            return Ok(Operation::Import { database, table });
        }

        Err(DbboxError::Usage(
            "No operation specified. Use -c, -r, -u, -d, --import, --schema, --list, or --info"
                .to_string(),
        ))
    }
}
