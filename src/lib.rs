//! DBBox: CRUD and schema management for named SQLite databases.
//!
//! # Intention
//!
//! - Map a database name to `<data dir>/<name>.db` and manage one connection per command.
//! - Turn command-line operations into parameterized SQL, binding plain string
//!   values against a table's non-id columns in declaration order.
//! - Render result sets as an aligned table, JSON, JSON Lines or CSV.
//!
//! # Architectural Boundaries
//!
//! - `schema`, `sqlite` and `formatter` know nothing about the command line.
//! - Only `commands` writes to the user; prompts go through [`commands::Confirm`].

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod formatter;
pub mod import;
pub mod schema;
pub mod sqlite;

pub use error::{DbboxError, Result};
