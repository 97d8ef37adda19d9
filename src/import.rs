//! Bulk import of whitespace-separated records.

use std::fmt;
use std::io::BufRead;

use tracing::debug;

use crate::error::{DbboxError, Result};
use crate::schema::is_id_column;
use crate::sqlite::DbManager;

/// Why a line was not imported.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    CountMismatch { expected: usize, got: usize },
    InvalidUtf8,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportIssue {
    /// 1-based line number in the input.
    pub line: usize,
    pub kind: IssueKind,
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::CountMismatch { expected, got } => write!(
                f,
                "Warning line {}: Expected {expected} values, got {got} - skipping",
                self.line
            ),
            IssueKind::InvalidUtf8 => {
                write!(f, "Warning line {}: not valid UTF-8 - skipping", self.line)
            }
            IssueKind::Failed(message) => write!(f, "Error line {}: {message}", self.line),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub imported: usize,
    pub issues: Vec<ImportIssue>,
}

impl ImportReport {
    pub fn errors(&self) -> usize {
        self.issues.len()
    }

    /// True when the input had no records at all.
    pub fn is_empty(&self) -> bool {
        self.imported == 0 && self.issues.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            format!("{} row(s)", self.imported)
        } else {
            format!("{} row(s), {} error(s)", self.imported, self.errors())
        }
    }
}

/// Inserts one row per input line into a single table.
pub struct Importer<'a> {
    db: &'a DbManager,
    table: &'a str,
    expected: usize,
}

impl<'a> Importer<'a> {
    /// Fails if the table does not exist.
    pub fn new(db: &'a DbManager, table: &'a str) -> Result<Self> {
        let info = db.table_info(table)?.ok_or_else(|| {
            DbboxError::Validation(format!(
                "Table '{table}' does not exist. Create it first with --schema"
            ))
        })?;
        let expected = info.iter().filter(|c| !is_id_column(&c.name)).count();
        Ok(Self {
            db,
            table,
            expected,
        })
    }

    /// Number of values each line must carry.
    pub fn expected_values(&self) -> usize {
        self.expected
    }

    /// Reads `input` to the end, importing every well-formed line.
    ///
    /// Blank lines are skipped silently. A line with the wrong number of
    /// fields, or one the database rejects, is recorded as an issue and the
    /// import carries on with the next line.
    pub fn run<R: BufRead>(&self, mut input: R) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut buf = Vec::new();
        let mut line_no = 0;

        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;

            let Ok(line) = std::str::from_utf8(&buf) else {
                self.record(&mut report, line_no, IssueKind::InvalidUtf8);
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let values: Vec<String> = line.split_whitespace().map(String::from).collect();
            if values.len() != self.expected {
                let kind = IssueKind::CountMismatch {
                    expected: self.expected,
                    got: values.len(),
                };
                self.record(&mut report, line_no, kind);
                continue;
            }

            match self.db.insert(self.table, &values) {
                Ok(id) => {
                    debug!(line = line_no, id, "imported line");
                    report.imported += 1;
                }
                Err(e) => self.record(&mut report, line_no, IssueKind::Failed(e.to_string())),
            }
        }
        Ok(report)
    }

    fn record(&self, report: &mut ImportReport, line: usize, kind: IssueKind) {
        let issue = ImportIssue { line, kind };
        debug!(table = self.table, "{issue}");
        report.issues.push(issue);
    }
}
