//! Output formatting for query results.
//!
//! Supports an aligned table, JSON, JSON Lines and CSV.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value as JsonValue};

use crate::sqlite::{hex, ColumnInfo, ResultSet, Value};

/// Minimum width of a cell in table output.
const MIN_CELL_WIDTH: usize = 15;

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned text table.
    #[default]
    Table,
    /// Pretty-printed JSON array.
    Json,
    /// One compact JSON object per line.
    JsonLines,
    /// Comma-separated values.
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "jsonlines" => Ok(OutputFormat::JsonLines),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!(
                "unknown output format '{other}' (expected table, json, jsonl or csv)"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::JsonLines => "jsonl",
            OutputFormat::Csv => "csv",
        })
    }
}

/// Formats a result set according to the specified format.
pub fn format_result(result: &ResultSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_table(result),
        OutputFormat::Json => format_json(result),
        OutputFormat::JsonLines => format_jsonl(result),
        OutputFormat::Csv => format_csv(result),
    }
}

fn pad_cells<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells
        .map(|cell| format!("{cell:<MIN_CELL_WIDTH$}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Formats the result as a left-aligned text table followed by a row count.
pub fn format_table(result: &ResultSet) -> String {
    if result.is_empty() {
        return "No rows found".to_string();
    }

    let header = pad_cells(result.columns.iter().map(String::as_str));
    let rule = "-".repeat(header.chars().count());
    let mut lines = vec![header, rule];

    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(Value::to_string).collect();
        lines.push(pad_cells(cells.iter().map(String::as_str)));
    }

    lines.push(String::new());
    lines.push(format!("{} row(s) returned", result.rows.len()));
    lines.join("\n")
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(i) => JsonValue::from(*i),
        // Non-finite reals have no JSON form and become null.
        Value::Real(f) => JsonValue::from(*f),
        Value::Text(s) => JsonValue::String(s.clone()),
        Value::Blob(b) => JsonValue::String(hex(b)),
    }
}

fn row_to_json(columns: &[String], row: &[Value]) -> JsonValue {
    let object: Map<String, JsonValue> = columns
        .iter()
        .cloned()
        .zip(row.iter().map(value_to_json))
        .collect();
    JsonValue::Object(object)
}

/// Formats the result as a pretty JSON array of objects keyed by column name.
pub fn format_json(result: &ResultSet) -> String {
    let rows: Vec<JsonValue> = result
        .rows
        .iter()
        .map(|row| row_to_json(&result.columns, row))
        .collect();
    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

/// Formats the result as JSON Lines; no rows gives an empty string.
pub fn format_jsonl(result: &ResultSet) -> String {
    result
        .rows
        .iter()
        .map(|row| row_to_json(&result.columns, row).to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Formats the result as CSV.
///
/// An empty result produces an empty string, header included.
pub fn format_csv(result: &ResultSet) -> String {
    if result.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(result.rows.len() + 1);
    lines.push(result.columns.join(","));
    for row in &result.rows {
        let fields: Vec<String> = row
            .iter()
            .map(|value| match value {
                Value::Null => String::new(),
                other => escape_csv(&other.to_string()),
            })
            .collect();
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

/// Escapes a value for CSV output.
fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Formats the column listing shown by `--info`.
pub fn format_table_info(table: &str, columns: &[ColumnInfo]) -> String {
    let mut lines = vec![
        format!("Table: {table}"),
        format!("{:<20} {:<15} {:<10} {:<5}", "Column", "Type", "NotNull", "PK"),
        "-".repeat(50),
    ];
    for column in columns {
        lines.push(format!(
            "{:<20} {:<15} {:<10} {:<5}",
            column.name, column.data_type, column.not_null, column.is_primary_key
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_result() -> ResultSet {
        ResultSet {
            columns: vec!["id".to_string(), "name".to_string(), "age".to_string()],
            rows: vec![
                vec![Value::Integer(1), Value::from("Alice"), Value::Integer(30)],
                vec![Value::Integer(2), Value::from("Zoë"), Value::Null],
            ],
        }
    }

    fn empty_result() -> ResultSet {
        ResultSet {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: Vec::new(),
        }
    }

    /// Splits CSV text into records, honouring quoted fields.
    fn parse_csv(input: &str) -> Vec<Vec<String>> {
        let mut records = Vec::new();
        let mut record = Vec::new();
        let mut field = String::new();
        let mut quoted = false;
        let mut chars = input.chars().peekable();
        while let Some(c) = chars.next() {
            match (quoted, c) {
                (true, '"') if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                (true, '"') => quoted = false,
                (true, c) => field.push(c),
                (false, '"') => quoted = true,
                (false, ',') => record.push(std::mem::take(&mut field)),
                (false, '\n') => {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                (false, c) => field.push(c),
            }
        }
        record.push(field);
        records.push(record);
        records
    }

    #[test]
    fn test_format_table() {
        let output = format_table(&make_test_result());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], format!("{:<15} | {:<15} | {:<15}", "id", "name", "age"));
        assert_eq!(lines[1], "-".repeat(lines[0].len()));
        assert_eq!(lines[2], format!("{:<15} | {:<15} | {:<15}", "1", "Alice", "30"));
        assert!(lines[3].contains("NULL"));
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "2 row(s) returned");
    }

    #[test]
    fn test_format_table_wide_values_are_not_truncated() {
        let result = ResultSet {
            columns: vec!["description".to_string()],
            rows: vec![vec![Value::from("a value that is longer than fifteen")]],
        };
        let output = format_table(&result);
        assert!(output.contains("a value that is longer than fifteen"));
    }

    #[test]
    fn test_format_table_empty() {
        assert_eq!(format_table(&empty_result()), "No rows found");
    }

    #[test]
    fn test_format_json() {
        let result = make_test_result();
        let output = format_json(&result);
        assert!(output.contains("\"Zoë\""));
        assert!(output.starts_with("[\n  {\n    \"id\": 1,"));

        let parsed: Vec<serde_json::Map<String, JsonValue>> =
            serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.len(), 2);
        for (object, row) in parsed.iter().zip(&result.rows) {
            let keys: Vec<&String> = object.keys().collect();
            assert_eq!(keys, ["id", "name", "age"]);
            for (column, value) in result.columns.iter().zip(row) {
                assert_eq!(object[column], value_to_json(value));
            }
        }
        assert_eq!(parsed[1]["age"], JsonValue::Null);
    }

    #[test]
    fn test_format_json_empty() {
        assert_eq!(format_json(&empty_result()), "[]");
    }

    #[test]
    fn test_format_jsonl() {
        let output = format_jsonl(&make_test_result());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"id":1,"name":"Alice","age":30}"#);
        assert_eq!(lines[1], r#"{"id":2,"name":"Zoë","age":null}"#);
        assert!(!output.ends_with('\n'));
    }

    #[test]
    fn test_format_jsonl_empty() {
        assert_eq!(format_jsonl(&empty_result()), "");
    }

    #[test]
    fn test_format_csv() {
        let output = format_csv(&make_test_result());
        assert_eq!(output, "id,name,age\n1,Alice,30\n2,Zoë,");
    }

    #[test]
    fn test_format_csv_empty_has_no_header() {
        assert_eq!(format_csv(&empty_result()), "");
    }

    #[test]
    fn test_whole_reals_keep_fraction() {
        let result = ResultSet {
            columns: vec!["id".to_string(), "x".to_string()],
            rows: vec![vec![Value::Integer(1), Value::Real(1.0)]],
        };
        assert_eq!(format_csv(&result), "id,x\n1,1.0");
        assert_eq!(format_jsonl(&result), "{\"id\":1,\"x\":1.0}");
        assert!(format_table(&result).lines().nth(2).unwrap().contains("1.0"));
    }

    #[test]
    fn test_csv_quoting_round_trips() {
        let tricky = "say \"hi\", then\nleave";
        let result = ResultSet {
            columns: vec!["id".to_string(), "note".to_string()],
            rows: vec![vec![Value::Integer(7), Value::from(tricky)]],
        };
        let output = format_csv(&result);
        assert!(output.contains("\"say \"\"hi\"\", then\nleave\""));

        let records = parse_csv(&output);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], ["7", tricky]);
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("hello"), "hello");
        assert_eq!(escape_csv("hello,world"), "\"hello,world\"");
        assert_eq!(escape_csv("hello\"world"), "\"hello\"\"world\"");
        assert_eq!(escape_csv("a\r\nb"), "\"a\r\nb\"");
    }

    #[test]
    fn test_format_result_dispatch() {
        let result = make_test_result();
        assert_eq!(format_result(&result, OutputFormat::Csv), format_csv(&result));
        assert_eq!(format_result(&result, OutputFormat::Json), format_json(&result));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("jsonl".parse::<OutputFormat>(), Ok(OutputFormat::JsonLines));
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_table_info() {
        let columns = vec![ColumnInfo {
            position: 0,
            name: "id".to_string(),
            data_type: "INTEGER".to_string(),
            not_null: false,
            default_value: None,
            is_primary_key: true,
        }];
        let output = format_table_info("users", &columns);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Table: users");
        assert!(lines[1].starts_with("Column"));
        assert_eq!(
            lines[3],
            format!("{:<20} {:<15} {:<10} {:<5}", "id", "INTEGER", "false", "true")
        );
    }
}
