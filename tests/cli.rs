use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

// Runs the built binary against `dir`, feeding `stdin` to it
fn dbbox(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_dbbox"))
        .arg("--data-dir")
        .arg(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut pipe = child.stdin.take().unwrap();
    if !stdin.is_empty() {
        pipe.write_all(stdin.as_bytes()).unwrap();
    }
    drop(pipe);
    child.wait_with_output().unwrap()
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[test]
fn test_import_reports_each_issue_once() {
    let dir = TempDir::new().unwrap();
    let created = dbbox(
        dir.path(),
        &["shop", "users", "--schema", "name:TEXT", "age:INTEGER"],
        "",
    );
    assert!(created.status.success());

    let output = dbbox(dir.path(), &["shop", "users", "--import"], "Alice 30\n\nBob\n");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(text(&output.stdout), "✓ Imported 1 row(s), 1 error(s)\n");

    let stderr = text(&output.stderr);
    assert!(!stderr.contains('\x1b'), "{stderr:?}");
    let warning = "Warning line 3: Expected 2 values, got 1 - skipping";
    assert_eq!(stderr.matches(warning).count(), 1, "{stderr:?}");
    assert_eq!(stderr.lines().filter(|l| l.contains("line 3")).count(), 1);
}

#[test]
fn test_real_values_print_with_fraction() {
    let dir = TempDir::new().unwrap();
    dbbox(dir.path(), &["lab", "samples", "--schema", "x:REAL"], "");
    let inserted = dbbox(dir.path(), &["lab", "samples", "-c", "1.0"], "");
    assert_eq!(text(&inserted.stdout), "✓ Inserted row with id=1\n");

    let csv = dbbox(dir.path(), &["lab", "samples", "-r", "--csv"], "");
    assert_eq!(text(&csv.stdout), "id,x\n1,1.0\n");

    let json = dbbox(dir.path(), &["lab", "samples", "-r", "--jsonl"], "");
    assert_eq!(text(&json.stdout), "{\"id\":1,\"x\":1.0}\n");
}

#[test]
fn test_bad_output_format_in_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "output_format = \"xml\"\n").unwrap();

    let output = dbbox(
        dir.path(),
        &["--config", config.to_str().unwrap(), "shop", "users", "-r"],
        "",
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(text(&output.stderr).starts_with("Error: configuration error: output_format:"));
}
