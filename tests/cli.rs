//! End-to-end runs of the `sqlport` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;

const MYSQL_DUMP: &str = "\
CREATE TABLE `t` (
  `id` INT AUTO_INCREMENT PRIMARY KEY,
  `name` VARCHAR(10) NOT NULL
) ENGINE=InnoDB;
";

fn sqlport(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sqlport"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run sqlport")
}

#[test]
fn test_convert_writes_named_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("dump.sql"), MYSQL_DUMP).unwrap();

    let out = sqlport(dir.path(), &["--file", "dump.sql", "--to", "postgres"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let converted = fs::read_to_string(dir.path().join("dump_postgres.sql")).unwrap();
    assert!(converted.contains("CREATE TABLE t ("));
    assert!(converted.contains("id SERIAL PRIMARY KEY"));
    assert!(converted.contains("name VARCHAR(10) NOT NULL"));
}

#[test]
fn test_convert_to_stdout_with_explicit_source() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("plain.sql"), "CREATE TABLE t (id INT NOT NULL);").unwrap();

    let out = sqlport(
        dir.path(),
        &["--file", "plain.sql", "--from", "sqlite", "--to", "sqlserver", "--stdout"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("id INT NOT NULL"));
    assert!(stdout.contains("\nGO\n"));
    assert!(!dir.path().join("plain_sqlserver.sql").exists());
}

#[test]
fn test_parallel_flag_converts() {
    let dir = tempfile::tempdir().unwrap();
    let dump: String = (0..10)
        .map(|i| format!("CREATE TABLE t{} (id SERIAL PRIMARY KEY);\n", i))
        .collect();
    fs::write(dir.path().join("pg.sql"), dump).unwrap();

    let out = sqlport(
        dir.path(),
        &["--file", "pg.sql", "--to", "mysql", "--parallel", "--workers", "3", "-o", "out.sql"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let converted = fs::read_to_string(dir.path().join("out.sql")).unwrap();
    assert_eq!(converted.matches("AUTO_INCREMENT").count(), 10);
}

#[test]
fn test_failure_exits_nonzero_without_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("bad.sql"),
        "CREATE TABLE a (id SERIAL);\nCREATE TABLE b id INT;\n",
    )
    .unwrap();

    let out = sqlport(dir.path(), &["--file", "bad.sql", "--to", "mysql"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error:"));
    assert!(!dir.path().join("bad_mysql.sql").exists());

    let missing = sqlport(dir.path(), &["--file", "absent.sql", "--to", "mysql"]);
    assert!(!missing.status.success());
}

#[test]
fn test_undetectable_dialect_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("x.sql"), "CREATE TABLE t (id INT);").unwrap();
    let out = sqlport(dir.path(), &["--file", "x.sql", "--to", "oracle"]);
    assert!(!out.status.success());
}

#[test]
fn test_diff_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("old.sql"), "CREATE TABLE t (id SERIAL PRIMARY KEY);").unwrap();
    fs::write(
        dir.path().join("new.sql"),
        "CREATE TABLE t (id SERIAL PRIMARY KEY, email TEXT);",
    )
    .unwrap();

    let out = sqlport(dir.path(), &["diff", "old.sql", "new.sql", "--format", "json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let diffs: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(diffs.as_array().unwrap().len(), 1);
    assert_eq!(diffs[0]["name"], "t.email");
    assert_eq!(diffs[0]["change"], "add");
}

#[test]
fn test_detect() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("ora.sql"), "CREATE TABLE t (id NUMBER(10));").unwrap();
    let out = sqlport(dir.path(), &["detect", "ora.sql"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout).unwrap().trim(), "oracle");
}

#[test]
fn test_config_file_is_honored() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("sqlport.toml"), "unrecognized = \"error\"").unwrap();
    fs::write(
        dir.path().join("roles.sql"),
        "CREATE TABLE t (id SERIAL);\nCREATE ROLE reader;\n",
    )
    .unwrap();

    let strict = sqlport(dir.path(), &["--file", "roles.sql", "--to", "mysql", "--stdout"]);
    assert!(!strict.status.success());

    let lenient = sqlport(
        dir.path(),
        &["--file", "roles.sql", "--to", "mysql", "--stdout", "--unrecognized", "skip"],
    );
    assert!(lenient.status.success(), "{}", String::from_utf8_lossy(&lenient.stderr));
}
