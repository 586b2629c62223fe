//! Process-level checks of the `basic_cleaning` binary.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const FULL_ARGS: [&str; 12] = [
    "--input_artifact",
    "sample.csv:latest",
    "--output_artifact",
    "clean_sample.csv",
    "--output_type",
    "clean_sample",
    "--output_description",
    "Data with outliers and null values removed",
    "--min_price",
    "10",
    "--max_price",
    "350",
];

/// Run the binary in `dir` against an empty in-memory store
fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_basic_cleaning"))
        .args(args)
        .current_dir(dir)
        .env_remove("BASIC_CLEANING_CONFIG")
        .env_remove("TRACKING_STORE_ROOT")
        .env("TRACKING_STORE", "memory")
        .output()
        .unwrap()
}

#[test]
fn test_help_exits_zero() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("--input_artifact"));
}

#[test]
fn test_missing_flag_exits_two() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &FULL_ARGS[..10]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--max_price"));
}

#[test]
fn test_non_numeric_price_exits_two() {
    let dir = TempDir::new().unwrap();
    let mut args = FULL_ARGS.to_vec();
    args[9] = "ten";
    let output = run_in(dir.path(), &args);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_input_artifact_exits_one() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &FULL_ARGS);
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("clean_sample.csv").exists());
}
