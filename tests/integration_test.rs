//! Integration tests for the ACH engine CLI.
//!
//! These tests run the actual binary against the ACH files in `tests/data`.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;

/// Get path to test data file
fn test_data_path(filename: &str) -> String {
    format!("tests/data/{}", filename)
}

/// Run the binary with the given arguments and return stdout
fn run_engine(args: &[&str]) -> String {
    let mut cmd = Command::cargo_bin("ach-engine").unwrap();
    let assert = cmd.args(args).assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

#[test]
fn test_normalized_output_matches_input() {
    let path = test_data_path("sample.ach");
    let output = run_engine(&[&path]);
    let expected = fs::read_to_string(&path).unwrap();

    assert_eq!(output, expected);
}

#[test]
fn test_output_is_blocked() {
    let output = run_engine(&[&test_data_path("sample.ach")]);
    let lines: Vec<&str> = output.split_terminator("\r\n").collect();

    assert_eq!(lines.len() % 10, 0);
    assert!(lines.iter().all(|line| line.len() == 94));
}

#[test]
fn test_transmission_header_is_kept() {
    let path = test_data_path("transmission.ach");
    let output = run_engine(&[&path]);
    let expected = fs::read_to_string(&path).unwrap();

    assert!(output.starts_with("$$ADD ID=ZYXWVUTS BID='NWFACH98765432'\r\n"));
    assert_eq!(output, expected);
}

#[test]
fn test_summary() {
    let output = run_engine(&[&test_data_path("sample.ach"), "--summary"]);
    let expected = fs::read_to_string(test_data_path("expected_summary.csv")).unwrap();

    let output_lines: Vec<&str> = output.lines().collect();
    let expected_lines: Vec<&str> = expected.lines().collect();
    assert_eq!(output_lines, expected_lines);
}

#[test]
fn test_flags_before_input() {
    let output = run_engine(&["--summary", &test_data_path("sample.ach")]);
    assert!(output.starts_with("batch_number,"));
}

#[test]
fn test_unknown_record_skipped_by_default() {
    let output = run_engine(&[&test_data_path("unknown_record.ach")]);
    let expected = fs::read_to_string(test_data_path("sample.ach")).unwrap();

    assert_eq!(output, expected);
}

#[test]
fn test_unknown_record_rejected_when_strict() {
    let mut cmd = Command::cargo_bin("ach-engine").unwrap();
    cmd.arg(test_data_path("unknown_record.ach"))
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized record type 'X'"));
}

#[test]
fn test_missing_batch_control() {
    let mut cmd = Command::cargo_bin("ach-engine").unwrap();
    cmd.arg(test_data_path("missing_batch_control.ach"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Line 6"));
}

#[test]
fn test_missing_argument() {
    let mut cmd = Command::cargo_bin("ach-engine").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Missing input file argument"));
}

#[test]
fn test_nonexistent_file() {
    let mut cmd = Command::cargo_bin("ach-engine").unwrap();
    cmd.arg("nonexistent_file.ach")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_lf_only_input() {
    let sample = fs::read_to_string(test_data_path("sample.ach")).unwrap();
    let mut temp = tempfile::NamedTempFile::new().unwrap();
    temp.write_all(sample.replace("\r\n", "\n").as_bytes())
        .unwrap();

    let output = run_engine(&[temp.path().to_str().unwrap()]);
    assert_eq!(output, sample);
}

#[test]
fn test_empty_file() {
    let temp = tempfile::NamedTempFile::new().unwrap();

    let mut cmd = Command::cargo_bin("ach-engine").unwrap();
    cmd.arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing file header"));
}
