//! Integration tests testing against the actual crate binary and reading from a file: Test the full E2E path.

use std::path::PathBuf;
use std::process::Command;

use bank_slip_processor::BankSlipRecord;

#[test]
fn bank_slips_file() {
    let input_path = fixture_path("bank_slips.csv");
    let expected = read_records(
        &std::fs::read_to_string(fixture_path("bank_slips_expected.csv"))
            .expect("failed to read expected output fixture"),
    );

    let output = Command::new(env!("CARGO_BIN_EXE_bank-slip-processor"))
        .arg(&input_path)
        .env("POLL_INTERVAL_MS", "10")
        .output()
        .expect("failed to execute binary");

    assert!(
        output.status.success(),
        "binary exited with non-zero status.\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("binary output was not valid UTF-8");
    let actual = read_records(&stdout);

    assert_eq!(without_file_id(&actual), expected);
    assert!(actual.iter().all(|r| !r.file_id.is_empty() && r.file_id == actual[0].file_id));
}

#[test]
fn missing_header_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, "").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_bank-slip-processor"))
        .arg(&path)
        .output()
        .expect("failed to execute binary");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn invalid_configuration_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_bank-slip-processor"))
        .arg(fixture_path("bank_slips.csv"))
        .env("PROCESSORS", "0")
        .output()
        .expect("failed to execute binary");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("PROCESSORS"));
}

/// Returns the absolute path to a test fixture file in `tests/data/`.
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn read_records(raw: &str) -> Vec<BankSlipRecord> {
    csv::Reader::from_reader(raw.as_bytes())
        .deserialize()
        .collect::<Result<_, _>>()
        .expect("output is not a bank slip report")
}

/// The file id is generated per upload, so it is blanked out before comparing.
fn without_file_id(records: &[BankSlipRecord]) -> Vec<BankSlipRecord> {
    records
        .iter()
        .cloned()
        .map(|record| BankSlipRecord {
            file_id: String::new(),
            ..record
        })
        .collect()
}
