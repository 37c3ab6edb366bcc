//! Tests running whole files through the library entry point.

use std::collections::BTreeSet;

use bank_slip_processor::{BankSlipRecord, process};
use claims::assert_ok;
use proptest::prelude::*;
use rust_decimal_macros::dec;

use crate::{HEADER, test_config};

fn row(i: usize) -> String {
    format!("Debtor {i},{},debtor{i}@example.com,{i}.25,2024-06-30,debt{i:05}", 10_000 + i)
}

fn file(rows: &[String]) -> String {
    format!("{HEADER}\n{}\n", rows.join("\n"))
}

fn debt_ids(records: &[BankSlipRecord]) -> Vec<&str> {
    records.iter().map(|r| r.debt_id.as_str()).collect()
}

#[test]
fn single_row_is_billed_notified_and_persisted() {
    let input = format!("{HEADER}\nJohn Doe,123,john.doe@example.com,1000.50,2023-12-31,debt123\n");

    let records = assert_ok!(process(input.as_bytes(), "debts.csv", &test_config(1024)));

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.debt_id, "debt123");
    assert_eq!(record.user_name, "John Doe");
    assert_eq!(record.government_id, 123);
    assert_eq!(record.debt_amount, dec!(1000.50));
    assert_eq!(record.debt_due_date.to_string(), "2023-12-31");
    assert_eq!(record.status, "SUCCESS");
    assert_eq!(record.error_message, None);
    assert!(!record.file_id.is_empty());
}

#[test]
fn malformed_rows_are_dropped_and_the_rest_processed() {
    let rows = vec![
        row(1),
        "Missing Field,1,m@example.com,1.00,2024-01-01".to_string(),
        row(2),
        "Bad Amount,2,b@example.com,lots,2024-01-01,debtX".to_string(),
        "Bad Date,3,d@example.com,1.00,2024-02-30,debtY".to_string(),
        String::new(),
        row(3),
    ];

    let records = assert_ok!(process(file(&rows).as_bytes(), "debts.csv", &test_config(1024)));

    assert_eq!(debt_ids(&records), vec!["debt00001", "debt00002", "debt00003"]);
    assert!(records.iter().all(|r| r.status == "SUCCESS"));
}

#[test]
fn rows_spread_over_many_chunks_are_all_persisted() {
    let rows: Vec<String> = (0..300).map(row).collect();

    let records = assert_ok!(process(file(&rows).as_bytes(), "big.csv", &test_config(128)));

    let expected: Vec<String> = (0..300).map(|i| format!("debt{i:05}")).collect();
    assert_eq!(debt_ids(&records), expected);
    let file_ids: BTreeSet<&str> = records.iter().map(|r| r.file_id.as_str()).collect();
    assert_eq!(file_ids.len(), 1);
}

#[test]
fn debt_repeated_in_the_file_is_persisted_once() {
    let mut rows: Vec<String> = (0..50).map(row).collect();
    rows.push(row(7));
    rows.push(row(7));

    let records = assert_ok!(process(file(&rows).as_bytes(), "debts.csv", &test_config(96)));

    assert_eq!(records.len(), 50);
    assert_eq!(debt_ids(&records).iter().filter(|id| **id == "debt00007").count(), 1);
}

#[test]
fn columns_are_located_by_header_name() {
    let input = "debtId,email,debtDueDate,name,debtAmount,governmentId\n\
                 debt9,rui@example.com,2025-01-31,Rui,42.00,987\n";

    let records = assert_ok!(process(input.as_bytes(), "reordered.csv", &test_config(1024)));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].debt_id, "debt9");
    assert_eq!(records[0].user_name, "Rui");
    assert_eq!(records[0].government_id, 987);
    assert_eq!(records[0].debt_amount, dec!(42.00));
}

#[test]
fn chunk_without_valid_rows_does_not_stall_the_pipeline() {
    let rows = vec![row(1), "garbage".to_string(), "more garbage,,,".to_string(), row(2)];

    let records = assert_ok!(process(file(&rows).as_bytes(), "debts.csv", &test_config(64)));

    assert_eq!(debt_ids(&records), vec!["debt00001", "debt00002"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn every_valid_row_ends_successful_exactly_once(
        malformed in prop::collection::vec(any::<bool>(), 1..80),
        buffer_size in 48usize..512,
    ) {
        let rows: Vec<String> = malformed
            .iter()
            .enumerate()
            .map(|(i, &bad)| if bad { format!("broken row {i}") } else { row(i) })
            .collect();

        let records = process(file(&rows).as_bytes(), "debts.csv", &test_config(buffer_size)).unwrap();

        let expected: Vec<String> = malformed
            .iter()
            .enumerate()
            .filter(|(_, bad)| !**bad)
            .map(|(i, _)| format!("debt{i:05}"))
            .collect();
        prop_assert_eq!(debt_ids(&records), expected);
        prop_assert!(records.iter().all(|r| r.status == "SUCCESS" && r.error_message.is_none()));
    }
}
