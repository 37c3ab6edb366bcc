use super::*;
use crate::domain::{DebtId, FileId};
use rust_decimal_macros::dec;

fn slip(debt_id: &str) -> BankSlip {
    BankSlip::new(
        DebtId::from(debt_id),
        dec!(1000.50),
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        123,
        "John Doe",
        "john.doe@example.com",
        FileId::from("file-1"),
    )
}

#[test]
fn pending_slip_converts_correctly() {
    let records: Vec<_> = to_bank_slip_records([slip("debt123")]).collect();

    assert_eq!(
        records,
        vec![BankSlipRecord {
            debt_id: "debt123".to_string(),
            file_id: "file-1".to_string(),
            user_name: "John Doe".to_string(),
            user_email: "john.doe@example.com".to_string(),
            government_id: 123,
            debt_amount: dec!(1000.50),
            debt_due_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            status: "PENDING".to_string(),
            error_message: None,
        }]
    );
}

#[test]
fn failed_slip_keeps_its_error_message() {
    let mut failed = slip("debt1");
    failed.billing_failed("billing api timeout").unwrap();

    let record = BankSlipRecord::from(failed);

    assert_eq!(record.status, "GENERATE_BILLING_ERROR");
    assert_eq!(record.error_message.as_deref(), Some("billing api timeout"));
}

#[test]
fn records_serialize_as_csv_rows() {
    let mut done = slip("debt1");
    done.succeed().unwrap();

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.serialize(BankSlipRecord::from(done)).unwrap();
    let csv = String::from_utf8(wtr.into_inner().unwrap()).unwrap();

    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("debt_id,file_id,user_name,user_email,government_id,debt_amount,debt_due_date,status,error_message")
    );
    assert_eq!(
        lines.next(),
        Some("debt1,file-1,John Doe,john.doe@example.com,123,1000.50,2023-12-31,SUCCESS,")
    );
}

#[test]
fn empty_input_yields_no_records() {
    assert_eq!(to_bank_slip_records(Vec::new()).count(), 0);
}
