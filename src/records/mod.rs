//! Record source: loads the ordered medical case batch from a CSV file.
//!
//! The input carries one case per row with the fixed, case-sensitive columns
//! `AGE, SEX, chief complaint, present history, past history, DAY, CTA`.
//! A missing required column fails the whole load; a row that fails basic
//! type coercion (non-numeric AGE, malformed row) is skipped with a WARN log
//! carrying its row index and the reason. Skipped rows keep their index
//! position so later rows stay aligned with the input file.

use std::path::Path;

use tracing::{info, warn};

use crate::error::InputError;

/// Required input columns, in documentation order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "AGE",
    "SEX",
    "chief complaint",
    "present history",
    "past history",
    "DAY",
    "CTA",
];

/// One medical case row from the input batch.
///
/// Immutable once loaded; the scheduler moves each record into the worker
/// that analyzes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    /// Stable 0-based index matching the input row order.
    pub index: usize,
    /// Patient age in years.
    pub age: u32,
    /// Patient sex, kept verbatim from the input.
    pub sex: String,
    /// Chief complaint narrative.
    pub chief_complaint: String,
    /// Present history narrative.
    pub present_history: String,
    /// Past history narrative.
    pub past_history: String,
    /// Scheduled surgery day, kept verbatim from the input.
    pub surgery_day: String,
    /// Coronary CTA report text.
    pub cta_report: String,
}

/// Load the ordered case batch from `path`.
///
/// # Errors
///
/// Returns `InputError` if the file cannot be opened, is not parseable CSV,
/// or its header is missing one of [`REQUIRED_COLUMNS`].
pub fn load(path: &Path) -> Result<Vec<CaseRecord>, InputError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut positions = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, column) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|header| header == column)
            .ok_or(InputError::MissingColumn(column))?;
    }
    let [age_col, sex_col, chief_col, present_col, past_col, day_col, cta_col] = positions;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (index, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(row = index, error = %err, "Skipping unparseable row");
                skipped += 1;
                continue;
            }
        };

        let field = |col: usize| row.get(col).unwrap_or("").trim().to_string();

        let raw_age = field(age_col);
        let age = match raw_age.parse::<u32>() {
            Ok(age) => age,
            Err(_) => {
                warn!(row = index, age = %raw_age, "Skipping row with non-numeric AGE");
                skipped += 1;
                continue;
            }
        };

        records.push(CaseRecord {
            index,
            age,
            sex: field(sex_col),
            chief_complaint: field(chief_col),
            present_history: field(present_col),
            past_history: field(past_col),
            surgery_day: field(day_col),
            cta_report: field(cta_col),
        });
    }

    info!(
        path = %path.display(),
        cases = records.len(),
        skipped,
        "Loaded case batch"
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_input(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write input");
        file
    }

    const HEADER: &str = "AGE,SEX,chief complaint,present history,past history,DAY,CTA";

    #[test]
    fn test_load_valid_batch() {
        let input = write_input(&format!(
            "{HEADER}\n64,M,chest pain,two days of angina,hypertension,2024-03-01,LAD 70% stenosis\n71,F,dyspnea,gradual onset,diabetes,2024-03-02,RCA calcified plaque\n"
        ));

        let records = load(input.path()).expect("load should succeed");
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].index, 0);
        assert_eq!(records[0].age, 64);
        assert_eq!(records[0].sex, "M");
        assert_eq!(records[0].chief_complaint, "chest pain");
        assert_eq!(records[0].cta_report, "LAD 70% stenosis");

        assert_eq!(records[1].index, 1);
        assert_eq!(records[1].age, 71);
        assert_eq!(records[1].surgery_day, "2024-03-02");
    }

    #[test]
    fn test_load_extra_columns_ignored() {
        let input = write_input(&format!(
            "patientID,{HEADER}\np-17,58,F,palpitations,one week,none,2024-04-10,normal coronaries\n"
        ));

        let records = load(input.path()).expect("load should succeed");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].age, 58);
        assert_eq!(records[0].sex, "F");
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let input =
            write_input("AGE,SEX,chief complaint,present history,past history,DAY\n64,M,a,b,c,d\n");

        let err = load(input.path()).expect_err("load should fail");
        assert!(matches!(err, InputError::MissingColumn("CTA")));
    }

    #[test]
    fn test_non_numeric_age_row_is_skipped() {
        let input = write_input(&format!(
            "{HEADER}\n64,M,chest pain,hx,phx,2024-03-01,cta one\nunknown,F,dyspnea,hx,phx,2024-03-02,cta two\n59,F,syncope,hx,phx,2024-03-03,cta three\n"
        ));

        let records = load(input.path()).expect("load should succeed");
        assert_eq!(records.len(), 2);

        // The skipped row keeps its index position.
        assert_eq!(records[0].index, 0);
        assert_eq!(records[1].index, 2);
        assert_eq!(records[1].age, 59);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = load(Path::new("/nonexistent/batch.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_batch() {
        let input = write_input(&format!("{HEADER}\n"));
        let records = load(input.path()).expect("load should succeed");
        assert!(records.is_empty());
    }
}
