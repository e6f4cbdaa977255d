//! Parquet writer for the primary result format.

use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringBuilder, UInt32Builder, UInt64Builder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::{tmp_sibling, ResultSet};
use crate::error::StoreError;

/// Arrow schema for the result rows.
pub fn result_schema() -> Schema {
    Schema::new(vec![
        Field::new("index", DataType::UInt64, false),
        Field::new("gender", DataType::Utf8, false),
        Field::new("age", DataType::UInt32, false),
        Field::new("surgery_date", DataType::Utf8, false),
        Field::new("model_output", DataType::Utf8, true),
        Field::new("status", DataType::Utf8, false),
        Field::new("attempt_count", DataType::UInt32, false),
    ])
}

/// Convert the result set into an Arrow RecordBatch, sorted by index.
pub fn results_to_record_batch(results: &ResultSet) -> Result<RecordBatch, StoreError> {
    let schema = Arc::new(result_schema());

    let mut index = UInt64Builder::new();
    let mut gender = StringBuilder::new();
    let mut age = UInt32Builder::new();
    let mut surgery_date = StringBuilder::new();
    let mut model_output = StringBuilder::new();
    let mut status = StringBuilder::new();
    let mut attempt_count = UInt32Builder::new();

    for outcome in results.iter() {
        index.append_value(outcome.index as u64);
        gender.append_value(&outcome.gender);
        age.append_value(outcome.age);
        surgery_date.append_value(&outcome.surgery_date);
        match &outcome.model_output {
            Some(text) => model_output.append_value(text),
            None => model_output.append_null(),
        }
        status.append_value(outcome.status.to_string());
        attempt_count.append_value(outcome.attempt_count);
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(index.finish()),
        Arc::new(gender.finish()),
        Arc::new(age.finish()),
        Arc::new(surgery_date.finish()),
        Arc::new(model_output.finish()),
        Arc::new(status.finish()),
        Arc::new(attempt_count.finish()),
    ];

    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Write the result set to a Parquet file.
///
/// Writes through a temporary sibling and renames into place, so a failed
/// write never leaves a partial artifact at `output_path`.
pub fn write_parquet(results: &ResultSet, output_path: &Path) -> Result<(), StoreError> {
    let batch = results_to_record_batch(results)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = tmp_sibling(output_path);
    let write = || -> Result<(), StoreError> {
        let file = std::fs::File::create(&tmp_path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(Default::default()))
            .build();

        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    };

    let promote = write().and_then(|()| Ok(std::fs::rename(&tmp_path, output_path)?));
    if promote.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    promote
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use crate::records::CaseRecord;
    use crate::scheduler::AnalysisOutcome;
    use arrow::array::{Array, StringArray, UInt32Array, UInt64Array};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn record(index: usize) -> CaseRecord {
        CaseRecord {
            index,
            age: 60 + index as u32,
            sex: "F".to_string(),
            chief_complaint: String::new(),
            present_history: String::new(),
            past_history: String::new(),
            surgery_day: "2024-03-01".to_string(),
            cta_report: String::new(),
        }
    }

    fn sample_results() -> ResultSet {
        let mut results = ResultSet::new();
        results.insert(AnalysisOutcome::success(
            &record(1),
            "second".to_string(),
            2,
        ));
        results.insert(AnalysisOutcome::success(&record(0), "first".to_string(), 1));
        results.insert(AnalysisOutcome::failure(
            &record(2),
            3,
            &AnalysisError::EmptyResponse,
        ));
        results
    }

    #[test]
    fn test_record_batch_shape() {
        let batch = results_to_record_batch(&sample_results()).expect("batch");

        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 7);

        let indices = batch
            .column(0)
            .as_any()
            .downcast_ref::<UInt64Array>()
            .expect("index column");
        assert_eq!(&indices.values()[..], &[0u64, 1, 2]);

        let outputs = batch
            .column(4)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("model_output column");
        assert_eq!(outputs.value(0), "first");
        assert!(outputs.is_null(2), "failed outcome has null output");
    }

    #[test]
    fn test_empty_result_set_produces_empty_batch() {
        let batch = results_to_record_batch(&ResultSet::new()).expect("batch");
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 7);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results.parquet");

        write_parquet(&sample_results(), &path).expect("write should succeed");
        assert!(path.exists());
        assert!(!super::tmp_sibling(&path).exists(), "tmp file promoted away");

        let file = std::fs::File::open(&path).expect("open");
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .expect("reader builder")
            .build()
            .expect("reader");

        let batches: Vec<_> = reader.map(|b| b.expect("batch")).collect();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 3);

        let ages = batches[0]
            .column(2)
            .as_any()
            .downcast_ref::<UInt32Array>()
            .expect("age column");
        assert_eq!(&ages.values()[..], &[60u32, 61, 62]);
    }

    #[test]
    fn test_failed_write_leaves_no_partial_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Target an existing directory so the final rename fails.
        let path = dir.path().to_path_buf();

        let result = write_parquet(&sample_results(), &path);
        assert!(result.is_err());
        assert!(!super::tmp_sibling(&path).exists(), "tmp file cleaned up");
    }
}
