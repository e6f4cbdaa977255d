//! CSV writer for the fallback result format.
//!
//! Used only when the primary Parquet write fails; produces the same row
//! set in the same column order.

use std::path::Path;

use super::{tmp_sibling, ResultSet, OUTPUT_COLUMNS};
use crate::error::StoreError;

/// Write the result set to a CSV file.
///
/// Writes through a temporary sibling and renames into place, so a failed
/// write never leaves a partial artifact at `output_path`.
pub fn write_csv(results: &ResultSet, output_path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = tmp_sibling(output_path);
    let write = || -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        writer.write_record(OUTPUT_COLUMNS)?;

        for outcome in results.iter() {
            writer.write_record([
                outcome.index.to_string(),
                outcome.gender.clone(),
                outcome.age.to_string(),
                outcome.surgery_date.clone(),
                outcome.model_output.clone().unwrap_or_default(),
                outcome.status.to_string(),
                outcome.attempt_count.to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    };

    let promote = write().and_then(|()| Ok(std::fs::rename(&tmp_path, output_path)?));
    if promote.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    promote
}
