//! CSV batch sink
//!
//! Writes one CSV file per segment, named
//! `<prefix>_segment_<index>_<YYYYmmdd_HHMM>.csv`. Batches are written to a
//! hidden `.partial` file first and renamed into place on publish.

use crate::config::OutputConfig;
use crate::extract::ListingRecord;
use crate::output::columns::ColumnLayout;
use crate::output::traits::{BatchSink, OutputError, OutputResult, StagedBatch};
use std::fs;
use std::path::{Path, PathBuf};

/// Timestamp format embedded in output file names
const FILE_TIMESTAMP: &str = "%Y%m%d_%H%M";

/// Batch sink writing CSV files into a directory
pub struct CsvBatchSink {
    directory: PathBuf,
    prefix: String,
    layout: ColumnLayout,
}

impl CsvBatchSink {
    pub fn new(
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
        layout: ColumnLayout,
    ) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
            layout,
        }
    }

    pub fn from_config(config: &OutputConfig, layout: ColumnLayout) -> Self {
        Self::new(config.directory.clone(), config.file_prefix.clone(), layout)
    }

    /// File name for a segment's batch written now
    pub fn file_name(&self, segment: usize) -> String {
        format!(
            "{}_segment_{}_{}.csv",
            self.prefix,
            segment,
            chrono::Local::now().format(FILE_TIMESTAMP)
        )
    }

    fn write_csv(&self, path: &Path, records: &[ListingRecord]) -> OutputResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.layout.header())?;
        for record in records {
            writer.write_record(self.layout.row(record))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl BatchSink for CsvBatchSink {
    fn stage(&self, segment: usize, records: &[ListingRecord]) -> OutputResult<StagedBatch> {
        if records.is_empty() {
            return Err(OutputError::Write(format!(
                "refusing to stage an empty batch for segment {}",
                segment
            )));
        }

        fs::create_dir_all(&self.directory)?;

        let name = self.file_name(segment);
        let final_path = self.directory.join(&name);
        let staging_path = self.directory.join(format!(".{}.partial", name));

        if let Err(e) = self.write_csv(&staging_path, records) {
            if let Err(cleanup) = fs::remove_file(&staging_path) {
                tracing::warn!(
                    "Failed to remove partial batch {}: {}",
                    staging_path.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        tracing::debug!(
            "Staged {} record(s) for segment {} at {}",
            records.len(),
            segment,
            staging_path.display()
        );

        Ok(StagedBatch {
            staging_path,
            final_path,
            rows: records.len(),
        })
    }

    fn publish(&self, staged: StagedBatch) -> OutputResult<PathBuf> {
        fs::rename(&staged.staging_path, &staged.final_path)?;
        Ok(staged.final_path)
    }

    fn discard(&self, staged: StagedBatch) {
        if let Err(e) = fs::remove_file(&staged.staging_path) {
            tracing::warn!(
                "Failed to remove staged batch {}: {}",
                staged.staging_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn layout() -> ColumnLayout {
        ColumnLayout::new(vec!["Marka pojazdu".to_string()], false)
    }

    fn record(make: &str, id: &str) -> ListingRecord {
        let mut record = ListingRecord::new(
            &["Marka pojazdu".to_string()],
            HashMap::from([("Marka pojazdu".to_string(), make.to_string())]),
        );
        record.advert.item_id = id.to_string();
        record.description = "Line one\nLine two, with comma".to_string();
        record
    }

    #[test]
    fn test_file_name_format() {
        let dir = TempDir::new().unwrap();
        let sink = CsvBatchSink::new(dir.path(), "offers", layout());
        let name = sink.file_name(7);

        assert!(name.starts_with("offers_segment_7_"));
        assert!(name.ends_with(".csv"));
        // offers_segment_7_YYYYmmdd_HHMM.csv
        assert_eq!(name.len(), "offers_segment_7_".len() + 13 + ".csv".len());
    }

    #[test]
    fn test_stage_then_publish() {
        let dir = TempDir::new().unwrap();
        let sink = CsvBatchSink::new(dir.path().join("out"), "offers", layout());

        let staged = sink
            .stage(1, &[record("Audi", "1"), record("BMW", "2")])
            .unwrap();
        assert_eq!(staged.rows(), 2);
        assert!(!staged.final_path().exists());

        let path = sink.publish(staged).unwrap();
        assert!(path.exists());

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), layout().len());
        assert_eq!(&headers[0], "Marka pojazdu");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "BMW");
        assert_eq!(&rows[0][6], "1");
        assert_eq!(&rows[0][7], "Line one\nLine two, with comma");
    }

    #[test]
    fn test_discard_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let sink = CsvBatchSink::new(dir.path(), "offers", layout());

        let staged = sink.stage(2, &[record("Audi", "1")]).unwrap();
        let final_path = staged.final_path().to_path_buf();
        sink.discard(staged);

        assert!(!final_path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_stage_reports_write_error() {
        let dir = TempDir::new().unwrap();
        let sink = CsvBatchSink::new(dir.path(), "offers", layout());

        // A directory squatting on the staging path fails both the write
        // and its cleanup
        loop {
            let name = sink.file_name(4);
            let squatter = dir.path().join(format!(".{}.partial", name));
            fs::create_dir_all(&squatter).unwrap();

            let result = sink.stage(4, &[record("Fiat", "4")]);
            if sink.file_name(4) != name {
                continue;
            }

            assert!(result.is_err());
            assert!(squatter.is_dir());
            assert!(!dir.path().join(&name).exists());
            break;
        }
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let sink = CsvBatchSink::new(dir.path(), "offers", layout());
        assert!(matches!(sink.stage(1, &[]), Err(OutputError::Write(_))));
    }
}
