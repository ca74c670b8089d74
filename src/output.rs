// src/output.rs
use crate::types::{SubdomainRecord, SubhoundError};
use chrono::{DateTime, Local};
use log::debug;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 9] = [
    "Subdomain",
    "Source",
    "IP Address",
    "Country",
    "Region",
    "City",
    "ISP",
    "Cloud Service",
    "Error",
];

/// `<dir>/<prefix>_<YYYY-MM-DD_HH-MM-SS>.csv`
pub fn report_path(dir: &Path, prefix: &str, timestamp: &DateTime<Local>) -> PathBuf {
    dir.join(format!("{}_{}.csv", prefix, timestamp.format("%Y-%m-%d_%H-%M-%S")))
}

/// CSV report sink. Every row is flushed as soon as it is written.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl ReportWriter<File> {
    /// Creates the reports directory if needed and opens a fresh report file.
    pub fn create(dir: &Path, prefix: &str) -> Result<(Self, PathBuf), SubhoundError> {
        Self::create_at(dir, prefix, &Local::now())
    }

    pub fn create_at(
        dir: &Path,
        prefix: &str,
        timestamp: &DateTime<Local>,
    ) -> Result<(Self, PathBuf), SubhoundError> {
        fs::create_dir_all(dir).map_err(|e| {
            SubhoundError::OutputError(format!("Failed to create directory {}: {}", dir.display(), e))
        })?;

        let path = report_path(dir, prefix, timestamp);
        let file = File::create(&path).map_err(|e| {
            SubhoundError::OutputError(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        debug!("Writing report to {}", path.display());

        Ok((Self::from_writer(file)?, path))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn from_writer(inner: W) -> Result<Self, SubhoundError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(HEADER)?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write_record(&mut self, record: &SubdomainRecord) -> Result<(), SubhoundError> {
        let source = record.source.to_string();
        let cell = |value: &Option<String>| value.clone().unwrap_or_default();

        self.writer.write_record([
            cell(&record.subdomain),
            source,
            cell(&record.ip_address),
            cell(&record.country),
            cell(&record.region),
            cell(&record.city),
            cell(&record.isp),
            cell(&record.cloud_service),
            cell(&record.error),
        ])?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(self) -> Result<W, SubhoundError> {
        self.writer
            .into_inner()
            .map_err(|e| SubhoundError::OutputError(format!("Failed to finalize report: {}", e)))
    }
}
