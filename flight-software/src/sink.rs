//! CSV telemetry sink.
//!
//! One file per run, named `testbed_data_NN.csv` with the first free number
//! in the output directory. The header and the 25-field record layout match
//! the historical log format consumed by the analysis scripts.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use attitude_control::{TelemetryRecord, FIELD_NAMES};

/// Buffered CSV writer for telemetry records.
#[derive(Debug)]
pub struct CsvSink {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl CsvSink {
    /// Create a new record file in `dir`, picking the first unused
    /// `testbed_data_NN.csv` name, and write the preamble and header.
    pub fn create(dir: &Path) -> io::Result<Self> {
        let mut number = 0u32;
        let path = loop {
            let candidate = dir.join(format!("testbed_data_{number:02}.csv"));
            if !candidate.exists() {
                break candidate;
            }
            number += 1;
        };

        let mut writer = BufWriter::new(File::create(&path)?);
        writeln!(
            writer,
            "Current local time and date: {}",
            chrono::Local::now().format("%a %b %e %T %Y")
        )?;
        writeln!(writer, "{}", FIELD_NAMES.join(","))?;

        log::info!("recording telemetry to {}", path.display());
        Ok(Self { writer, path })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Every field is followed by `", "`, trailing
    /// separator included, matching the historical format byte for byte.
    pub fn write_record(&mut self, record: &TelemetryRecord) -> io::Result<()> {
        let fields = record.as_array();
        let mut line = String::with_capacity(fields.len() * 12);
        for value in fields.iter() {
            line.push_str(&format!("{value:+9.3}, "));
        }
        writeln!(self.writer, "{line}")
    }

    /// Flush buffered records to disk.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
