use anyhow::Result;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::CounterError;
use crate::record::ResultRecord;

pub const DEFAULT_OUTPUT_DIR: &str = "output/localtrack";

/// Destination for a finished run's records.
///
/// The phase column is `detect` or `track`. Runs with `FailurePolicy::Flag`
/// also produce `lost` rows for objects whose tracker gave up.
pub trait ResultSink {
    /// Persist `records` in the given order. Called once per run.
    fn emit(&mut self, records: &[ResultRecord]) -> Result<()>;
}

/// Headerless CSV: `index,frame_id,phase,local_id,x,y,w,h,lag`, index from 0.
pub struct CsvResultSink {
    path: PathBuf,
}

impl CsvResultSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&self, records: &[ResultRecord]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut out = BufWriter::new(std::fs::File::create(&self.path)?);
        for (index, r) in records.iter().enumerate() {
            writeln!(
                out,
                "{},{},{},{},{},{},{},{},{}",
                index, r.frame_id, r.phase, r.local_id, r.x, r.y, r.width, r.height, r.lag
            )?;
        }
        out.flush()
    }
}

impl ResultSink for CsvResultSink {
    fn emit(&mut self, records: &[ResultRecord]) -> Result<()> {
        self.write_all(records)
            .map_err(|source| CounterError::Emission {
                path: self.path.clone(),
                source,
            })?;
        log::info!(
            "wrote {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Collects emitted records in memory.
#[derive(Debug, Default)]
pub struct InMemoryResultSink {
    records: Vec<ResultRecord>,
    emissions: usize,
}

impl InMemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// How many times `emit` was called.
    pub fn emissions(&self) -> usize {
        self.emissions
    }
}

impl ResultSink for InMemoryResultSink {
    fn emit(&mut self, records: &[ResultRecord]) -> Result<()> {
        self.records.extend_from_slice(records);
        self.emissions += 1;
        Ok(())
    }
}

/// `{video}_{tracker}_pfr{detect_speed}_ws{window}.csv`
pub fn output_file_name(video: &str, tracker: &str, detect_speed: f64, window_size: u32) -> String {
    format!(
        "{}_{}_pfr{:?}_ws{}.csv",
        video, tracker, detect_speed, window_size
    )
}
