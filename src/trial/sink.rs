//! Persistence boundary for trial results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::plane::RasterImage;
use crate::util::{RaincastError, RaincastResult};

/// Filename columns appended after the algorithm's own columns.
pub const FILENAME_COLUMNS: [&str; 3] = ["image_1", "image_2", "image_test"];

/// The unit persisted per (parameter set, image triple) evaluation.
///
/// `cells` carries the algorithm's rendered row (mnemonic, parameters,
/// scores); `sources` names the triple it was evaluated on. Written once,
/// never mutated.
#[derive(Clone, Debug)]
pub struct TrialRecord {
    /// Rendered cells, matching the algorithm's column description.
    pub cells: Vec<String>,
    /// Paths of the two input images and the test image.
    pub sources: [PathBuf; 3],
}

/// Receives everything a sweep persists.
///
/// Row failures are fatal to the sweep; image failures are reported to the
/// trial loop, which logs and continues.
pub trait ResultSink {
    /// Writes the single header row.
    fn write_header(&mut self, columns: &[&'static str]) -> RaincastResult<()>;

    /// Appends one result row.
    fn write_row(&mut self, record: &TrialRecord) -> RaincastResult<()>;

    /// Persists a composite image for `(triple_index, trial)`.
    fn write_image(
        &mut self,
        triple_index: usize,
        trial: u64,
        composite: &RasterImage,
    ) -> RaincastResult<()>;

    /// Flushes and closes the sink. Called exactly once per sweep.
    fn finalize(&mut self) -> RaincastResult<()>;
}

/// Buffered comma-delimited row sink; composite images are not persisted.
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Creates (truncates) the delimited output file.
    pub fn create(path: &Path) -> RaincastResult<Self> {
        let file = File::create(path).map_err(|source| RaincastError::OutputOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Path of the delimited output file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, cells: impl Iterator<Item = String>) -> RaincastResult<()> {
        let line = cells.collect::<Vec<_>>().join(",");
        writeln!(self.writer, "{line}").map_err(|err| RaincastError::OutputWrite {
            path: self.path.clone(),
            reason: err.to_string(),
        })
    }
}

impl ResultSink for CsvSink {
    fn write_header(&mut self, columns: &[&'static str]) -> RaincastResult<()> {
        let cells = columns
            .iter()
            .chain(FILENAME_COLUMNS.iter())
            .map(|c| c.to_string());
        self.write_line(cells)
    }

    fn write_row(&mut self, record: &TrialRecord) -> RaincastResult<()> {
        let cells = record.cells.iter().cloned().chain(
            record
                .sources
                .iter()
                .map(|p| p.display().to_string()),
        );
        self.write_line(cells)
    }

    fn write_image(
        &mut self,
        _triple_index: usize,
        _trial: u64,
        _composite: &RasterImage,
    ) -> RaincastResult<()> {
        Ok(())
    }

    fn finalize(&mut self) -> RaincastResult<()> {
        self.writer.flush().map_err(|err| RaincastError::OutputWrite {
            path: self.path.clone(),
            reason: err.to_string(),
        })
    }
}
