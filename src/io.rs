//! Corpus loading and composite persistence via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. The library core never
//! touches a codec; everything here converts between files and the owned
//! plane types.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::corpus::{Corpus, CorpusEntry};
use crate::plane::RasterImage;
use crate::trial::sink::{CsvSink, ResultSink, TrialRecord};
use crate::util::{RaincastError, RaincastResult};

/// Suffix a file must carry to join the corpus.
pub const IMAGE_SUFFIX: &str = ".png";

/// Loads and decodes one image as a 4-plane RGBA raster.
pub fn load_raster(path: &Path) -> RaincastResult<RasterImage> {
    let decoded = image::open(path).map_err(|err| RaincastError::ImageRead {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let rgba = decoded.to_rgba8();
    RasterImage::from_interleaved_rgba(
        rgba.as_raw(),
        rgba.width() as usize,
        rgba.height() as usize,
    )
}

/// Encodes a composite (colour planes + validity) as an RGBA PNG.
pub fn save_composite(path: &Path, composite: &RasterImage) -> RaincastResult<()> {
    let raw = composite.to_interleaved_rgba()?;
    let buffer = image::RgbaImage::from_raw(
        composite.width() as u32,
        composite.height() as u32,
        raw,
    )
    .ok_or_else(|| RaincastError::OutputWrite {
        path: path.to_path_buf(),
        reason: "buffer does not match geometry".to_string(),
    })?;
    buffer.save(path).map_err(|err| RaincastError::OutputWrite {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

/// Loads the sweep corpus from a directory.
///
/// Files ending in [`IMAGE_SUFFIX`] are taken in lexical order — corpora are
/// expected to use chronologically sortable names. Any undecodable image
/// aborts the load; a partially read corpus would silently skew the sweep.
pub fn load_corpus(dir: &Path) -> RaincastResult<Corpus> {
    let listing = fs::read_dir(dir).map_err(|source| RaincastError::SourceDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in listing {
        let entry = entry.map_err(|source| RaincastError::SourceDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_image = path
            .file_name()
            .and_then(OsStr::to_str)
            .is_some_and(|name| name.ends_with(IMAGE_SUFFIX));
        if is_image {
            paths.push(path);
        }
    }
    paths.sort();

    let entries = paths
        .into_iter()
        .map(|path| {
            let image = load_raster(&path)?;
            Ok(CorpusEntry { path, image })
        })
        .collect::<RaincastResult<Vec<_>>>()?;
    Corpus::from_entries(entries)
}

/// Filesystem sink: delimited rows plus one PNG per evaluation.
///
/// Images land at `<dest>/<i+1:02>_<i+2:02>/<trial:05>.png`, encoding the
/// triple position and the trial sequence number.
pub struct FsSink {
    rows: CsvSink,
    dest: PathBuf,
}

impl FsSink {
    /// Creates the destination tree and opens the row sink inside it.
    pub fn create(dest_dir: &Path, param_file: &str) -> RaincastResult<Self> {
        fs::create_dir_all(dest_dir).map_err(|source| RaincastError::OutputOpen {
            path: dest_dir.to_path_buf(),
            source,
        })?;
        let rows = CsvSink::create(&dest_dir.join(param_file))?;
        Ok(Self {
            rows,
            dest: dest_dir.to_path_buf(),
        })
    }

    fn image_path(&self, triple_index: usize, trial: u64) -> PathBuf {
        self.dest
            .join(format!("{:02}_{:02}", triple_index + 1, triple_index + 2))
            .join(format!("{trial:05}{IMAGE_SUFFIX}"))
    }
}

impl ResultSink for FsSink {
    fn write_header(&mut self, columns: &[&'static str]) -> RaincastResult<()> {
        self.rows.write_header(columns)
    }

    fn write_row(&mut self, record: &TrialRecord) -> RaincastResult<()> {
        self.rows.write_row(record)
    }

    fn write_image(
        &mut self,
        triple_index: usize,
        trial: u64,
        composite: &RasterImage,
    ) -> RaincastResult<()> {
        let path = self.image_path(triple_index, trial);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| RaincastError::OutputWrite {
                path: path.clone(),
                reason: err.to_string(),
            })?;
        }
        save_composite(&path, composite)
    }

    fn finalize(&mut self) -> RaincastResult<()> {
        self.rows.finalize()
    }
}
