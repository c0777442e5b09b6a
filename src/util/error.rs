//! Error types for raincast.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for raincast operations.
pub type RaincastResult<T> = std::result::Result<T, RaincastError>;

/// Errors that can occur while preparing or running a sweep.
///
/// Exhaustion of the parameter space is deliberately not represented here:
/// running out of combinations is the normal end of a sweep and is reported
/// as a plain `None` from the generator.
#[derive(Debug, Error)]
pub enum RaincastError {
    /// The requested flow-algorithm mnemonic is not registered.
    #[error("unknown flow algorithm \"{mnemonic}\"")]
    UnknownAlgorithm {
        /// The mnemonic that failed to resolve.
        mnemonic: String,
    },
    /// Fewer than three usable images were found in the source directory.
    #[error("need at least 3 source images, found {found}")]
    InsufficientCorpus {
        /// Number of images that matched the corpus suffix.
        found: usize,
    },
    /// The source directory could not be listed.
    #[error("cannot list source directory {path}: {source}")]
    SourceDir {
        /// Directory that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The parameter-output sink could not be created.
    #[error("cannot open parameter output {path}: {source}")]
    OutputOpen {
        /// Path of the sink that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A required source image could not be read or decoded.
    #[error("cannot read source image {path}: {reason}")]
    ImageRead {
        /// Path of the unreadable image.
        path: PathBuf,
        /// Decoder or I/O failure description.
        reason: String,
    },
    /// An output could not be written.
    ///
    /// Fatal for parameter rows; composite-image writes are caught by the
    /// trial loop, logged and skipped.
    #[error("cannot write output {path}: {reason}")]
    OutputWrite {
        /// Path of the failed write.
        path: PathBuf,
        /// Encoder or I/O failure description.
        reason: String,
    },
    /// A plane or image was constructed with impossible dimensions.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width in pixels.
        width: usize,
        /// Requested height in pixels.
        height: usize,
    },
    /// A buffer does not match the geometry it claims.
    #[error("buffer of {got} bytes does not cover {needed}")]
    BufferMismatch {
        /// Bytes required by the stated geometry.
        needed: usize,
        /// Bytes actually supplied.
        got: usize,
    },
    /// Two images that must be co-registered have different geometry.
    #[error("geometry mismatch: {expected_width}x{expected_height} vs {got_width}x{got_height}")]
    GeometryMismatch {
        /// Expected width in pixels.
        expected_width: usize,
        /// Expected height in pixels.
        expected_height: usize,
        /// Actual width in pixels.
        got_width: usize,
        /// Actual height in pixels.
        got_height: usize,
    },
    /// An image does not carry the three colour channels the pipeline needs.
    #[error("image must carry at least 3 colour channels, got {got}")]
    ChannelCount {
        /// Channels present in the offending image.
        got: usize,
    },
    /// A parameter axis violates its domain rules.
    #[error("invalid parameter axis: {0}")]
    InvalidAxis(&'static str),
    /// The input data or configuration is invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}
