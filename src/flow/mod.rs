//! Flow-algorithm abstraction and the mnemonic registry.
//!
//! Algorithms are configured at construction and shared read-only across the
//! three concurrent channel tasks of a trial; the fitness score is written
//! back by the sequential trial thread after the join.

use crate::plane::Plane;
use crate::score::FitnessScore;
use crate::sweep::ParameterSpace;
use crate::util::{RaincastError, RaincastResult};

pub mod farneback;
pub mod field;
pub mod persistence;

pub use farneback::FarnebackFlow;
pub use field::FlowField;
pub use persistence::PersistenceFlow;

/// A configured dense-flow estimator applied independently per colour plane.
pub trait FlowAlgorithm: Send + Sync {
    /// Mnemonic identifying the algorithm family in output rows.
    fn mnemonic(&self) -> &'static str;

    /// Estimates motion from `curr` back to `prev`, then extrapolates `curr`
    /// one step forward along the recovered field.
    ///
    /// Out-of-bounds samples in the extrapolation stay transparent; the
    /// pipeline's validity plane masks them downstream.
    fn evaluate(&self, prev: &Plane, curr: &Plane) -> RaincastResult<Plane>;

    /// Column names for this algorithm's section of an output row.
    ///
    /// Empty for algorithms with nothing to report.
    fn columns(&self) -> Vec<&'static str>;

    /// Values matching [`columns`](Self::columns), rendered as row cells.
    fn row(&self) -> Vec<String>;

    /// Stores the latest fitness score, replacing any previous one.
    fn store_score(&mut self, score: FitnessScore);

    /// The most recently stored fitness score, if any trial has been scored.
    fn score(&self) -> Option<&FitnessScore>;
}

/// Produces configured algorithm instances for one sweep.
///
/// `None` signals the parameter space is exhausted — permanently, like the
/// underlying parameter generator.
pub trait AlgorithmGenerator: std::fmt::Debug {
    /// The next configured instance, or `None` once exhausted.
    fn next_algorithm(&mut self) -> Option<Box<dyn FlowAlgorithm>>;
}

/// Maps an algorithm mnemonic to a fresh per-sweep generator.
pub struct AlgorithmRegistry;

impl AlgorithmRegistry {
    /// Resolves `mnemonic` to a generator over `space`.
    ///
    /// Every call returns a fresh generator, so sweep state never leaks
    /// across independent runs. Unknown mnemonics fail before any work
    /// starts.
    pub fn create(
        mnemonic: &str,
        space: ParameterSpace,
    ) -> RaincastResult<Box<dyn AlgorithmGenerator>> {
        match mnemonic {
            farneback::MNEMONIC => Ok(Box::new(farneback::FarnebackGenerator::new(space))),
            persistence::MNEMONIC => Ok(Box::new(persistence::PersistenceGenerator::new())),
            _ => Err(RaincastError::UnknownAlgorithm {
                mnemonic: mnemonic.to_string(),
            }),
        }
    }

    /// Registered mnemonics, for diagnostics and usage text.
    pub fn mnemonics() -> &'static [&'static str] {
        &[farneback::MNEMONIC, persistence::MNEMONIC]
    }
}
