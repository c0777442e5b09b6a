//! Zero-displacement persistence baseline.
//!
//! Persistence is the canonical nowcasting reference: predict that nothing
//! moves. It takes no tunable parameters and reports no columns, but it
//! satisfies the full algorithm interface so the trial loop can sweep it
//! like any other variant.

use crate::flow::field::FlowField;
use crate::flow::{AlgorithmGenerator, FlowAlgorithm};
use crate::plane::Plane;
use crate::score::FitnessScore;
use crate::util::RaincastResult;

pub(crate) const MNEMONIC: &str = "per";

/// Placeholder flow that predicts the current frame unchanged.
#[derive(Default)]
pub struct PersistenceFlow {
    score: Option<FitnessScore>,
}

impl PersistenceFlow {
    /// Creates the baseline; there is nothing to configure.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlowAlgorithm for PersistenceFlow {
    fn mnemonic(&self) -> &'static str {
        MNEMONIC
    }

    fn evaluate(&self, prev: &Plane, curr: &Plane) -> RaincastResult<Plane> {
        prev.geometry_check(curr)?;
        let field = FlowField::zero(curr.width(), curr.height())?;
        field.warp(curr)
    }

    fn columns(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn row(&self) -> Vec<String> {
        Vec::new()
    }

    fn store_score(&mut self, score: FitnessScore) {
        self.score = Some(score);
    }

    fn score(&self) -> Option<&FitnessScore> {
        self.score.as_ref()
    }
}

/// Emits a single unparameterized instance, then exhausts.
///
/// A one-element "parameter space": anything else would sweep the same
/// baseline forever.
#[derive(Debug)]
pub struct PersistenceGenerator {
    spent: bool,
}

impl PersistenceGenerator {
    /// Starts a fresh single-combination sweep.
    pub fn new() -> Self {
        Self { spent: false }
    }
}

impl Default for PersistenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AlgorithmGenerator for PersistenceGenerator {
    fn next_algorithm(&mut self) -> Option<Box<dyn FlowAlgorithm>> {
        if self.spent {
            return None;
        }
        self.spent = true;
        Some(Box::new(PersistenceFlow::new()))
    }
}
