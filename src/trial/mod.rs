//! The sequential trial loop driving a sweep.
//!
//! One trial is a single parameter set evaluated over every consecutive image
//! triple of the corpus. Trials never overlap: the next parameter set is not
//! requested until the previous trial's persistence has completed. The only
//! concurrency lives inside [`ChannelPipeline`].

use std::time::{Duration, Instant};

use crate::corpus::Corpus;
use crate::flow::AlgorithmGenerator;
use crate::pipeline::ChannelPipeline;
use crate::score::FitnessScorer;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::RaincastResult;

pub mod sink;

pub use sink::{CsvSink, ResultSink, TrialRecord};

/// How a sweep ended; both variants are normal termination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The parameter generator produced every combination.
    Exhausted,
    /// The caller-imposed trial cap was reached first.
    CapReached,
}

/// Summary of a completed sweep.
#[derive(Clone, Copy, Debug)]
pub struct SweepReport {
    /// Why the sweep stopped.
    pub outcome: SweepOutcome,
    /// Parameter sets evaluated (equals generator calls that returned one).
    pub trials: u64,
    /// Result rows written.
    pub rows: u64,
    /// Wall time for the whole sweep.
    pub elapsed: Duration,
}

/// Orchestrates generator, pipeline, scorer and sink over a corpus.
pub struct TrialLoop {
    corpus: Corpus,
    generator: Box<dyn AlgorithmGenerator>,
    scorer: Box<dyn FitnessScorer>,
    sink: Box<dyn ResultSink>,
    pipeline: ChannelPipeline,
    trial_cap: Option<u64>,
}

impl TrialLoop {
    /// Assembles a sweep over `corpus`.
    pub fn new(
        corpus: Corpus,
        generator: Box<dyn AlgorithmGenerator>,
        scorer: Box<dyn FitnessScorer>,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        Self {
            corpus,
            generator,
            scorer,
            sink,
            pipeline: ChannelPipeline::default(),
            trial_cap: None,
        }
    }

    /// Replaces the default channel pipeline.
    pub fn with_pipeline(mut self, pipeline: ChannelPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Stops the sweep after at most `cap` parameter sets.
    ///
    /// The cap limits calls into the generator; it is enforced here, never by
    /// the generator itself.
    pub fn with_trial_cap(mut self, cap: u64) -> Self {
        self.trial_cap = Some(cap);
        self
    }

    /// Runs the sweep to completion.
    ///
    /// The sink is finalized exactly once on every path — cap, exhaustion or
    /// fatal error — before the result is surfaced.
    pub fn run(mut self) -> RaincastResult<SweepReport> {
        let started = Instant::now();
        let mut trials = 0u64;
        let mut rows = 0u64;

        let outcome = self.drive(&mut trials, &mut rows);
        let finalized = self.sink.finalize();

        let outcome = outcome?;
        finalized?;

        Ok(SweepReport {
            outcome,
            trials,
            rows,
            elapsed: started.elapsed(),
        })
    }

    fn drive(&mut self, trials: &mut u64, rows: &mut u64) -> RaincastResult<SweepOutcome> {
        loop {
            if let Some(cap) = self.trial_cap {
                if *trials >= cap {
                    return Ok(SweepOutcome::CapReached);
                }
            }
            let Some(mut algorithm) = self.generator.next_algorithm() else {
                return Ok(SweepOutcome::Exhausted);
            };

            let trial = *trials;
            *trials += 1;
            let set_started = Instant::now();
            let _span = trace_span!("parameter_trial", trial = trial).entered();

            if trial == 0 {
                self.sink.write_header(&algorithm.columns())?;
            }

            for index in 0..self.corpus.triple_count() {
                let (first, second, test) = self.corpus.triple(index);

                let composite =
                    self.pipeline
                        .evaluate(&first.image, &second.image, algorithm.as_ref())?;
                let score = self.scorer.score(&composite, &test.image)?;
                algorithm.store_score(score);

                // Composite image persistence is best-effort; the row is not.
                if let Err(err) = self.sink.write_image(index, trial, &composite) {
                    let reason = err.to_string();
                    trace_warn!("image_write_skipped", triple = index, reason = reason.as_str());
                }

                let record = TrialRecord {
                    cells: algorithm.row(),
                    sources: [
                        first.path.clone(),
                        second.path.clone(),
                        test.path.clone(),
                    ],
                };
                self.sink.write_row(&record)?;
                *rows += 1;
            }

            trace_event!(
                "parameter_set_done",
                trial = trial,
                secs = set_started.elapsed().as_secs_f64()
            );
        }
    }
}
