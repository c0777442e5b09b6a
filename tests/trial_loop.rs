//! Termination and persistence protocol of the trial loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use raincast::{
    AlgorithmGenerator, AlgorithmRegistry, Corpus, CorpusEntry, FitnessScore, FitnessScorer,
    ParameterSpace, Plane, RaincastError, RaincastResult, RasterImage, ResultSink, SsimScorer,
    SweepOutcome, TrialLoop, TrialRecord,
};

/// What a sweep pushed into its sink, for post-run inspection.
#[derive(Default)]
struct SinkLog {
    headers: Vec<Vec<&'static str>>,
    rows: Vec<TrialRecord>,
    images: Vec<(usize, u64)>,
    finalized: u32,
}

#[derive(Clone)]
struct MemorySink {
    log: Arc<Mutex<SinkLog>>,
    fail_rows: bool,
    fail_images: bool,
}

impl MemorySink {
    fn new() -> (Self, Arc<Mutex<SinkLog>>) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        (
            Self {
                log: Arc::clone(&log),
                fail_rows: false,
                fail_images: false,
            },
            log,
        )
    }

    fn failing_rows(mut self) -> Self {
        self.fail_rows = true;
        self
    }

    fn failing_images(mut self) -> Self {
        self.fail_images = true;
        self
    }
}

impl ResultSink for MemorySink {
    fn write_header(&mut self, columns: &[&'static str]) -> RaincastResult<()> {
        self.log.lock().unwrap().headers.push(columns.to_vec());
        Ok(())
    }

    fn write_row(&mut self, record: &TrialRecord) -> RaincastResult<()> {
        if self.fail_rows {
            return Err(RaincastError::OutputWrite {
                path: PathBuf::from("memory"),
                reason: "simulated row failure".to_string(),
            });
        }
        self.log.lock().unwrap().rows.push(record.clone());
        Ok(())
    }

    fn write_image(
        &mut self,
        triple_index: usize,
        trial: u64,
        _composite: &RasterImage,
    ) -> RaincastResult<()> {
        if self.fail_images {
            return Err(RaincastError::OutputWrite {
                path: PathBuf::from("memory"),
                reason: "simulated image failure".to_string(),
            });
        }
        self.log.lock().unwrap().images.push((triple_index, trial));
        Ok(())
    }

    fn finalize(&mut self) -> RaincastResult<()> {
        self.log.lock().unwrap().finalized += 1;
        Ok(())
    }
}

/// Counts how often the trial loop asks for another algorithm.
#[derive(Debug)]
struct CountingGenerator {
    inner: Box<dyn AlgorithmGenerator>,
    calls: Arc<AtomicU64>,
}

impl AlgorithmGenerator for CountingGenerator {
    fn next_algorithm(&mut self) -> Option<Box<dyn raincast::FlowAlgorithm>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.next_algorithm()
    }
}

struct FailingScorer;

impl FitnessScorer for FailingScorer {
    fn score(
        &self,
        _composite: &RasterImage,
        _truth: &RasterImage,
    ) -> RaincastResult<FitnessScore> {
        Err(RaincastError::InvalidInput("simulated scorer failure"))
    }
}

fn corpus(images: usize) -> Corpus {
    let entries = (0..images)
        .map(|i| {
            let planes = (0..3)
                .map(|c| Plane::filled(16, 16, 20 + (i * 3 + c) as u8).unwrap())
                .collect::<Vec<_>>();
            CorpusEntry {
                path: PathBuf::from(format!("img_{i:03}.png")),
                image: RasterImage::from_planes(planes).unwrap(),
            }
        })
        .collect();
    Corpus::from_entries(entries).unwrap()
}

fn fb_generator(calls: &Arc<AtomicU64>) -> Box<dyn AlgorithmGenerator> {
    Box::new(CountingGenerator {
        inner: AlgorithmRegistry::create("fb", ParameterSpace::default()).unwrap(),
        calls: Arc::clone(calls),
    })
}

#[test]
fn trial_cap_limits_generator_calls() {
    let calls = Arc::new(AtomicU64::new(0));
    let (sink, log) = MemorySink::new();

    let report = TrialLoop::new(
        corpus(3),
        fb_generator(&calls),
        Box::new(SsimScorer::default()),
        Box::new(sink),
    )
    .with_trial_cap(3)
    .run()
    .unwrap();

    assert_eq!(report.outcome, SweepOutcome::CapReached);
    assert_eq!(report.trials, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let log = log.lock().unwrap();
    assert_eq!(log.rows.len(), 3);
    assert_eq!(log.finalized, 1);
    // Header written once, before the first trial only.
    assert_eq!(log.headers.len(), 1);
}

#[test]
fn exhaustion_ends_the_sweep_normally() {
    let (sink, log) = MemorySink::new();
    let generator = AlgorithmRegistry::create("per", ParameterSpace::default()).unwrap();

    let report = TrialLoop::new(
        corpus(5),
        generator,
        Box::new(SsimScorer::default()),
        Box::new(sink),
    )
    .run()
    .unwrap();

    assert_eq!(report.outcome, SweepOutcome::Exhausted);
    assert_eq!(report.trials, 1);
    // One row per consecutive triple of the 5-image corpus.
    assert_eq!(report.rows, 3);

    let log = log.lock().unwrap();
    assert_eq!(log.rows.len(), 3);
    assert_eq!(log.images, vec![(0, 0), (1, 0), (2, 0)]);
    assert_eq!(log.finalized, 1);

    for (idx, record) in log.rows.iter().enumerate() {
        assert_eq!(
            record.sources[0],
            PathBuf::from(format!("img_{idx:03}.png"))
        );
        assert_eq!(
            record.sources[2],
            PathBuf::from(format!("img_{:03}.png", idx + 2))
        );
    }
}

#[test]
fn fatal_scorer_error_still_finalizes_the_sink_once() {
    let calls = Arc::new(AtomicU64::new(0));
    let (sink, log) = MemorySink::new();

    let result = TrialLoop::new(
        corpus(3),
        fb_generator(&calls),
        Box::new(FailingScorer),
        Box::new(sink),
    )
    .run();

    assert!(result.is_err());
    let log = log.lock().unwrap();
    assert_eq!(log.finalized, 1);
    assert!(log.rows.is_empty());
}

#[test]
fn failed_row_write_is_fatal() {
    let calls = Arc::new(AtomicU64::new(0));
    let (sink, log) = MemorySink::new();
    let sink = sink.failing_rows();

    let result = TrialLoop::new(
        corpus(3),
        fb_generator(&calls),
        Box::new(SsimScorer::default()),
        Box::new(sink),
    )
    .run();

    assert!(matches!(result, Err(RaincastError::OutputWrite { .. })));
    assert_eq!(log.lock().unwrap().finalized, 1);
}

#[test]
fn failed_image_write_is_skipped_and_the_sweep_continues() {
    let (sink, log) = MemorySink::new();
    let sink = sink.failing_images();
    let generator = AlgorithmRegistry::create("per", ParameterSpace::default()).unwrap();

    let report = TrialLoop::new(
        corpus(4),
        generator,
        Box::new(SsimScorer::default()),
        Box::new(sink),
    )
    .run()
    .unwrap();

    assert_eq!(report.outcome, SweepOutcome::Exhausted);
    let log = log.lock().unwrap();
    // No image persisted, every row still written.
    assert!(log.images.is_empty());
    assert_eq!(log.rows.len(), 2);
    assert_eq!(log.finalized, 1);
}

#[test]
fn zero_cap_never_touches_the_generator() {
    let calls = Arc::new(AtomicU64::new(0));
    let (sink, log) = MemorySink::new();

    let report = TrialLoop::new(
        corpus(3),
        fb_generator(&calls),
        Box::new(SsimScorer::default()),
        Box::new(sink),
    )
    .with_trial_cap(0)
    .run()
    .unwrap();

    assert_eq!(report.outcome, SweepOutcome::CapReached);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(log.lock().unwrap().finalized, 1);
}
