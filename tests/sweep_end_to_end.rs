//! Full sweep over a synthetic shifted-block corpus, through the filesystem
//! sink and back out of the PNG codec.

#![cfg(feature = "image-io")]

use std::fs;
use std::path::{Path, PathBuf};

use raincast::io::{load_corpus, load_raster, save_composite, FsSink};
use raincast::{
    AlgorithmGenerator, FitnessScore, FlowAlgorithm, FlowField, Plane, RaincastResult,
    RasterImage, SsimScorer, SweepOutcome, TrialLoop,
};

const WIDTH: usize = 32;
const HEIGHT: usize = 32;
const BLOCK: usize = 8;
const SHIFT_X: usize = 3;
const SHIFT_Y: usize = 2;

/// Flow stub that reports a fixed displacement on every pixel.
///
/// With the block moving by `(SHIFT_X, SHIFT_Y)` per frame, the field that
/// recovers the motion points back by the same amount.
struct ConstantFlow {
    dx: f32,
    dy: f32,
    score: Option<FitnessScore>,
}

impl FlowAlgorithm for ConstantFlow {
    fn mnemonic(&self) -> &'static str {
        "const"
    }

    fn evaluate(&self, _prev: &Plane, curr: &Plane) -> RaincastResult<Plane> {
        let area = curr.width() * curr.height();
        let field = FlowField::new(
            vec![self.dx; area],
            vec![self.dy; area],
            curr.width(),
            curr.height(),
        )?;
        field.warp(curr)
    }

    fn columns(&self) -> Vec<&'static str> {
        vec!["algo", "dx", "dy"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.mnemonic().to_string(),
            format!("{}", self.dx),
            format!("{}", self.dy),
        ]
    }

    fn store_score(&mut self, score: FitnessScore) {
        self.score = Some(score);
    }

    fn score(&self) -> Option<&FitnessScore> {
        self.score.as_ref()
    }
}

struct ConstantGenerator {
    spent: bool,
}

impl AlgorithmGenerator for ConstantGenerator {
    fn next_algorithm(&mut self) -> Option<Box<dyn FlowAlgorithm>> {
        if self.spent {
            return None;
        }
        self.spent = true;
        Some(Box::new(ConstantFlow {
            dx: -(SHIFT_X as f32),
            dy: -(SHIFT_Y as f32),
            score: None,
        }))
    }
}

/// Black frame with a coloured block whose top-left corner sits at `(x0, y0)`.
fn block_frame(x0: usize, y0: usize) -> RasterImage {
    let mut planes = Vec::new();
    for value in [200u8, 150, 100] {
        let mut data = vec![0u8; WIDTH * HEIGHT];
        for y in y0..y0 + BLOCK {
            for x in x0..x0 + BLOCK {
                data[y * WIDTH + x] = value;
            }
        }
        planes.push(Plane::new(data, WIDTH, HEIGHT).unwrap());
    }
    RasterImage::from_planes(planes).unwrap()
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn shifted_block_sweep_writes_exact_prediction_and_one_row() {
    let root = scratch_dir("shifted_block");
    let src = root.join("src");
    let dest = root.join("dest");
    fs::create_dir_all(&src).unwrap();

    // B is A shifted by the known offset, C is B shifted again.
    let frames = [
        block_frame(10, 10),
        block_frame(10 + SHIFT_X, 10 + SHIFT_Y),
        block_frame(10 + 2 * SHIFT_X, 10 + 2 * SHIFT_Y),
    ];
    for (idx, frame) in frames.iter().enumerate() {
        save_composite(&src.join(format!("frame_{idx}.png")), frame).unwrap();
    }

    let corpus = load_corpus(&src).unwrap();
    assert_eq!(corpus.len(), 3);

    let sink = FsSink::create(&dest, "params.csv").unwrap();
    let report = TrialLoop::new(
        corpus,
        Box::new(ConstantGenerator { spent: false }),
        Box::new(SsimScorer::default()),
        Box::new(sink),
    )
    .run()
    .unwrap();

    assert_eq!(report.outcome, SweepOutcome::Exhausted);
    assert_eq!(report.trials, 1);
    assert_eq!(report.rows, 1);

    // The integer-offset prediction reproduces frame C exactly.
    let composite = load_raster(&dest.join("01_02").join("00000.png")).unwrap();
    let truth = &frames[2];
    for chnl in 0..3 {
        assert_eq!(
            composite.channel(chnl).unwrap(),
            truth.channel(chnl).unwrap(),
            "channel {chnl} of the prediction differs from frame C"
        );
    }

    // Validity marks exactly the block.
    let alpha = composite.channel(3).unwrap();
    let block_x = 10 + 2 * SHIFT_X;
    let block_y = 10 + 2 * SHIFT_Y;
    assert_eq!(alpha.get(block_x, block_y), Some(255));
    assert_eq!(alpha.get(0, 0), Some(0));

    // Exactly one data row, carrying the mnemonic and the source names.
    let text = fs::read_to_string(dest.join("params.csv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "algo,dx,dy,image_1,image_2,image_test");
    assert!(lines[1].starts_with("const,-3,-2,"));
    for idx in 0..3 {
        assert!(
            lines[1].contains(&format!("frame_{idx}.png")),
            "row should reference frame_{idx}.png: {}",
            lines[1]
        );
    }
}

#[test]
fn corpus_loading_is_lexical_and_requires_three_images() {
    let root = scratch_dir("corpus_rules");
    let src = root.join("src");
    fs::create_dir_all(&src).unwrap();

    let frame = block_frame(4, 4);
    // Written out of order; the loader must sort lexically.
    for name in ["c_frame.png", "a_frame.png", "b_frame.png"] {
        save_composite(&src.join(name), &frame).unwrap();
    }
    // Non-matching files are ignored.
    fs::write(src.join("notes.txt"), "not an image").unwrap();

    let corpus = load_corpus(&src).unwrap();
    let names: Vec<_> = corpus
        .entries()
        .iter()
        .map(|e| e.path.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["a_frame.png", "b_frame.png", "c_frame.png"]);

    // Two images are not a corpus.
    let thin = root.join("thin");
    fs::create_dir_all(&thin).unwrap();
    save_composite(&thin.join("x.png"), &frame).unwrap();
    save_composite(&thin.join("y.png"), &frame).unwrap();
    assert!(load_corpus(&thin).is_err());
}

#[test]
fn undecodable_image_aborts_the_corpus_load() {
    let root = scratch_dir("bad_image");
    let src = root.join("src");
    fs::create_dir_all(&src).unwrap();

    let frame = block_frame(2, 2);
    save_composite(&src.join("a.png"), &frame).unwrap();
    save_composite(&src.join("b.png"), &frame).unwrap();
    fs::write(src.join("c.png"), b"this is not a png").unwrap();
    save_composite(&src.join("d.png"), &frame).unwrap();

    assert!(load_corpus(&src).is_err());
}
