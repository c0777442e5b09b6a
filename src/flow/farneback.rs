//! Farnebäck dense optical flow.
//!
//! Each pixel neighbourhood is approximated by a quadratic polynomial fitted
//! under a Gaussian applicability (`poly_area` neighbourhood, `poly_width`
//! sigma). Matching the expansion coefficients of the two frames yields a
//! displacement estimate, refined iteratively over a coarse-to-fine image
//! pyramid, with the 2x2 normal equations averaged over a `smoothing` window
//! before solving.

use crate::flow::field::FlowField;
use crate::flow::{AlgorithmGenerator, FlowAlgorithm};
use crate::plane::filter::{box_blur, gaussian_kernel, resize_bilinear};
use crate::plane::Plane;
use crate::score::FitnessScore;
use crate::sweep::{ParameterGenerator, ParameterSet, ParameterSpace};
use crate::util::RaincastResult;

pub(crate) const MNEMONIC: &str = "fb";

/// Smallest pyramid level edge worth expanding.
const MIN_LEVEL_DIM: usize = 16;

/// Determinant floor below which the displacement update is skipped.
const DET_EPS: f32 = 1e-6;

/// Fully parameterized Farnebäck flow, one instance per parameter set.
pub struct FarnebackFlow {
    params: ParameterSet,
    score: Option<FitnessScore>,
}

impl FarnebackFlow {
    /// Creates an estimator configured with one candidate parameter set.
    pub fn new(params: ParameterSet) -> Self {
        Self {
            params,
            score: None,
        }
    }

    /// The parameter set this instance was configured with.
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Estimates the field `d` such that `curr(x) ~ prev(x + d(x))`.
    ///
    /// This is the reverse flow of the frame pair: warping `curr` along `d`
    /// advances the observed motion by one step.
    pub fn estimate(&self, prev: &Plane, curr: &Plane) -> RaincastResult<FlowField> {
        prev.geometry_check(curr)?;
        let width = prev.width();
        let height = prev.height();

        let dims = self.level_dims(width, height);
        let coarsest = dims.len() - 1;

        let prev_f = prev.to_f32();
        let curr_f = curr.to_f32();

        let mut flow = FlowField::zero(dims[coarsest].0, dims[coarsest].1)?;
        for level in (0..dims.len()).rev() {
            let (lw, lh) = dims[level];
            if level != coarsest {
                flow = upsample_flow(&flow, lw, lh)?;
            }

            let prev_level = level_image(&prev_f, width, height, lw, lh, self.params.scale, level);
            let curr_level = level_image(&curr_f, width, height, lw, lh, self.params.scale, level);

            // Frame roles: r1 is the frame being extrapolated, r2 the one
            // motion points back to.
            let r1 = PolyExpansion::compute(
                &curr_level,
                lw,
                lh,
                self.params.poly_area,
                self.params.poly_width,
            );
            let r2 = PolyExpansion::compute(
                &prev_level,
                lw,
                lh,
                self.params.poly_area,
                self.params.poly_width,
            );

            for _ in 0..self.params.iterations.max(1) {
                update_flow(&r1, &r2, &mut flow, lw, lh, self.params.smoothing / 2);
            }
        }

        Ok(flow)
    }

    /// Pyramid geometries, finest first, coarsest last.
    fn level_dims(&self, width: usize, height: usize) -> Vec<(usize, usize)> {
        let mut dims = vec![(width, height)];
        let mut factor = 1.0f32;
        for _ in 1..self.params.levels.max(1) {
            factor *= self.params.scale;
            let lw = (width as f32 * factor).round() as usize;
            let lh = (height as f32 * factor).round() as usize;
            if lw < MIN_LEVEL_DIM || lh < MIN_LEVEL_DIM {
                break;
            }
            dims.push((lw, lh));
        }
        dims
    }
}

impl FlowAlgorithm for FarnebackFlow {
    fn mnemonic(&self) -> &'static str {
        MNEMONIC
    }

    fn evaluate(&self, prev: &Plane, curr: &Plane) -> RaincastResult<Plane> {
        let flow = self.estimate(prev, curr)?;
        flow.warp(curr)
    }

    fn columns(&self) -> Vec<&'static str> {
        vec![
            "algo",
            "scale",
            "levels",
            "smoothing",
            "iterations",
            "poly_area",
            "poly_width",
            "ssim_r",
            "ssim_g",
            "ssim_b",
            "ssim_mean",
        ]
    }

    fn row(&self) -> Vec<String> {
        let mut cells = vec![
            MNEMONIC.to_string(),
            format!("{}", self.params.scale),
            format!("{}", self.params.levels),
            format!("{}", self.params.smoothing),
            format!("{}", self.params.iterations),
            format!("{}", self.params.poly_area),
            format!("{}", self.params.poly_width),
        ];
        match &self.score {
            Some(score) => {
                cells.push(format!("{:.6}", score.r));
                cells.push(format!("{:.6}", score.g));
                cells.push(format!("{:.6}", score.b));
                cells.push(format!("{:.6}", score.mean()));
            }
            None => cells.extend(std::iter::repeat(String::new()).take(4)),
        }
        cells
    }

    fn store_score(&mut self, score: FitnessScore) {
        self.score = Some(score);
    }

    fn score(&self) -> Option<&FitnessScore> {
        self.score.as_ref()
    }
}

/// Emits one configured [`FarnebackFlow`] per parameter combination.
#[derive(Debug)]
pub struct FarnebackGenerator {
    params: ParameterGenerator,
}

impl FarnebackGenerator {
    /// Starts a fresh enumeration of `space`.
    pub fn new(space: ParameterSpace) -> Self {
        Self {
            params: space.generator(),
        }
    }
}

impl AlgorithmGenerator for FarnebackGenerator {
    fn next_algorithm(&mut self) -> Option<Box<dyn FlowAlgorithm>> {
        self.params
            .next_set()
            .map(|set| Box::new(FarnebackFlow::new(set)) as Box<dyn FlowAlgorithm>)
    }
}

/// Quadratic expansion coefficients per pixel.
///
/// The local signal model is `c0 + bx*u + by*v + axx*u^2 + ayy*v^2 +
/// 2*axy*u*v` for offsets `(u, v)` around the pixel.
struct PolyExpansion {
    bx: Vec<f32>,
    by: Vec<f32>,
    axx: Vec<f32>,
    ayy: Vec<f32>,
    axy: Vec<f32>,
}

impl PolyExpansion {
    fn compute(img: &[f32], width: usize, height: usize, n: usize, sigma: f32) -> Self {
        let n = n.max(1);
        let g = gaussian_kernel(sigma, n);

        // 1-D applicability moments; the normal-equation matrix depends only
        // on these, not on the image.
        let mut m2 = 0.0f32;
        let mut m4 = 0.0f32;
        for (k, &w) in g.iter().enumerate() {
            let u = k as f32 - n as f32;
            m2 += w * u * u;
            m4 += w * u * u * u * u;
        }
        let even_det = m4 - m2 * m2;

        // Horizontal pass: weighted sums of f, u*f and u^2*f per row.
        let area = width * height;
        let mut s0 = vec![0.0f32; area];
        let mut s1 = vec![0.0f32; area];
        let mut s2 = vec![0.0f32; area];
        for y in 0..height {
            let row = &img[y * width..(y + 1) * width];
            for x in 0..width {
                let mut acc0 = 0.0f32;
                let mut acc1 = 0.0f32;
                let mut acc2 = 0.0f32;
                for (k, &w) in g.iter().enumerate() {
                    let u = k as f32 - n as f32;
                    let sx = (x as isize + k as isize - n as isize).clamp(0, width as isize - 1);
                    let value = row[sx as usize];
                    acc0 += w * value;
                    acc1 += w * u * value;
                    acc2 += w * u * u * value;
                }
                let idx = y * width + x;
                s0[idx] = acc0;
                s1[idx] = acc1;
                s2[idx] = acc2;
            }
        }

        // Vertical pass combines the row sums into 2-D moments, then solves
        // the (decoupled) normal equations per pixel.
        let mut out = Self {
            bx: vec![0.0f32; area],
            by: vec![0.0f32; area],
            axx: vec![0.0f32; area],
            ayy: vec![0.0f32; area],
            axy: vec![0.0f32; area],
        };
        for y in 0..height {
            for x in 0..width {
                let mut m00 = 0.0f32;
                let mut m10 = 0.0f32;
                let mut m01 = 0.0f32;
                let mut m20 = 0.0f32;
                let mut m02 = 0.0f32;
                let mut m11 = 0.0f32;
                for (k, &w) in g.iter().enumerate() {
                    let v = k as f32 - n as f32;
                    let sy = (y as isize + k as isize - n as isize).clamp(0, height as isize - 1);
                    let idx = sy as usize * width + x;
                    m00 += w * s0[idx];
                    m01 += w * v * s0[idx];
                    m02 += w * v * v * s0[idx];
                    m10 += w * s1[idx];
                    m11 += w * v * s1[idx];
                    m20 += w * s2[idx];
                }

                let idx = y * width + x;
                out.bx[idx] = m10 / m2;
                out.by[idx] = m01 / m2;
                out.axy[idx] = 0.5 * m11 / (m2 * m2);
                let diff = (m20 - m02) / even_det;
                let sum = (m20 + m02 - 2.0 * m2 * m00) / even_det;
                out.axx[idx] = 0.5 * (sum + diff);
                out.ayy[idx] = 0.5 * (sum - diff);
            }
        }
        out
    }
}

/// One displacement refinement pass.
///
/// Builds the per-pixel 2x2 system from the averaged expansion coefficients,
/// folds the prior displacement into the constraint, averages the system over
/// the smoothing window and solves.
fn update_flow(
    r1: &PolyExpansion,
    r2: &PolyExpansion,
    flow: &mut FlowField,
    width: usize,
    height: usize,
    radius: usize,
) {
    let area = width * height;
    let mut m11 = vec![0.0f32; area];
    let mut m12 = vec![0.0f32; area];
    let mut m22 = vec![0.0f32; area];
    let mut h1 = vec![0.0f32; area];
    let mut h2 = vec![0.0f32; area];

    {
        let (dx, dy) = flow_components(flow, width, height);
        for y in 0..height {
            for x in 0..width {
                let idx = y * width + x;

                // Coefficients of the displaced frame, sampled at the prior
                // estimate (clamped nearest pixel).
                let sx = ((x as f32 + dx[idx]).round() as isize).clamp(0, width as isize - 1);
                let sy = ((y as f32 + dy[idx]).round() as isize).clamp(0, height as isize - 1);
                let sidx = sy as usize * width + sx as usize;

                let a11 = 0.5 * (r1.axx[idx] + r2.axx[sidx]);
                let a12 = 0.5 * (r1.axy[idx] + r2.axy[sidx]);
                let a22 = 0.5 * (r1.ayy[idx] + r2.ayy[sidx]);
                let db1 = -0.5 * (r2.bx[sidx] - r1.bx[idx]);
                let db2 = -0.5 * (r2.by[sidx] - r1.by[idx]);

                m11[idx] = a11;
                m12[idx] = a12;
                m22[idx] = a22;
                h1[idx] = db1 + a11 * dx[idx] + a12 * dy[idx];
                h2[idx] = db2 + a12 * dx[idx] + a22 * dy[idx];
            }
        }
    }

    let m11 = box_blur(&m11, width, height, radius);
    let m12 = box_blur(&m12, width, height, radius);
    let m22 = box_blur(&m22, width, height, radius);
    let h1 = box_blur(&h1, width, height, radius);
    let h2 = box_blur(&h2, width, height, radius);

    let (dx, dy) = flow.components_mut();
    for idx in 0..area {
        let det = m11[idx] * m22[idx] - m12[idx] * m12[idx];
        if det.abs() < DET_EPS {
            continue;
        }
        dx[idx] = (m22[idx] * h1[idx] - m12[idx] * h2[idx]) / det;
        dy[idx] = (m11[idx] * h2[idx] - m12[idx] * h1[idx]) / det;
    }
}

fn flow_components(flow: &FlowField, width: usize, height: usize) -> (Vec<f32>, Vec<f32>) {
    let mut dx = vec![0.0f32; width * height];
    let mut dy = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let (fx, fy) = flow.at(x, y);
            dx[y * width + x] = fx;
            dy[y * width + x] = fy;
        }
    }
    (dx, dy)
}

/// Carries a coarser field to a finer geometry, rescaling the displacements.
fn upsample_flow(flow: &FlowField, width: usize, height: usize) -> RaincastResult<FlowField> {
    let (dx, dy) = flow_components(flow, flow.width(), flow.height());
    let scale_x = width as f32 / flow.width() as f32;
    let scale_y = height as f32 / flow.height() as f32;
    let mut dx = resize_bilinear(&dx, flow.width(), flow.height(), width, height);
    let mut dy = resize_bilinear(&dy, flow.width(), flow.height(), width, height);
    for v in &mut dx {
        *v *= scale_x;
    }
    for v in &mut dy {
        *v *= scale_y;
    }
    FlowField::new(dx, dy, width, height)
}

/// Gaussian-smoothed resize of the base image to a pyramid level.
fn level_image(
    base: &[f32],
    width: usize,
    height: usize,
    level_width: usize,
    level_height: usize,
    scale: f32,
    level: usize,
) -> Vec<f32> {
    if level == 0 {
        return base.to_vec();
    }
    let factor = scale.powi(level as i32);
    let sigma = (1.0 / factor - 1.0) * 0.5;
    let radius = ((sigma * 3.0).ceil() as usize).max(1);
    let kernel = gaussian_kernel(sigma, radius);
    let smoothed = crate::plane::filter::convolve_separable(base, width, height, &kernel);
    resize_bilinear(&smoothed, width, height, level_width, level_height)
}
