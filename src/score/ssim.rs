//! Gaussian-windowed structural similarity.
//!
//! Per-channel SSIM with the standard constants `C1 = (0.01 * 255)^2` and
//! `C2 = (0.03 * 255)^2`; local statistics come from an 11x11 Gaussian window
//! with sigma 1.5. The channel score is the mean of the SSIM map.

use crate::plane::filter::{convolve_separable, gaussian_kernel};
use crate::plane::{Plane, RasterImage};
use crate::score::{FitnessScore, FitnessScorer};
use crate::util::{RaincastError, RaincastResult};

const C1: f32 = 6.5025;
const C2: f32 = 58.5225;

/// Structural-similarity fitness scorer over the three colour planes.
///
/// A fourth plane on either argument (source alpha, derived validity) is
/// ignored: only colour content is compared.
#[derive(Clone, Debug)]
pub struct SsimScorer {
    window: usize,
    sigma: f32,
}

impl SsimScorer {
    /// Creates a scorer with a custom window; `window` must be odd.
    pub fn new(window: usize, sigma: f32) -> RaincastResult<Self> {
        if window % 2 == 0 || window == 0 {
            return Err(RaincastError::InvalidInput("SSIM window must be odd"));
        }
        Ok(Self { window, sigma })
    }

    /// Mean SSIM between two co-registered planes.
    pub fn plane_ssim(&self, a: &Plane, b: &Plane) -> RaincastResult<f32> {
        a.geometry_check(b)?;
        let width = a.width();
        let height = a.height();
        let kernel = gaussian_kernel(self.sigma, self.window / 2);

        let i1 = a.to_f32();
        let i2 = b.to_f32();
        let i1_sq: Vec<f32> = i1.iter().map(|v| v * v).collect();
        let i2_sq: Vec<f32> = i2.iter().map(|v| v * v).collect();
        let i1_i2: Vec<f32> = i1.iter().zip(&i2).map(|(x, y)| x * y).collect();

        let mu1 = convolve_separable(&i1, width, height, &kernel);
        let mu2 = convolve_separable(&i2, width, height, &kernel);
        let s1 = convolve_separable(&i1_sq, width, height, &kernel);
        let s2 = convolve_separable(&i2_sq, width, height, &kernel);
        let s12 = convolve_separable(&i1_i2, width, height, &kernel);

        let mut sum = 0.0f64;
        for idx in 0..i1.len() {
            let mu1_sq = mu1[idx] * mu1[idx];
            let mu2_sq = mu2[idx] * mu2[idx];
            let mu1_mu2 = mu1[idx] * mu2[idx];
            let sigma1_sq = s1[idx] - mu1_sq;
            let sigma2_sq = s2[idx] - mu2_sq;
            let sigma12 = s12[idx] - mu1_mu2;

            let num = (2.0 * mu1_mu2 + C1) * (2.0 * sigma12 + C2);
            let den = (mu1_sq + mu2_sq + C1) * (sigma1_sq + sigma2_sq + C2);
            sum += f64::from(num / den);
        }
        Ok((sum / i1.len() as f64) as f32)
    }
}

impl Default for SsimScorer {
    fn default() -> Self {
        Self {
            window: 11,
            sigma: 1.5,
        }
    }
}

impl FitnessScorer for SsimScorer {
    fn score(&self, composite: &RasterImage, truth: &RasterImage) -> RaincastResult<FitnessScore> {
        if !composite.same_geometry(truth) {
            return Err(RaincastError::GeometryMismatch {
                expected_width: truth.width(),
                expected_height: truth.height(),
                got_width: composite.width(),
                got_height: composite.height(),
            });
        }
        let [cr, cg, cb] = composite.color_planes()?;
        let [tr, tg, tb] = truth.color_planes()?;
        Ok(FitnessScore {
            r: self.plane_ssim(cr, tr)?,
            g: self.plane_ssim(cg, tg)?,
            b: self.plane_ssim(cb, tb)?,
        })
    }
}
