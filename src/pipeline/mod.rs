//! Per-channel concurrent evaluation pipeline.
//!
//! One trial splits two frames into their three colour planes, evaluates the
//! flow algorithm once per channel index — in parallel under the `rayon`
//! feature — joins all three results, merges them back in channel order and
//! appends a derived validity plane. Partial results are never observable:
//! any failing channel fails the whole call.

use crate::flow::FlowAlgorithm;
use crate::plane::{luminance, Plane, RasterImage};
use crate::trace::{trace_event, trace_span};
use crate::util::RaincastResult;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Fan-out/fan-in evaluator for a single trial.
#[derive(Clone, Copy, Debug)]
pub struct ChannelPipeline {
    /// Evaluate the three channels concurrently.
    ///
    /// Ignored without the `rayon` feature; either way the merged output is
    /// bit-identical because planes are joined in channel-index order.
    pub parallel: bool,
}

impl Default for ChannelPipeline {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl ChannelPipeline {
    /// Sequential pipeline, mainly for determinism comparisons.
    pub fn sequential() -> Self {
        Self { parallel: false }
    }

    /// Runs one trial: split, per-channel evaluation, join, merge, validity.
    ///
    /// The composite carries the three warped colour planes in their original
    /// order plus the derived validity plane.
    pub fn evaluate(
        &self,
        a: &RasterImage,
        b: &RasterImage,
        algorithm: &dyn FlowAlgorithm,
    ) -> RaincastResult<RasterImage> {
        let planes_a = a.color_planes()?;
        let planes_b = b.color_planes()?;

        let _span = trace_span!("channel_pipeline", parallel = self.parallel).entered();

        let warped = self.run_channels(&planes_a, &planes_b, algorithm)?;
        let validity = validity_plane(&warped)?;

        trace_event!("composite_merged", channels = warped.len() + 1);

        let mut channels = warped;
        channels.push(validity);
        RasterImage::from_planes(channels)
    }

    #[cfg(feature = "rayon")]
    fn run_channels(
        &self,
        planes_a: &[&Plane; 3],
        planes_b: &[&Plane; 3],
        algorithm: &dyn FlowAlgorithm,
    ) -> RaincastResult<Vec<Plane>> {
        if !self.parallel {
            return run_channels_seq(planes_a, planes_b, algorithm);
        }
        // Indexed parallel map: the collect is the join barrier, output
        // order follows channel index regardless of completion order, and
        // any channel error fails the whole collect.
        (0..3)
            .into_par_iter()
            .map(|chnl| algorithm.evaluate(planes_a[chnl], planes_b[chnl]))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn run_channels(
        &self,
        planes_a: &[&Plane; 3],
        planes_b: &[&Plane; 3],
        algorithm: &dyn FlowAlgorithm,
    ) -> RaincastResult<Vec<Plane>> {
        run_channels_seq(planes_a, planes_b, algorithm)
    }
}

fn run_channels_seq(
    planes_a: &[&Plane; 3],
    planes_b: &[&Plane; 3],
    algorithm: &dyn FlowAlgorithm,
) -> RaincastResult<Vec<Plane>> {
    (0..3)
        .map(|chnl| algorithm.evaluate(planes_a[chnl], planes_b[chnl]))
        .collect()
}

/// Validity plane of a merged composite.
///
/// A pixel is fully valid when its BT.601 luminance is non-zero; everything
/// else stays transparent. Out-of-bounds warp samples land at zero in all
/// three planes and are masked here.
fn validity_plane(channels: &[Plane]) -> RaincastResult<Plane> {
    let (r, g, b) = (&channels[0], &channels[1], &channels[2]);
    let data = r
        .data()
        .iter()
        .zip(g.data())
        .zip(b.data())
        .map(|((&pr, &pg), &pb)| {
            if luminance(pr, pg, pb) > 0.0 {
                u8::MAX
            } else {
                0
            }
        })
        .collect();
    Plane::new(data, r.width(), r.height())
}
