//! Parameter domains for the flow sweep.
//!
//! A `ParameterSpace` holds one ordered, finite axis per tunable dimension of
//! the Farnebäck estimator. The `ParameterGenerator` enumerates the Cartesian
//! product of the axes exactly once, odometer style.

use crate::util::{RaincastError, RaincastResult};

pub mod generator;

pub use generator::ParameterGenerator;

/// Ordered, finite domain for one parameter dimension.
///
/// Order fixes the enumeration sequence only; any order is correct.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterAxis<T> {
    values: Vec<T>,
}

impl<T: PartialEq + Copy> ParameterAxis<T> {
    /// Creates an axis; rejects empty domains and duplicate values.
    pub fn new(values: Vec<T>) -> RaincastResult<Self> {
        if values.is_empty() {
            return Err(RaincastError::InvalidAxis("axis must not be empty"));
        }
        for (idx, value) in values.iter().enumerate() {
            if values[..idx].contains(value) {
                return Err(RaincastError::InvalidAxis("axis values must be distinct"));
            }
        }
        Ok(Self { values })
    }

    /// Number of values on the axis.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; construction rejects empty axes.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at a cursor position.
    pub fn value(&self, index: usize) -> T {
        self.values[index]
    }

    /// All values in enumeration order.
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

/// One immutable candidate configuration for the flow estimator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterSet {
    /// Scale between consecutive pyramid levels, in (0, 1).
    pub scale: f32,
    /// Number of pyramid levels.
    pub levels: usize,
    /// Averaging window size for the displacement update.
    pub smoothing: usize,
    /// Refinement iterations per pyramid level.
    pub iterations: usize,
    /// Neighbourhood size for the polynomial expansion.
    pub poly_area: usize,
    /// Gaussian width of the expansion applicability.
    pub poly_width: f32,
}

/// The swept axes: five tunable dimensions plus an optional explicit
/// `poly_width` axis.
///
/// Without an explicit axis, `poly_width` is derived from `poly_area` as
/// `1.2 * poly_area + 0.1`, the rule the training data was collected with.
#[derive(Clone, Debug)]
pub struct ParameterSpace {
    scale: ParameterAxis<f32>,
    levels: ParameterAxis<usize>,
    smoothing: ParameterAxis<usize>,
    iterations: ParameterAxis<usize>,
    poly_area: ParameterAxis<usize>,
    poly_width: Option<ParameterAxis<f32>>,
}

impl ParameterSpace {
    /// Creates a space from the five mandatory axes.
    pub fn new(
        scale: ParameterAxis<f32>,
        levels: ParameterAxis<usize>,
        smoothing: ParameterAxis<usize>,
        iterations: ParameterAxis<usize>,
        poly_area: ParameterAxis<usize>,
    ) -> RaincastResult<Self> {
        if scale.values().iter().any(|&s| s <= 0.0 || s >= 1.0) {
            return Err(RaincastError::InvalidAxis("scale values must lie in (0, 1)"));
        }
        Ok(Self {
            scale,
            levels,
            smoothing,
            iterations,
            poly_area,
            poly_width: None,
        })
    }

    /// Replaces the derived `poly_width` rule with an explicit axis.
    ///
    /// The axis becomes the most significant odometer digit.
    pub fn with_poly_width_axis(mut self, poly_width: ParameterAxis<f32>) -> Self {
        self.poly_width = Some(poly_width);
        self
    }

    /// Total number of combinations the space enumerates.
    pub fn combinations(&self) -> usize {
        self.axis_lens().iter().product()
    }

    /// Starts a fresh enumeration of this space.
    pub fn generator(&self) -> ParameterGenerator {
        ParameterGenerator::new(self.clone())
    }

    /// Axis lengths ordered least significant first.
    pub(crate) fn axis_lens(&self) -> Vec<usize> {
        let mut lens = vec![
            self.scale.len(),
            self.levels.len(),
            self.smoothing.len(),
            self.iterations.len(),
            self.poly_area.len(),
        ];
        if let Some(axis) = &self.poly_width {
            lens.push(axis.len());
        }
        lens
    }

    /// Materializes the set addressed by a cursor vector.
    pub(crate) fn set_at(&self, cursors: &[usize]) -> ParameterSet {
        let poly_area = self.poly_area.value(cursors[4]);
        let poly_width = match &self.poly_width {
            Some(axis) => axis.value(cursors[5]),
            None => derived_poly_width(poly_area),
        };
        ParameterSet {
            scale: self.scale.value(cursors[0]),
            levels: self.levels.value(cursors[1]),
            smoothing: self.smoothing.value(cursors[2]),
            iterations: self.iterations.value(cursors[3]),
            poly_area,
            poly_width,
        }
    }
}

impl Default for ParameterSpace {
    /// The domains the original radar trainer swept.
    fn default() -> Self {
        let scale = (1..=9).map(|i| i as f32 / 10.0).collect();
        Self::new(
            ParameterAxis::new(scale).expect("static axis is valid"),
            ParameterAxis::new((1..=10).collect()).expect("static axis is valid"),
            ParameterAxis::new((1..=10).map(|i| 2 * i).collect()).expect("static axis is valid"),
            ParameterAxis::new((1..=10).collect()).expect("static axis is valid"),
            ParameterAxis::new((1..=10).collect()).expect("static axis is valid"),
        )
        .expect("static axes are valid")
    }
}

fn derived_poly_width(poly_area: usize) -> f32 {
    1.2 * poly_area as f32 + 0.1
}
