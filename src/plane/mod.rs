//! Owned single-channel planes and multi-channel raster images.
//!
//! A `Plane` is a contiguous 8-bit buffer with explicit geometry. A
//! `RasterImage` is an ordered stack of co-registered planes: three colour
//! planes for source imagery, plus an optional validity plane appended by the
//! pipeline. Splitting and merging never reorder channels.

use crate::util::{RaincastError, RaincastResult};

pub(crate) mod filter;

/// Owned contiguous single-channel 8-bit image plane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plane {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl Plane {
    /// Creates a plane from an exactly-sized buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> RaincastResult<Self> {
        let needed = checked_area(width, height)?;
        if data.len() != needed {
            return Err(RaincastError::BufferMismatch {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates a plane filled with a constant value.
    pub fn filled(width: usize, height: usize, value: u8) -> RaincastResult<Self> {
        let needed = checked_area(width, height)?;
        Ok(Self {
            data: vec![value; needed],
            width,
            height,
        })
    }

    /// Returns the plane width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the plane height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the backing buffer in row-major order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the pixel at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Returns true when both planes share the same geometry.
    pub fn same_geometry(&self, other: &Plane) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub(crate) fn to_f32(&self) -> Vec<f32> {
        self.data.iter().map(|&v| f32::from(v)).collect()
    }

    pub(crate) fn geometry_check(&self, other: &Plane) -> RaincastResult<()> {
        if self.same_geometry(other) {
            return Ok(());
        }
        Err(RaincastError::GeometryMismatch {
            expected_width: self.width,
            expected_height: self.height,
            got_width: other.width,
            got_height: other.height,
        })
    }
}

/// Multi-channel image as an ordered stack of co-registered planes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    channels: Vec<Plane>,
}

impl RasterImage {
    /// Builds an image from planes that must all share one geometry.
    pub fn from_planes(channels: Vec<Plane>) -> RaincastResult<Self> {
        let first = channels
            .first()
            .ok_or(RaincastError::ChannelCount { got: 0 })?;
        for plane in &channels[1..] {
            first.geometry_check(plane)?;
        }
        Ok(Self { channels })
    }

    /// Builds a 4-channel image from an interleaved RGBA buffer.
    pub fn from_interleaved_rgba(data: &[u8], width: usize, height: usize) -> RaincastResult<Self> {
        let area = checked_area(width, height)?;
        let needed = area
            .checked_mul(4)
            .ok_or(RaincastError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(RaincastError::BufferMismatch {
                needed,
                got: data.len(),
            });
        }
        let mut planes: Vec<Vec<u8>> = (0..4).map(|_| Vec::with_capacity(area)).collect();
        for px in data.chunks_exact(4) {
            for (plane, &value) in planes.iter_mut().zip(px) {
                plane.push(value);
            }
        }
        let channels = planes
            .into_iter()
            .map(|data| Plane::new(data, width, height))
            .collect::<RaincastResult<Vec<_>>>()?;
        Self::from_planes(channels)
    }

    /// Serializes the image to an interleaved RGBA buffer.
    ///
    /// A missing fourth plane is rendered as fully opaque.
    pub fn to_interleaved_rgba(&self) -> RaincastResult<Vec<u8>> {
        let [r, g, b] = self.color_planes()?;
        let alpha = self.channels.get(3);
        let area = r.data.len();
        let mut out = Vec::with_capacity(area * 4);
        for idx in 0..area {
            out.push(r.data[idx]);
            out.push(g.data[idx]);
            out.push(b.data[idx]);
            out.push(alpha.map_or(u8::MAX, |a| a.data[idx]));
        }
        Ok(out)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.channels[0].width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.channels[0].height
    }

    /// Returns the number of planes, validity plane included.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Returns a single plane by channel index.
    pub fn channel(&self, index: usize) -> Option<&Plane> {
        self.channels.get(index)
    }

    /// Returns the three colour planes in channel order.
    ///
    /// A fourth (alpha/validity) plane is ignored; fewer than three channels
    /// is an error.
    pub fn color_planes(&self) -> RaincastResult<[&Plane; 3]> {
        if self.channels.len() < 3 {
            return Err(RaincastError::ChannelCount {
                got: self.channels.len(),
            });
        }
        Ok([&self.channels[0], &self.channels[1], &self.channels[2]])
    }

    /// Returns true when both images share the same geometry.
    pub fn same_geometry(&self, other: &RasterImage) -> bool {
        self.channels[0].same_geometry(&other.channels[0])
    }
}

/// BT.601 luminance of an RGB pixel.
pub(crate) fn luminance(r: u8, g: u8, b: u8) -> f32 {
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

fn checked_area(width: usize, height: usize) -> RaincastResult<usize> {
    if width == 0 || height == 0 {
        return Err(RaincastError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(RaincastError::InvalidDimensions { width, height })
}
