//! Scalar `f32` filtering helpers shared by the flow estimator and the
//! SSIM scorer.
//!
//! All filters operate on row-major buffers with explicit geometry and use
//! edge replication at the borders.

/// Normalized 1-D Gaussian kernel over `[-radius, radius]`.
pub(crate) fn gaussian_kernel(sigma: f32, radius: usize) -> Vec<f32> {
    let sigma = sigma.max(1e-3);
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let d = i as f32 - radius as f32;
            (-d * d / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Separable convolution with the same 1-D kernel along both axes.
pub(crate) fn convolve_separable(
    src: &[f32],
    width: usize,
    height: usize,
    kernel: &[f32],
) -> Vec<f32> {
    let tmp = convolve_rows(src, width, height, kernel);
    convolve_cols(&tmp, width, height, kernel)
}

pub(crate) fn convolve_rows(src: &[f32], width: usize, height: usize, kernel: &[f32]) -> Vec<f32> {
    let radius = kernel.len() / 2;
    let mut out = vec![0.0f32; src.len()];
    for y in 0..height {
        let row = &src[y * width..(y + 1) * width];
        let out_row = &mut out[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sx = clamp_index(x as isize + k as isize - radius as isize, width);
                acc += w * row[sx];
            }
            out_row[x] = acc;
        }
    }
    out
}

pub(crate) fn convolve_cols(src: &[f32], width: usize, height: usize, kernel: &[f32]) -> Vec<f32> {
    let radius = kernel.len() / 2;
    let mut out = vec![0.0f32; src.len()];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = clamp_index(y as isize + k as isize - radius as isize, height);
                acc += w * src[sy * width + x];
            }
            out[y * width + x] = acc;
        }
    }
    out
}

/// Mean filter over a `(2*radius + 1)` square window, separable passes.
pub(crate) fn box_blur(src: &[f32], width: usize, height: usize, radius: usize) -> Vec<f32> {
    if radius == 0 {
        return src.to_vec();
    }
    let kernel = vec![1.0 / (2 * radius + 1) as f32; 2 * radius + 1];
    convolve_separable(src, width, height, &kernel)
}

/// Bilinear resize of a row-major buffer to a new geometry.
pub(crate) fn resize_bilinear(
    src: &[f32],
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
) -> Vec<f32> {
    let mut out = vec![0.0f32; dst_width * dst_height];
    let sx = src_width as f32 / dst_width as f32;
    let sy = src_height as f32 / dst_height as f32;
    for y in 0..dst_height {
        let fy = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, src_height as f32 - 1.0);
        let y0 = fy.floor() as usize;
        let y1 = (y0 + 1).min(src_height - 1);
        let wy = fy - y0 as f32;
        for x in 0..dst_width {
            let fx = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, src_width as f32 - 1.0);
            let x0 = fx.floor() as usize;
            let x1 = (x0 + 1).min(src_width - 1);
            let wx = fx - x0 as f32;

            let top = src[y0 * src_width + x0] * (1.0 - wx) + src[y0 * src_width + x1] * wx;
            let bot = src[y1 * src_width + x0] * (1.0 - wx) + src[y1 * src_width + x1] * wx;
            out[y * dst_width + x] = top * (1.0 - wy) + bot * wy;
        }
    }
    out
}

fn clamp_index(idx: isize, len: usize) -> usize {
    idx.clamp(0, len as isize - 1) as usize
}
