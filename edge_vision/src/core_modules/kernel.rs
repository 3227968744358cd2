// THEORY:
// The Laplacian kernel approximates the discrete second derivative: flat regions sum
// to zero and intensity discontinuities light up. Applying it at one coordinate is a
// pure function of the read-only source buffer, so any number of workers may call it
// concurrently on the same `&PixelBuffer`.
//
// The grid is toroidal. A tap that falls off one edge samples the opposite edge, so
// every coordinate has nine neighbours and there is no border case.

use crate::core_modules::pixel::pixel::{Channel, MAX_CHANNEL_VALUE, Pixel, PixelBuffer};

pub const KERNEL_SIZE: usize = 3;

/// Signed per-channel sum over the nine taps.
pub type Accumulator = i32;

/// Rows are `dy = -1, 0, +1`, columns are `dx = -1, 0, +1`.
pub const LAPLACIAN: [[Accumulator; KERNEL_SIZE]; KERNEL_SIZE] = [
    [-1, -1, -1],
    [-1, 8, -1],
    [-1, -1, -1],
];

/// Clamps an accumulated channel sum into `[0, 255]`.
#[inline]
pub fn truncate_channel(value: Accumulator) -> Channel {
    value.clamp(0, MAX_CHANNEL_VALUE as Accumulator) as Channel
}

/// Wrapped coordinate of tap `tap` (0..KERNEL_SIZE) around `center` on an axis of
/// length `extent`.
#[inline]
fn wrap(center: u32, tap: usize, extent: u32) -> u32 {
    let extent = extent as usize;
    ((center as usize + extent + tap - KERNEL_SIZE / 2) % extent) as u32
}

/// Convolves the source with `LAPLACIAN` at `(x, y)`.
pub fn apply(source: &PixelBuffer, x: u32, y: u32) -> Pixel {
    let (width, height) = source.dimensions();
    let mut red: Accumulator = 0;
    let mut green: Accumulator = 0;
    let mut blue: Accumulator = 0;

    for (row, weights) in LAPLACIAN.iter().enumerate() {
        let sample_y = wrap(y, row, height);
        for (column, &weight) in weights.iter().enumerate() {
            let sample_x = wrap(x, column, width);
            let neighbor = source.get(sample_x, sample_y);
            red += neighbor.red as Accumulator * weight;
            green += neighbor.green as Accumulator * weight;
            blue += neighbor.blue as Accumulator * weight;
        }
    }

    Pixel::new(
        truncate_channel(red),
        truncate_channel(green),
        truncate_channel(blue),
    )
}

/// `apply` addressed by flat row-major index.
pub fn apply_at_index(source: &PixelBuffer, index: usize) -> Pixel {
    let width = source.width() as usize;
    apply(source, (index % width) as u32, (index / width) as u32)
}
