//! Apply compiled lookup tables to B,G,R,A pixel buffers.

use tracing::debug;

use crate::error::{Result, ToneError};
use crate::image::{PixelBuffer, PixelData, Sample};
use crate::transform::lut::LutSet;
use crate::transform::progress::{Completion, ProgressContext, ProgressTicker, Unobserved};

/// Sample offset inside a B,G,R,A pixel for LUT tables 0..4 (R, G, B, A).
const SAMPLE_FOR_TABLE: [usize; 4] = [2, 1, 0, 3];

/// Remap `image` in place. Channels without a compiled table pass through.
pub fn remap_in_place(image: &mut PixelBuffer, luts: &LutSet) -> Result<()> {
    remap_in_place_with(image, luts, &Unobserved).map(|_| ())
}

/// Remap `image` in place, reporting progress per row and stopping early
/// when `ctx` stops running. Rows processed before cancellation stay
/// remapped.
pub fn remap_in_place_with(
    image: &mut PixelBuffer,
    luts: &LutSet,
    ctx: &(impl ProgressContext + ?Sized),
) -> Result<Completion> {
    check_depth(image, luts)?;
    let row_len = image.width() as usize * 4;
    if row_len == 0 || image.height() == 0 {
        return Ok(Completion::Finished);
    }

    let completion = match image.data_mut() {
        PixelData::U8(samples) => map_rows(samples, row_len, luts.tables(), ctx),
        PixelData::U16(samples) => map_rows(samples, row_len, luts.tables(), ctx),
    };
    debug!(?completion, tables = luts.channel_count(), "remap");
    Ok(completion)
}

/// Remap `src` into `dst`, which must have the same size and depth.
pub fn remap_into(
    src: &PixelBuffer,
    dst: &mut PixelBuffer,
    luts: &LutSet,
    ctx: &(impl ProgressContext + ?Sized),
) -> Result<Completion> {
    if src.width() != dst.width() || src.height() != dst.height() {
        return Err(ToneError::InvalidBuffer("destination size differs from source"));
    }
    if src.depth() != dst.depth() {
        return Err(ToneError::DepthMismatch {
            expected: src.depth().bytes_per_sample(),
            found: dst.depth().bytes_per_sample(),
        });
    }
    dst.data_mut().clone_from(src.data());
    remap_in_place_with(dst, luts, ctx)
}

/// Remap into a freshly allocated copy of `src`.
pub fn remapped(src: &PixelBuffer, luts: &LutSet) -> Result<PixelBuffer> {
    let mut dst = src.clone();
    remap_in_place(&mut dst, luts)?;
    Ok(dst)
}

fn check_depth(image: &PixelBuffer, luts: &LutSet) -> Result<()> {
    if image.depth() != luts.depth() {
        return Err(ToneError::DepthMismatch {
            expected: image.depth().bytes_per_sample(),
            found: luts.depth().bytes_per_sample(),
        });
    }
    Ok(())
}

fn map_rows<T: Sample>(
    samples: &mut [T],
    row_len: usize,
    tables: &[Vec<u16>],
    ctx: &(impl ProgressContext + ?Sized),
) -> Completion {
    let mut ticker = ProgressTicker::new(samples.len() / row_len);
    for (row, line) in samples.chunks_mut(row_len).enumerate() {
        if !ctx.is_running() {
            return Completion::Cancelled;
        }
        for px in line.chunks_exact_mut(4) {
            for (table, &offset) in tables.iter().zip(&SAMPLE_FOR_TABLE) {
                px[offset] = T::from_lut(table[px[offset].bin()]);
            }
        }
        ticker.tick(row + 1, ctx);
    }
    Completion::Finished
}
