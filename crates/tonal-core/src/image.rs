//! Pixel buffers for the tone engine.
//!
//! Samples are interleaved in B,G,R,A order, stored either as bytes (8-bit)
//! or as native-endian words (16-bit). The depth travels with the data as a
//! tag, so every per-pixel loop branches once at the top.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ToneError};

/// Multiplier between 8-bit and 16-bit coordinates.
///
/// This maps 255 to 65025, not 65535. Depth conversion of curves and the
/// GIMP text formats all scale by exactly this value.
pub const DEPTH_MULTIPLIER: i32 = 255;

/// Supported sample depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitDepth {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
}

impl BitDepth {
    /// Largest valid sample value (255 or 65535).
    pub const fn segment_max(self) -> i32 {
        match self {
            Self::U8 => 255,
            Self::U16 => 65535,
        }
    }

    /// Number of distinct sample values, i.e. the length of every curve,
    /// histogram channel and LUT at this depth.
    pub const fn segments(self) -> usize {
        self.segment_max() as usize + 1
    }

    pub const fn bytes_per_sample(self) -> u8 {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
        }
    }

    pub const fn bits(self) -> u8 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
        }
    }

    pub const fn is_sixteen_bit(self) -> bool {
        matches!(self, Self::U16)
    }

    pub const fn from_sixteen_bit(sixteen_bit: bool) -> Self {
        if sixteen_bit { Self::U16 } else { Self::U8 }
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            8 => Some(Self::U8),
            16 => Some(Self::U16),
            _ => None,
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U8 => write!(f, "8-bit"),
            Self::U16 => write!(f, "16-bit"),
        }
    }
}

/// A single color sample, widened to 16 bits regardless of source depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub alpha: u16,
}

impl Color {
    pub const fn new(red: u16, green: u16, blue: u16, alpha: u16) -> Self {
        Self { red, green, blue, alpha }
    }

    /// Gray sample with an opaque alpha for the given depth.
    pub const fn gray(value: u16, depth: BitDepth) -> Self {
        Self::new(value, value, value, depth.segment_max() as u16)
    }
}

/// Storage type of one interleaved sample.
pub(crate) trait Sample: Copy {
    fn bin(self) -> usize;
    fn from_lut(value: u16) -> Self;
    fn widen(self) -> u16;
}

impl Sample for u8 {
    #[inline]
    fn bin(self) -> usize {
        self as usize
    }

    // LUT entries for 8-bit images never exceed 255.
    #[inline]
    fn from_lut(value: u16) -> Self {
        value as u8
    }

    #[inline]
    fn widen(self) -> u16 {
        self as u16
    }
}

impl Sample for u16 {
    #[inline]
    fn bin(self) -> usize {
        self as usize
    }

    #[inline]
    fn from_lut(value: u16) -> Self {
        value
    }

    #[inline]
    fn widen(self) -> u16 {
        self
    }
}

/// Interleaved B,G,R,A samples tagged with their depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl PixelData {
    pub fn depth(&self) -> BitDepth {
        match self {
            Self::U8(_) => BitDepth::U8,
            Self::U16(_) => BitDepth::U16,
        }
    }

    /// Number of samples (four per pixel).
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An image the engine reads histograms from and writes remapped pixels to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: PixelData,
}

fn sample_count(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(ToneError::InvalidBuffer("dimensions overflow"))
}

impl PixelBuffer {
    /// Zero-filled (transparent black) buffer.
    pub fn new(width: u32, height: u32, depth: BitDepth) -> Result<Self> {
        let len = sample_count(width, height)?;
        let data = match depth {
            BitDepth::U8 => PixelData::U8(vec![0; len]),
            BitDepth::U16 => PixelData::U16(vec![0; len]),
        };
        Ok(Self { width, height, data })
    }

    /// Wrap 8-bit B,G,R,A samples.
    pub fn from_u8(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        if samples.len() != sample_count(width, height)? {
            return Err(ToneError::InvalidBuffer("sample count does not match dimensions"));
        }
        Ok(Self { width, height, data: PixelData::U8(samples) })
    }

    /// Wrap 16-bit B,G,R,A samples.
    pub fn from_u16(width: u32, height: u32, samples: Vec<u16>) -> Result<Self> {
        if samples.len() != sample_count(width, height)? {
            return Err(ToneError::InvalidBuffer("sample count does not match dimensions"));
        }
        Ok(Self { width, height, data: PixelData::U16(samples) })
    }

    /// Copy samples out of a raw byte buffer. 16-bit words are read in
    /// native byte order, matching how image loaders hand out their memory.
    pub fn from_raw_bytes(width: u32, height: u32, depth: BitDepth, bytes: &[u8]) -> Result<Self> {
        let expected = sample_count(width, height)?
            .checked_mul(depth.bytes_per_sample() as usize)
            .ok_or(ToneError::InvalidBuffer("dimensions overflow"))?;
        if bytes.len() != expected {
            return Err(ToneError::InvalidBuffer("byte length does not match dimensions"));
        }
        let data = match depth {
            BitDepth::U8 => PixelData::U8(bytes.to_vec()),
            BitDepth::U16 => PixelData::U16(bytemuck::pod_collect_to_vec(bytes)),
        };
        Ok(Self { width, height, data })
    }

    /// Convert an RGBA8 image into B,G,R,A storage.
    pub fn from_rgba8(image: &image::RgbaImage) -> Self {
        let mut samples = Vec::with_capacity(image.as_raw().len());
        for px in image.as_raw().chunks_exact(4) {
            samples.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
        Self {
            width: image.width(),
            height: image.height(),
            data: PixelData::U8(samples),
        }
    }

    /// Convert an RGBA16 image into B,G,R,A storage.
    pub fn from_rgba16(image: &image::ImageBuffer<image::Rgba<u16>, Vec<u16>>) -> Self {
        let mut samples = Vec::with_capacity(image.as_raw().len());
        for px in image.as_raw().chunks_exact(4) {
            samples.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
        Self {
            width: image.width(),
            height: image.height(),
            data: PixelData::U16(samples),
        }
    }

    /// Convert any decoded image. Sources with more than 8 bits per
    /// channel are kept at 16 bits, everything else becomes 8-bit.
    pub fn from_dynamic(image: &image::DynamicImage) -> Self {
        let color = image.color();
        let bytes_per_channel = color.bytes_per_pixel() / color.channel_count().max(1);
        if bytes_per_channel >= 2 {
            Self::from_rgba16(&image.to_rgba16())
        } else {
            Self::from_rgba8(&image.to_rgba8())
        }
    }

    /// Convert back to an RGBA image of the same depth.
    pub fn to_dynamic(&self) -> Result<image::DynamicImage> {
        match &self.data {
            PixelData::U8(samples) => {
                let mut rgba = Vec::with_capacity(samples.len());
                for px in samples.chunks_exact(4) {
                    rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
                image::RgbaImage::from_raw(self.width, self.height, rgba)
                    .map(image::DynamicImage::ImageRgba8)
                    .ok_or(ToneError::InvalidBuffer("sample count does not match dimensions"))
            }
            PixelData::U16(samples) => {
                let mut rgba = Vec::with_capacity(samples.len());
                for px in samples.chunks_exact(4) {
                    rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
                image::ImageBuffer::<image::Rgba<u16>, Vec<u16>>::from_raw(self.width, self.height, rgba)
                    .map(image::DynamicImage::ImageRgba16)
                    .ok_or(ToneError::InvalidBuffer("sample count does not match dimensions"))
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> BitDepth {
        self.data.depth()
    }

    pub fn is_sixteen_bit(&self) -> bool {
        self.depth().is_sixteen_bit()
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / 4
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    /// Mutable samples. Callers must keep the length and variant intact.
    pub(crate) fn data_mut(&mut self) -> &mut PixelData {
        &mut self.data
    }

    /// Raw sample memory. 16-bit samples are exposed in native byte order.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.data {
            PixelData::U8(samples) => samples,
            PixelData::U16(samples) => bytemuck::cast_slice(samples),
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }

    /// Read one pixel, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let i = self.offset(x, y)?;
        let px = match &self.data {
            PixelData::U8(s) => [s[i].widen(), s[i + 1].widen(), s[i + 2].widen(), s[i + 3].widen()],
            PixelData::U16(s) => [s[i], s[i + 1], s[i + 2], s[i + 3]],
        };
        Some(Color::new(px[2], px[1], px[0], px[3]))
    }

    /// Write one pixel. Returns `false` (and writes nothing) outside the
    /// image or when a component exceeds the buffer's depth.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> bool {
        let Some(i) = self.offset(x, y) else {
            return false;
        };
        let bgra = [color.blue, color.green, color.red, color.alpha];
        match &mut self.data {
            PixelData::U8(s) => {
                if bgra.iter().any(|&v| v > u8::MAX as u16) {
                    return false;
                }
                for (dst, v) in s[i..i + 4].iter_mut().zip(bgra) {
                    *dst = v as u8;
                }
            }
            PixelData::U16(s) => s[i..i + 4].copy_from_slice(&bgra),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_sizes() {
        assert_eq!(BitDepth::U8.segments(), 256);
        assert_eq!(BitDepth::U16.segments(), 65536);
        assert_eq!(BitDepth::from_bits(16), Some(BitDepth::U16));
        assert_eq!(BitDepth::from_bits(12), None);
    }

    #[test]
    fn test_from_u8_rejects_wrong_length() {
        assert!(PixelBuffer::from_u8(2, 2, vec![0; 15]).is_err());
        assert!(PixelBuffer::from_u8(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_pixel_is_bgra_ordered() {
        let buf = PixelBuffer::from_u8(1, 1, vec![10, 20, 30, 40]).unwrap();
        assert_eq!(buf.pixel(0, 0), Some(Color::new(30, 20, 10, 40)));
        assert_eq!(buf.pixel(1, 0), None);
    }

    #[test]
    fn test_raw_bytes_sixteen_bit() {
        let words: [u16; 4] = [1, 2, 3, 65535];
        let bytes: &[u8] = bytemuck::cast_slice(&words);
        let buf = PixelBuffer::from_raw_bytes(1, 1, BitDepth::U16, bytes).unwrap();
        assert_eq!(buf.pixel(0, 0), Some(Color::new(3, 2, 1, 65535)));
        assert_eq!(buf.as_bytes(), bytes);
    }

    #[test]
    fn test_set_pixel_rejects_out_of_depth() {
        let mut buf = PixelBuffer::new(1, 1, BitDepth::U8).unwrap();
        assert!(!buf.set_pixel(0, 0, Color::new(256, 0, 0, 0)));
        assert!(buf.set_pixel(0, 0, Color::new(255, 1, 2, 3)));
        assert_eq!(buf.pixel(0, 0), Some(Color::new(255, 1, 2, 3)));
    }

    #[test]
    fn test_rgba_roundtrip_through_image_crate() {
        let rgba = image::RgbaImage::from_raw(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let buf = PixelBuffer::from_rgba8(&rgba);
        assert_eq!(buf.pixel(1, 0), Some(Color::new(5, 6, 7, 8)));
        let back = buf.to_dynamic().unwrap();
        assert_eq!(back.to_rgba8().as_raw(), rgba.as_raw());
    }
}
