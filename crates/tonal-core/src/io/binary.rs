//! Compact binary encoding of one curve channel, used by the undo log.
//!
//! Layout (big-endian):
//!
//! | field    | type | value                                  |
//! |----------|------|----------------------------------------|
//! | version  | u16  | 1                                      |
//! | type     | u8   | 0 linear, 1 smooth, 2 free             |
//! | depth    | u8   | bytes per sample, 1 or 2               |
//! | reserved | u32  | 0                                      |
//! | count    | u32  | points (type 1) or segments (type 2)   |
//!
//! Smooth curves follow with `count` pairs of i32 `(x, y)` for their enabled
//! points. Free curves follow with `segment_max` samples of `depth` bytes;
//! the last table entry is not stored.

use std::io::{self, Cursor};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tracing::warn;

use crate::channel::Channel;
use crate::curves::{ControlPoint, CurveModel, CurveType, NUM_POINTS};
use crate::error::{Result, ToneError};

pub const BLOB_VERSION: u16 = 1;

const TYPE_LINEAR: u8 = 0;
const TYPE_SMOOTH: u8 = 1;
const TYPE_FREE: u8 = 2;

/// Decoded blob body, held until the whole blob has been validated.
enum Body {
    Linear,
    Smooth(Vec<ControlPoint>),
    Free(Vec<u16>),
}

impl CurveModel {
    /// Encode one channel.
    pub fn channel_to_binary(&self, channel: Channel) -> Vec<u8> {
        let mut out = Vec::new();
        // Writes into a Vec cannot fail.
        let _ = self.write_channel(channel, &mut out);
        out
    }

    fn write_channel(&self, channel: Channel, out: &mut Vec<u8>) -> io::Result<()> {
        let kind = if self.is_linear(channel) {
            TYPE_LINEAR
        } else {
            match self.curve_type(channel) {
                CurveType::Smooth => TYPE_SMOOTH,
                CurveType::Free => TYPE_FREE,
            }
        };

        out.write_u16::<BigEndian>(BLOB_VERSION)?;
        out.write_u8(kind)?;
        out.write_u8(self.depth().bytes_per_sample())?;
        out.write_u32::<BigEndian>(0)?;

        match kind {
            TYPE_SMOOTH => {
                let points: Vec<ControlPoint> = self
                    .points(channel)
                    .into_iter()
                    .filter(|p| p.is_enabled())
                    .collect();
                out.write_u32::<BigEndian>(points.len() as u32)?;
                for p in points {
                    out.write_i32::<BigEndian>(p.x)?;
                    out.write_i32::<BigEndian>(p.y)?;
                }
            }
            TYPE_FREE => {
                let max = self.segment_max() as usize;
                out.write_u32::<BigEndian>(max as u32)?;
                let stored = &self.curve(channel)[..max];
                if self.is_sixteen_bit() {
                    for &v in stored {
                        out.write_u16::<BigEndian>(v)?;
                    }
                } else {
                    for &v in stored {
                        out.write_u8(v as u8)?;
                    }
                }
            }
            _ => out.write_u32::<BigEndian>(0)?,
        }
        Ok(())
    }

    /// Decode a blob into one channel.
    ///
    /// The blob is validated completely before the channel changes. An
    /// empty blob resets the channel.
    pub fn set_channel_from_binary(&mut self, channel: Channel, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            self.reset(channel);
            return Ok(());
        }

        let body = self.parse_blob(data).inspect_err(|e| {
            warn!(%channel, "curve blob rejected: {e}");
        })?;

        match body {
            Body::Linear => self.reset(channel),
            Body::Smooth(points) => {
                self.set_curve_type(channel, CurveType::Smooth);
                self.set_points(channel, &points);
                self.recalculate(channel);
            }
            Body::Free(samples) => {
                // The last entry is not part of the blob and keeps its value.
                let mut table = self.curve(channel).to_vec();
                table[..samples.len()].copy_from_slice(&samples);
                self.set_values(channel, &table);
            }
        }
        Ok(())
    }

    fn parse_blob(&self, data: &[u8]) -> Result<Body> {
        let mut r = Cursor::new(data);
        let version = r.read_u16::<BigEndian>().map_err(truncated)?;
        if version != BLOB_VERSION {
            return Err(ToneError::UnsupportedVersion(version));
        }
        let kind = r.read_u8().map_err(truncated)?;
        if kind > TYPE_FREE {
            return Err(ToneError::UnknownCurveType(kind));
        }
        let depth = r.read_u8().map_err(truncated)?;
        let expected = self.depth().bytes_per_sample();
        if depth != expected {
            return Err(ToneError::DepthMismatch { expected, found: depth });
        }
        let _reserved = r.read_u32::<BigEndian>().map_err(truncated)?;
        let count = r.read_u32::<BigEndian>().map_err(truncated)?;

        match kind {
            TYPE_LINEAR => Ok(Body::Linear),
            TYPE_SMOOTH => {
                let used = (count as usize).min(NUM_POINTS);
                let mut points = Vec::with_capacity(used);
                for _ in 0..used {
                    let x = r.read_i32::<BigEndian>().map_err(truncated)?;
                    let y = r.read_i32::<BigEndian>().map_err(truncated)?;
                    points.push(ControlPoint::new(x, y));
                }
                Ok(Body::Smooth(points))
            }
            _ => {
                let max = self.segment_max() as u32;
                if count != max {
                    return Err(ToneError::SegmentCountMismatch { expected: max, found: count });
                }
                let mut samples = vec![0u16; max as usize];
                if self.is_sixteen_bit() {
                    r.read_u16_into::<BigEndian>(&mut samples).map_err(truncated)?;
                } else {
                    for v in &mut samples {
                        *v = r.read_u8().map_err(truncated)? as u16;
                    }
                }
                Ok(Body::Free(samples))
            }
        }
    }
}

fn truncated(_: io::Error) -> ToneError {
    ToneError::Truncated
}
