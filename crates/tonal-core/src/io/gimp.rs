//! GIMP curves text files: a header line, then 17 `x y` pairs per channel
//! for all five channels. Coordinates are in 8-bit units; `-1 -1` marks a
//! disabled point.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::warn;

use crate::channel::Channel;
use crate::curves::{ControlPoint, CurveModel, CurveType, NUM_POINTS};
use crate::error::{Result, ToneError};
use crate::image::DEPTH_MULTIPLIER;

pub const CURVES_HEADER: &str = "# GIMP Curves File";

/// Number of evenly spaced samples a free curve is reduced to.
const FREE_SAMPLES: usize = 9;

impl CurveModel {
    /// Write all channels. Free channels are written as smooth points
    /// sampled from their table.
    pub fn write_gimp_curves(&self, mut out: impl Write) -> Result<()> {
        let unscale = |v: i32| {
            if self.is_sixteen_bit() && v != -1 { v / DEPTH_MULTIPLIER } else { v }
        };

        writeln!(out, "{CURVES_HEADER}")?;
        for channel in Channel::ALL {
            let points = match self.curve_type(channel) {
                CurveType::Smooth => self.points(channel),
                CurveType::Free => self.sampled_points(channel),
            };
            for p in points {
                writeln!(out, "{} {} ", unscale(p.x), unscale(p.y))?;
            }
        }
        Ok(())
    }

    /// Control points standing in for a free curve: nine samples at even
    /// slots, odd slots disabled.
    fn sampled_points(&self, channel: Channel) -> [ControlPoint; NUM_POINTS] {
        let max = self.segment_max();
        let segments = self.depth().segments() as i32;
        let curve = self.curve(channel);
        let mut points = [ControlPoint::DISABLED; NUM_POINTS];
        for j in 0..FREE_SAMPLES {
            let x = (j as i32 * segments / (FREE_SAMPLES as i32 - 1)).min(max);
            points[j * 2] = ControlPoint::new(x, curve[x as usize] as i32);
        }
        points
    }

    /// Read a curves file into every channel as smooth curves.
    ///
    /// All 85 pairs are parsed and range-checked first; the model is only
    /// reset and rewritten once the whole file is valid.
    pub fn read_gimp_curves(&mut self, input: impl BufRead) -> Result<()> {
        let mut lines = input.lines();
        let header = lines.next().transpose()?.unwrap_or_default();
        if header.trim_end() != CURVES_HEADER {
            warn!(header = %header, "not a GIMP curves file");
            return Err(ToneError::BadHeader(header));
        }

        let mut tokens = Vec::with_capacity(Channel::COUNT * NUM_POINTS * 2);
        for (i, line) in lines.enumerate() {
            let line = line?;
            for token in line.split_whitespace() {
                tokens.push((i + 2, token.to_owned()));
            }
        }

        let max = self.segment_max();
        let sixteen_bit = self.is_sixteen_bit();
        let scale = |(line, v): (usize, i32)| {
            if !sixteen_bit || v == -1 {
                return Ok(v);
            }
            v.checked_mul(DEPTH_MULTIPLIER).ok_or_else(|| ToneError::Parse {
                line,
                reason: format!("{v} overflows at 16 bits"),
            })
        };

        let end_line = tokens.last().map_or(1, |(line, _)| *line);
        let mut parsed = [[ControlPoint::DISABLED; NUM_POINTS]; Channel::COUNT];
        let mut it = tokens.iter();
        for channel in &mut parsed {
            for point in channel.iter_mut() {
                let x_token = next_int(&mut it, end_line)?;
                let y_token = next_int(&mut it, end_line)?;
                let line = x_token.0;
                let (x, y) = (scale(x_token)?, scale(y_token)?);
                if x == -1 {
                    continue;
                }
                if !(0..=max).contains(&x) || !(0..=max).contains(&y) {
                    return Err(ToneError::Parse {
                        line,
                        reason: format!("point ({x}, {y}) outside 0..={max}"),
                    });
                }
                *point = ControlPoint::new(x, y);
            }
        }

        self.reset_all();
        for (channel, points) in Channel::ALL.into_iter().zip(parsed) {
            self.set_curve_type(channel, CurveType::Smooth);
            self.set_points(channel, &points);
        }
        self.recalculate_all();
        Ok(())
    }

    pub fn save_gimp_curves_file(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_gimp_curves(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn load_gimp_curves_file(&mut self, path: &Path) -> Result<()> {
        self.read_gimp_curves(BufReader::new(File::open(path)?))
    }
}

fn next_int<'a>(
    it: &mut impl Iterator<Item = &'a (usize, String)>,
    end_line: usize,
) -> Result<(usize, i32)> {
    let (line, token) = it.next().ok_or_else(|| ToneError::Parse {
        line: end_line,
        reason: "file ends before all points were read".into(),
    })?;
    token
        .parse::<i32>()
        .map(|v| (*line, v))
        .map_err(|e| ToneError::Parse {
            line: *line,
            reason: format!("{token:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::BitDepth;

    fn written(model: &CurveModel) -> String {
        let mut out = Vec::new();
        model.write_gimp_curves(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_layout() {
        let text = written(&CurveModel::new(BitDepth::U8));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + Channel::COUNT * NUM_POINTS);
        assert_eq!(lines[0], "# GIMP Curves File");
        assert_eq!(lines[1], "0 0 ");
        assert_eq!(lines[2], "-1 -1 ");
        assert_eq!(lines[17], "255 255 ");
    }

    #[test]
    fn test_smooth_roundtrip_both_depths() {
        for depth in [BitDepth::U8, BitDepth::U16] {
            let k = if depth.is_sixteen_bit() { DEPTH_MULTIPLIER } else { 1 };
            let mut model = CurveModel::new(depth);
            model.set_point(Channel::Red, 8, ControlPoint::new(100 * k, 160 * k));
            model.set_point(Channel::Luminosity, 0, ControlPoint::new(0, 30 * k));
            model.recalculate_all();

            let mut loaded = CurveModel::new(depth);
            loaded.set_curve_type(Channel::Blue, CurveType::Free);
            loaded.read_gimp_curves(written(&model).as_bytes()).unwrap();
            for channel in Channel::ALL {
                assert_eq!(loaded.curve_type(channel), CurveType::Smooth);
                assert_eq!(loaded.points(channel), model.points(channel), "{depth} {channel}");
                assert_eq!(loaded.curve(channel), model.curve(channel), "{depth} {channel}");
            }
        }
    }

    #[test]
    fn test_free_channel_written_as_samples() {
        let mut model = CurveModel::new(BitDepth::U8);
        let inverted: Vec<u16> = (0..=255u16).rev().collect();
        model.set_values(Channel::Green, &inverted);

        let text = written(&model);
        let green: Vec<&str> = text.lines().skip(1 + 2 * NUM_POINTS).take(NUM_POINTS).collect();
        assert_eq!(green[0], "0 255 ");
        assert_eq!(green[1], "-1 -1 ");
        assert_eq!(green[2], "32 223 ");
        assert_eq!(green[16], "255 0 ");
        assert_eq!(model.curve_type(Channel::Green), CurveType::Free);
    }

    #[test]
    fn test_invalid_files_leave_model_untouched() {
        let mut model = CurveModel::new(BitDepth::U8);
        model.set_point(Channel::Red, 8, ControlPoint::new(128, 200));
        let before = model.clone();

        assert!(matches!(
            model.read_gimp_curves("# GIMP Levels File\n".as_bytes()),
            Err(ToneError::BadHeader(_))
        ));

        let short = "# GIMP Curves File\n0 0 \n255 255 \n";
        assert!(matches!(model.read_gimp_curves(short.as_bytes()), Err(ToneError::Parse { .. })));

        let mut bad = written(&CurveModel::new(BitDepth::U8));
        bad = bad.replacen("255 255", "300 255", 1);
        assert!(matches!(
            model.read_gimp_curves(bad.as_bytes()),
            Err(ToneError::Parse { line: 18, .. })
        ));

        assert_eq!(model, before);
    }

    #[test]
    fn test_overflowing_sixteen_bit_point_is_a_parse_error() {
        let mut model = CurveModel::new(BitDepth::U16);
        model.set_point(Channel::Red, 8, ControlPoint::new(128 * 257, 200 * 257));
        let before = model.clone();

        let bad = written(&CurveModel::new(BitDepth::U8)).replacen("0 0 ", "99999999 0 ", 1);
        assert!(matches!(
            model.read_gimp_curves(bad.as_bytes()),
            Err(ToneError::Parse { line: 2, .. })
        ));
        assert_eq!(model, before);
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("tonal-curves-{}.curves", std::process::id()));
        let mut model = CurveModel::new(BitDepth::U8);
        model.set_point(Channel::Alpha, 4, ControlPoint::new(60, 20));
        model.recalculate(Channel::Alpha);
        model.save_gimp_curves_file(&path).unwrap();

        let mut loaded = CurveModel::new(BitDepth::U8);
        loaded.load_gimp_curves_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.curve(Channel::Alpha), model.curve(Channel::Alpha));
    }
}
