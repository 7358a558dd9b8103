//! GIMP levels text files.
//!
//! ```text
//! # GIMP Levels File
//! low_in high_in low_out high_out gamma     (one line per channel, 5 lines)
//! ```
//!
//! Values are written in 8-bit units: a 16-bit model divides by 255 on
//! write and multiplies by 255 on read.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::warn;

use crate::channel::Channel;
use crate::error::{Result, ToneError};
use crate::image::DEPTH_MULTIPLIER;
use crate::levels::model::{LevelsChannel, LevelsModel};

pub const LEVELS_HEADER: &str = "# GIMP Levels File";

impl LevelsModel {
    pub fn write_gimp_levels(&self, mut out: impl Write) -> Result<()> {
        let scale = if self.is_sixteen_bit() { DEPTH_MULTIPLIER } else { 1 };
        writeln!(out, "{LEVELS_HEADER}")?;
        for channel in Channel::ALL {
            let c = self.channel(channel);
            writeln!(
                out,
                "{} {} {} {} {:.6}",
                c.low_input / scale,
                c.high_input / scale,
                c.low_output / scale,
                c.high_output / scale,
                c.gamma
            )?;
        }
        Ok(())
    }

    /// Read a levels file. Nothing is applied unless all five channel lines
    /// parse; values then go through the range-checked setters.
    pub fn read_gimp_levels(&mut self, input: impl BufRead) -> Result<()> {
        let mut lines = input.lines();
        let header = lines.next().transpose()?.unwrap_or_default();
        if header.trim_end() != LEVELS_HEADER {
            warn!(header = %header, "not a GIMP levels file");
            return Err(ToneError::BadHeader(header));
        }

        let scale = if self.is_sixteen_bit() { DEPTH_MULTIPLIER } else { 1 };
        let mut parsed = [LevelsChannel::identity(self.depth()); Channel::COUNT];
        for (i, slot) in parsed.iter_mut().enumerate() {
            let line_no = i + 2;
            let line = lines.next().transpose()?.ok_or_else(|| ToneError::Parse {
                line: line_no,
                reason: "missing channel line".into(),
            })?;
            *slot = parse_channel(&line, line_no, scale)?;
        }

        for (channel, levels) in Channel::ALL.into_iter().zip(parsed) {
            self.set_low_input(channel, levels.low_input);
            self.set_high_input(channel, levels.high_input);
            self.set_low_output(channel, levels.low_output);
            self.set_high_output(channel, levels.high_output);
            self.set_gamma(channel, levels.gamma);
        }
        Ok(())
    }

    pub fn save_gimp_levels_file(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_gimp_levels(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn load_gimp_levels_file(&mut self, path: &Path) -> Result<()> {
        self.read_gimp_levels(BufReader::new(File::open(path)?))
    }
}

/// Parse one channel line, scaling the integer fields to model units.
fn parse_channel(line: &str, line_no: usize, scale: i32) -> Result<LevelsChannel> {
    let parse_err = |reason: String| ToneError::Parse { line: line_no, reason };
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(parse_err(format!("expected 5 fields, found {}", fields.len())));
    }
    let int = |s: &str| {
        let v = s
            .parse::<i32>()
            .map_err(|e| parse_err(format!("{s:?}: {e}")))?;
        v.checked_mul(scale)
            .ok_or_else(|| parse_err(format!("{s:?} overflows at 16 bits")))
    };
    let gamma = fields[4]
        .parse::<f64>()
        .map_err(|e| parse_err(format!("{:?}: {e}", fields[4])))?;
    Ok(LevelsChannel {
        low_input: int(fields[0])?,
        high_input: int(fields[1])?,
        low_output: int(fields[2])?,
        high_output: int(fields[3])?,
        gamma,
    })
}
