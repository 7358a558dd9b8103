//! Serializable snapshots of curve and levels settings.
//!
//! These are the values stored in JSON presets and in the undo log. A
//! snapshot carries its bit depth; applying it to a model of another depth
//! converts it.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::channel::Channel;
use crate::curves::{ControlPoint, CurveModel, CurveType};
use crate::error::Result;
use crate::image::{BitDepth, DEPTH_MULTIPLIER};
use crate::io::FilterAction;
use crate::levels::{LevelsChannel, LevelsModel};

pub const CURVES_ACTION: &str = "tonal:curves";
pub const LEVELS_ACTION: &str = "tonal:levels";
pub const ACTION_VERSION: u32 = 1;

const CURVE_BIT_DEPTH: &str = "curveBitDepth";
const LEVELS_SIXTEEN_BIT: &str = "levelsSixteenBit";

fn indexed(name: &str, channel: Channel) -> String {
    format!("{name}[{}]", channel.index())
}

// ── Curves ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveChannelParams {
    pub curve_type: CurveType,
    /// All control point slots, disabled ones included.
    pub points: Vec<ControlPoint>,
    /// Full table of a free curve; empty for smooth curves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvesParams {
    pub depth: BitDepth,
    pub channels: Vec<CurveChannelParams>,
}

impl CurvesParams {
    pub fn identity(depth: BitDepth) -> Self {
        CurveModel::new(depth).params()
    }

    pub fn is_identity(&self) -> bool {
        CurveModel::from_params(self).is_linear_all()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for CurvesParams {
    fn default() -> Self {
        Self::identity(BitDepth::U8)
    }
}

impl CurveModel {
    pub fn params(&self) -> CurvesParams {
        let channels = Channel::ALL
            .into_iter()
            .map(|channel| {
                let curve_type = self.curve_type(channel);
                CurveChannelParams {
                    curve_type,
                    points: self.points(channel).to_vec(),
                    values: match curve_type {
                        CurveType::Smooth => Vec::new(),
                        CurveType::Free => self.curve(channel).to_vec(),
                    },
                }
            })
            .collect();
        CurvesParams {
            depth: self.depth(),
            channels,
        }
    }

    pub fn from_params(params: &CurvesParams) -> Self {
        let mut model = CurveModel::new(params.depth);
        model.set_params(params);
        model
    }

    /// Replace every channel with `params`, converting depth if needed.
    /// Channels missing from `params` are reset.
    pub fn set_params(&mut self, params: &CurvesParams) {
        if params.depth != self.depth() {
            let source = CurveModel::from_params(params);
            self.fill_from(&source);
            return;
        }

        self.reset_all();
        for (channel, c) in Channel::ALL.into_iter().zip(&params.channels) {
            self.set_points(channel, &c.points);
            if c.curve_type == CurveType::Free {
                self.set_values(channel, &c.values);
            }
        }
        self.recalculate_all();
    }

    /// Record every channel as a binary blob in `action`.
    pub fn write_action(&self, action: &mut FilterAction) {
        action.set_int(CURVE_BIT_DEPTH, self.depth().bits() as i64);
        for channel in Channel::ALL {
            action.set_blob(indexed("curveData", channel), &self.channel_to_binary(channel));
        }
    }

    pub fn to_action(&self) -> FilterAction {
        let mut action = FilterAction::new(CURVES_ACTION, ACTION_VERSION);
        self.write_action(&mut action);
        action
    }

    /// Rebuild a model from an undo-log entry. Missing channels stay linear.
    pub fn from_action(action: &FilterAction) -> Result<Self> {
        let bits = action.int(CURVE_BIT_DEPTH)?.unwrap_or(8);
        let depth = u8::try_from(bits).ok().and_then(BitDepth::from_bits).unwrap_or_else(|| {
            warn!(bits, "unsupported curve bit depth, using 8-bit");
            BitDepth::U8
        });

        let mut model = CurveModel::new(depth);
        for channel in Channel::ALL {
            if let Some(blob) = action.blob(&indexed("curveData", channel))? {
                model.set_channel_from_binary(channel, &blob)?;
            }
        }
        Ok(model)
    }
}

// ── Levels ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelsParams {
    pub depth: BitDepth,
    pub channels: Vec<LevelsChannel>,
}

impl LevelsParams {
    pub fn identity(depth: BitDepth) -> Self {
        LevelsModel::new(depth).params()
    }

    pub fn is_identity(&self) -> bool {
        self.channels
            .iter()
            .all(|c| *c == LevelsChannel::identity(self.depth))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for LevelsParams {
    fn default() -> Self {
        Self::identity(BitDepth::U8)
    }
}

impl LevelsModel {
    pub fn params(&self) -> LevelsParams {
        LevelsParams {
            depth: self.depth(),
            channels: Channel::ALL.into_iter().map(|c| self.channel(c)).collect(),
        }
    }

    pub fn from_params(params: &LevelsParams) -> Self {
        let mut model = LevelsModel::new(params.depth);
        model.set_params(params);
        model
    }

    /// Apply `params` through the range-checked setters, rescaling values
    /// stored at another depth.
    pub fn set_params(&mut self, params: &LevelsParams) {
        let scale = |v: i32| match (params.depth, self.depth()) {
            // An overflowing value becomes -1, which the setters reject.
            (BitDepth::U8, BitDepth::U16) => v.checked_mul(DEPTH_MULTIPLIER).unwrap_or(-1),
            (BitDepth::U16, BitDepth::U8) => v / DEPTH_MULTIPLIER,
            _ => v,
        };
        let scaled: Vec<LevelsChannel> = params
            .channels
            .iter()
            .map(|c| LevelsChannel {
                gamma: c.gamma,
                low_input: scale(c.low_input),
                high_input: scale(c.high_input),
                low_output: scale(c.low_output),
                high_output: scale(c.high_output),
            })
            .collect();

        self.reset_all();
        for (channel, c) in Channel::ALL.into_iter().zip(scaled) {
            self.apply_channel(channel, c);
        }
    }

    fn apply_channel(&mut self, channel: Channel, c: LevelsChannel) {
        self.set_gamma(channel, c.gamma);
        self.set_low_input(channel, c.low_input);
        self.set_high_input(channel, c.high_input);
        self.set_low_output(channel, c.low_output);
        self.set_high_output(channel, c.high_output);
    }

    pub fn write_action(&self, action: &mut FilterAction) {
        action.set_bool(LEVELS_SIXTEEN_BIT, self.is_sixteen_bit());
        for channel in Channel::ALL {
            let c = self.channel(channel);
            action.set_double(indexed("levelGamma", channel), c.gamma);
            action.set_int(indexed("levelLowInput", channel), c.low_input as i64);
            action.set_int(indexed("levelHighInput", channel), c.high_input as i64);
            action.set_int(indexed("levelLowOutput", channel), c.low_output as i64);
            action.set_int(indexed("levelHighOutput", channel), c.high_output as i64);
        }
    }

    pub fn to_action(&self) -> FilterAction {
        let mut action = FilterAction::new(LEVELS_ACTION, ACTION_VERSION);
        self.write_action(&mut action);
        action
    }

    /// Rebuild a model from an undo-log entry. Missing values keep their
    /// defaults.
    pub fn from_action(action: &FilterAction) -> Result<Self> {
        let depth = BitDepth::from_sixteen_bit(action.bool(LEVELS_SIXTEEN_BIT)?.unwrap_or(false));
        let mut model = LevelsModel::new(depth);
        let int = |name: &str, channel: Channel, default: i32| -> Result<i32> {
            Ok(action
                .int(&indexed(name, channel))?
                .map_or(default, |v| i32::try_from(v).unwrap_or(-1)))
        };

        for channel in Channel::ALL {
            let d = LevelsChannel::identity(depth);
            let c = LevelsChannel {
                gamma: action.double(&indexed("levelGamma", channel))?.unwrap_or(d.gamma),
                low_input: int("levelLowInput", channel, d.low_input)?,
                high_input: int("levelHighInput", channel, d.high_input)?,
                low_output: int("levelLowOutput", channel, d.low_output)?,
                high_output: int("levelHighOutput", channel, d.high_output)?,
            };
            model.apply_channel(channel, c);
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edited_curves(depth: BitDepth) -> CurveModel {
        let max = depth.segment_max();
        let mut model = CurveModel::new(depth);
        model.set_point(Channel::Red, 8, ControlPoint::new(max / 2, max / 4));
        model.set_values(Channel::Blue, &vec![(max / 3) as u16; depth.segments()]);
        // the undo blob does not carry the last entry
        model.set_value(Channel::Blue, max as usize, max);
        model.recalculate_all();
        model
    }

    #[test]
    fn test_default_params_are_identity() {
        assert!(CurvesParams::default().is_identity());
        assert!(LevelsParams::default().is_identity());
        assert!(CurvesParams::identity(BitDepth::U16).is_identity());
    }

    #[test]
    fn test_curves_params_roundtrip_through_json() {
        let model = edited_curves(BitDepth::U8);
        let json = model.params().to_json().unwrap();
        let restored = CurveModel::from_params(&CurvesParams::from_json(&json).unwrap());
        for channel in Channel::ALL {
            assert_eq!(restored.curve_type(channel), model.curve_type(channel));
            assert_eq!(restored.points(channel), model.points(channel));
            assert_eq!(restored.curve(channel), model.curve(channel));
        }
    }

    #[test]
    fn test_curves_params_convert_depth() {
        let params = edited_curves(BitDepth::U8).params();
        let mut wide = CurveModel::new(BitDepth::U16);
        wide.set_params(&params);
        assert_eq!(wide.point(Channel::Red, 8), ControlPoint::new(127 * 255, 63 * 255));
        assert_eq!(wide.curve_type(Channel::Blue), CurveType::Free);
    }

    #[test]
    fn test_curves_action_roundtrip() {
        for depth in [BitDepth::U8, BitDepth::U16] {
            let model = edited_curves(depth);
            let action = model.to_action();
            assert_eq!(action.identifier(), CURVES_ACTION);
            assert_eq!(action.int("curveBitDepth").unwrap(), Some(depth.bits() as i64));
            assert!(action.contains("curveData[4]"));

            let restored = CurveModel::from_action(&action).unwrap();
            assert_eq!(restored.depth(), depth);
            for channel in Channel::ALL {
                assert_eq!(restored.curve(channel), model.curve(channel), "{depth} {channel}");
            }
        }
    }

    #[test]
    fn test_empty_action_gives_linear_curves() {
        let model = CurveModel::from_action(&FilterAction::default()).unwrap();
        assert_eq!(model.depth(), BitDepth::U8);
        assert!(model.is_linear_all());
    }

    #[test]
    fn test_levels_action_roundtrip() {
        let mut levels = LevelsModel::new(BitDepth::U16);
        levels.set_gamma(Channel::Green, 0.7);
        levels.set_low_input(Channel::Red, 1000);
        levels.set_high_output(Channel::Luminosity, 60000);

        let action = levels.to_action();
        assert_eq!(action.bool("levelsSixteenBit").unwrap(), Some(true));
        assert_eq!(action.int("levelLowInput[1]").unwrap(), Some(1000));
        let restored = LevelsModel::from_action(&action).unwrap();
        assert_eq!(restored.params(), levels.params());
    }

    #[test]
    fn test_levels_action_missing_values_default() {
        let mut action = FilterAction::new(LEVELS_ACTION, ACTION_VERSION);
        action.set_double("levelGamma[2]", 2.5);
        let restored = LevelsModel::from_action(&action).unwrap();
        assert_eq!(restored.depth(), BitDepth::U8);
        assert_eq!(restored.gamma(Channel::Green), 2.5);
        assert_eq!(restored.high_input(Channel::Green), 255);
    }

    #[test]
    fn test_levels_params_rescale() {
        let mut narrow = LevelsModel::new(BitDepth::U8);
        narrow.set_low_input(Channel::Blue, 10);
        let json = narrow.params().to_json().unwrap();
        let params = LevelsParams::from_json(&json).unwrap();

        let mut wide = LevelsModel::new(BitDepth::U16);
        wide.set_params(&params);
        assert_eq!(wide.low_input(Channel::Blue), 2550);
        assert_eq!(wide.high_input(Channel::Blue), 65025);
    }

    #[test]
    fn test_levels_params_overflow_is_ignored() {
        let mut params = LevelsParams::identity(BitDepth::U8);
        params.channels[Channel::Red.index()].high_input = 99_999_999;
        params.channels[Channel::Red.index()].low_input = 20;

        let wide = LevelsModel::from_params(&params);
        assert_eq!(wide.high_input(Channel::Red), 65535);
        assert_eq!(wide.low_input(Channel::Red), 20 * DEPTH_MULTIPLIER);
    }
}
