//! Channel identifiers shared by curves, levels and histograms.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five tonal channels.
///
/// `Luminosity` is the overall channel: for histograms it counts the
/// per-pixel maximum of red, green and blue, and for curves and levels it
/// is the master adjustment composed on top of each color channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Luminosity,
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    /// Number of channels held by curve, levels and histogram state.
    pub const COUNT: usize = 5;

    /// All channels in storage order.
    pub const ALL: [Channel; Self::COUNT] = [
        Channel::Luminosity,
        Channel::Red,
        Channel::Green,
        Channel::Blue,
        Channel::Alpha,
    ];

    /// Storage slot of this channel.
    pub const fn index(self) -> usize {
        match self {
            Self::Luminosity => 0,
            Self::Red => 1,
            Self::Green => 2,
            Self::Blue => 3,
            Self::Alpha => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Luminosity => "Luminosity",
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Blue => "Blue",
            Self::Alpha => "Alpha",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_index(channel.index()), Some(channel));
        }
        assert_eq!(Channel::from_index(Channel::COUNT), None);
    }
}
