/*
    Moyer, radiometric tracking measurement modeling
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

//! The RF hardware chain attached to tracking participants.
//!
//! The behavioral variation across devices is narrow (delay lookup, signal get and set,
//! passband feasibility), so the chain is modeled as concrete structs behind a tagged
//! [Hardware] enum rather than an inheritance hierarchy. Devices are configured at
//! scenario definition and never added or removed at runtime; their signal values are
//! updated on every measurement evaluation.

use serde_derive::{Deserialize, Serialize};
use std::fmt;

mod antenna;
mod receiver;
mod signal;
mod transmitter;
mod transponder;

pub use antenna::Antenna;
pub use receiver::{ErrorModel, Receiver};
pub use signal::Signal;
pub use transmitter::Transmitter;
pub use transponder::Transponder;

/// DSN frequency band of an uplink carrier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrequencyBand {
    S,
    X,
}

impl FrequencyBand {
    /// Classifies a carrier frequency in Hz, if it falls in a known band.
    pub fn classify(frequency_hz: f64) -> Option<Self> {
        if (2.0e9..=4.0e9).contains(&frequency_hz) {
            Some(Self::S)
        } else if (7.9e9..=8.4e9).contains(&frequency_hz) {
            Some(Self::X)
        } else {
            None
        }
    }

    /// The standard transponder turnaround ratio of this band.
    pub fn default_turnaround(self) -> f64 {
        match self {
            Self::S => 240.0 / 221.0,
            Self::X => 880.0 / 749.0,
        }
    }
}

impl fmt::Display for FrequencyBand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::S => write!(f, "S-band"),
            Self::X => write!(f, "X-band"),
        }
    }
}

/// One element of a participant's RF chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Hardware {
    Transmitter(Transmitter),
    Receiver(Receiver),
    Transponder(Transponder),
    Antenna(Antenna),
}

impl Hardware {
    pub fn name(&self) -> &str {
        match self {
            Self::Transmitter(hw) => &hw.name,
            Self::Receiver(hw) => &hw.name,
            Self::Transponder(hw) => &hw.name,
            Self::Antenna(hw) => &hw.name,
        }
    }

    pub fn as_transmitter(&self) -> Option<&Transmitter> {
        match self {
            Self::Transmitter(hw) => Some(hw),
            _ => None,
        }
    }

    pub fn as_receiver(&self) -> Option<&Receiver> {
        match self {
            Self::Receiver(hw) => Some(hw),
            _ => None,
        }
    }

    pub fn as_transponder(&self) -> Option<&Transponder> {
        match self {
            Self::Transponder(hw) => Some(hw),
            _ => None,
        }
    }

    pub fn as_transmitter_mut(&mut self) -> Option<&mut Transmitter> {
        match self {
            Self::Transmitter(hw) => Some(hw),
            _ => None,
        }
    }

    pub fn as_receiver_mut(&mut self) -> Option<&mut Receiver> {
        match self {
            Self::Receiver(hw) => Some(hw),
            _ => None,
        }
    }

    pub fn as_transponder_mut(&mut self) -> Option<&mut Transponder> {
        match self {
            Self::Transponder(hw) => Some(hw),
            _ => None,
        }
    }
}

#[cfg(test)]
mod band_ut {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn band_classification_bounds() {
        assert_eq!(FrequencyBand::classify(2.0e9), Some(FrequencyBand::S));
        assert_eq!(FrequencyBand::classify(4.0e9), Some(FrequencyBand::S));
        assert_eq!(FrequencyBand::classify(7.9e9), Some(FrequencyBand::X));
        assert_eq!(FrequencyBand::classify(8.4e9), Some(FrequencyBand::X));
        assert_eq!(FrequencyBand::classify(1.9e9), None);
        assert_eq!(FrequencyBand::classify(8.5e9), None);
    }

    #[test]
    fn band_default_turnarounds() {
        assert_relative_eq!(FrequencyBand::S.default_turnaround(), 240.0 / 221.0);
        assert_relative_eq!(FrequencyBand::X.default_turnaround(), 880.0 / 749.0);
    }
}
