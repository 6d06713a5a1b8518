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

use serde_derive::{Deserialize, Serialize};

use super::Signal;
use crate::errors::InvalidDelayIndexSnafu;
use crate::MeasurementError;

/// A transmitter radiating at a constant configured frequency, the only frequency model
/// implemented.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transmitter {
    pub name: String,
    /// Fixed hardware delay between signal generation and radiation, in seconds.
    pub delay_s: f64,
    /// Configured carrier frequency, in MHz.
    frequency_mhz: f64,
    signal: Signal,
}

impl Transmitter {
    pub fn new<S: ToString>(name: S, frequency_mhz: f64) -> Self {
        Self {
            name: name.to_string(),
            delay_s: 0.0,
            frequency_mhz,
            signal: Signal::new(frequency_mhz),
        }
    }

    pub fn with_delay(mut self, delay_s: f64) -> Self {
        self.delay_s = delay_s;
        self
    }

    /// The outgoing signal, whose value is the configured constant frequency.
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Configured carrier frequency, in MHz.
    pub fn frequency_mhz(&self) -> f64 {
        self.frequency_mhz
    }

    pub fn set_frequency_mhz(&mut self, frequency_mhz: f64) {
        self.frequency_mhz = frequency_mhz;
        self.signal.set_value(frequency_mhz);
    }

    pub fn delay(&self, which: usize) -> Result<f64, MeasurementError> {
        snafu::ensure!(
            which == 0,
            InvalidDelayIndexSnafu {
                which,
                device: self.name.clone()
            }
        );
        Ok(self.delay_s)
    }

    pub fn set_delay(&mut self, delay_s: f64, which: usize) -> Result<(), MeasurementError> {
        snafu::ensure!(
            which == 0,
            InvalidDelayIndexSnafu {
                which,
                device: self.name.clone()
            }
        );
        self.delay_s = delay_s;
        Ok(())
    }
}

#[cfg(test)]
mod transmitter_ut {
    use super::*;

    #[test]
    fn signal_carries_the_configured_frequency() {
        let mut tx = Transmitter::new("DSS-14 Tx", 2090.659968).with_delay(1e-6);
        assert_eq!(tx.signal().value(), 2090.659968);
        tx.set_frequency_mhz(7168.0);
        assert_eq!(tx.signal().value(), 7168.0);
        assert_eq!(tx.delay(0).unwrap(), 1e-6);
        assert!(tx.delay(1).is_err());
    }
}
