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
use crate::errors::{InvalidDelayIndexSnafu, InvalidSignalIndexSnafu, InvalidTurnaroundRatioSnafu};
use crate::MeasurementError;

/// A transponder which retransmits the received carrier multiplied by its turnaround
/// ratio.
///
/// The turnaround ratio is configured as a string, either a rational `"240/221"` or a
/// bare real number `"1.1"`. Signal index 0 is the received (input) signal, index 1 the
/// retransmitted (output) signal; setting the input signal synchronously recomputes the
/// output. The total hardware delay straddles the receive and retransmit paths, indexed
/// 1 and 2.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transponder {
    pub name: String,
    ratio: String,
    /// Input passband center, in MHz.
    pub input_center_frequency_mhz: f64,
    /// Input passband width, in MHz.
    pub input_bandwidth_mhz: f64,
    path_delay_s: [f64; 2],
    signals: [Signal; 2],
}

impl Transponder {
    pub fn new<S: ToString, R: ToString>(name: S, ratio: R) -> Self {
        Self {
            name: name.to_string(),
            ratio: ratio.to_string(),
            input_center_frequency_mhz: 0.0,
            input_bandwidth_mhz: 0.0,
            path_delay_s: [0.0; 2],
            signals: [Signal::default(); 2],
        }
    }

    pub fn with_input_band(mut self, center_mhz: f64, bandwidth_mhz: f64) -> Self {
        self.input_center_frequency_mhz = center_mhz;
        self.input_bandwidth_mhz = bandwidth_mhz;
        self
    }

    /// Splits the provided total delay evenly across the receive and retransmit paths.
    pub fn with_delay(mut self, total_delay_s: f64) -> Self {
        self.path_delay_s = [total_delay_s / 2.0, total_delay_s / 2.0];
        self
    }

    /// The configured turnaround ratio string.
    pub fn ratio_str(&self) -> &str {
        &self.ratio
    }

    pub fn set_ratio<R: ToString>(&mut self, ratio: R) {
        self.ratio = ratio.to_string();
        let input = self.signals[0].value();
        if let Ok(k) = self.turnaround_ratio() {
            self.signals[1].set_value(k * input);
        }
    }

    /// The turnaround ratio as a real number.
    ///
    /// A string containing a `/` is parsed as numerator over denominator; anything else
    /// is parsed as a plain real number. A malformed string is a configuration error.
    pub fn turnaround_ratio(&self) -> Result<f64, MeasurementError> {
        let parse = |s: &str| -> Result<f64, MeasurementError> {
            s.trim().parse::<f64>().map_err(|_| {
                InvalidTurnaroundRatioSnafu {
                    ratio: self.ratio.clone(),
                    device: self.name.clone(),
                }
                .build()
            })
        };
        match self.ratio.split_once('/') {
            Some((num, denom)) => Ok(parse(num)? / parse(denom)?),
            None => parse(&self.ratio),
        }
    }

    /// Signal 0 is the input, signal 1 the output.
    pub fn signal(&self, which: usize) -> Result<Signal, MeasurementError> {
        snafu::ensure!(
            which < 2,
            InvalidSignalIndexSnafu {
                which,
                device: self.name.clone()
            }
        );
        Ok(self.signals[which])
    }

    /// Stores the signal at the given index. Setting the input signal recomputes the
    /// output signal as `turnaround_ratio * input`.
    pub fn set_signal(&mut self, signal: Signal, which: usize) -> Result<(), MeasurementError> {
        snafu::ensure!(
            which < 2,
            InvalidSignalIndexSnafu {
                which,
                device: self.name.clone()
            }
        );
        self.signals[which] = signal;
        if which == 0 {
            let output = self.turnaround_ratio()? * signal.value();
            self.signals[1].set_value(output);
        }
        Ok(())
    }

    /// Whether the signal at the given index falls within the input passband, bounds
    /// included.
    pub fn is_feasible(&self, which: usize) -> Result<bool, MeasurementError> {
        let signal = self.signal(which)?;
        Ok(
            (signal.value() - self.input_center_frequency_mhz).abs()
                <= self.input_bandwidth_mhz / 2.0,
        )
    }

    /// Delay of the receive (1) or retransmit (2) path, in seconds.
    pub fn delay(&self, which: usize) -> Result<f64, MeasurementError> {
        snafu::ensure!(
            (1..=2).contains(&which),
            InvalidDelayIndexSnafu {
                which,
                device: self.name.clone()
            }
        );
        Ok(self.path_delay_s[which - 1])
    }

    pub fn set_delay(&mut self, delay_s: f64, which: usize) -> Result<(), MeasurementError> {
        snafu::ensure!(
            (1..=2).contains(&which),
            InvalidDelayIndexSnafu {
                which,
                device: self.name.clone()
            }
        );
        self.path_delay_s[which - 1] = delay_s;
        Ok(())
    }

    /// Total delay through the transponder, both paths, in seconds.
    pub fn total_delay_s(&self) -> f64 {
        self.path_delay_s[0] + self.path_delay_s[1]
    }
}
