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

/// Stochastic description of a measurement taken through a given device, keyed by the
/// observable kind (e.g. `GPS_PosVec`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorModel {
    pub kind: String,
    /// One sigma measurement noise, in the unit of the observable (km for position vectors).
    pub noise_sigma: f64,
    /// Constant measurement bias, in the unit of the observable.
    pub bias: f64,
}

impl ErrorModel {
    pub fn new<S: ToString>(kind: S, noise_sigma: f64, bias: f64) -> Self {
        Self {
            kind: kind.to_string(),
            noise_sigma,
            bias,
        }
    }
}

/// A receiver with a passband centered on a configured frequency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub name: String,
    /// Identifier reported in the measurement sensor list.
    pub id: String,
    /// Fixed hardware delay between reception and time tagging, in seconds.
    pub delay_s: f64,
    /// Passband center, in MHz.
    pub center_frequency_mhz: f64,
    /// Passband width, in MHz.
    pub bandwidth_mhz: f64,
    signal: Signal,
    pub error_models: Vec<ErrorModel>,
}

impl Receiver {
    pub fn new<S: ToString>(name: S, center_frequency_mhz: f64, bandwidth_mhz: f64) -> Self {
        let name = name.to_string();
        Self {
            id: name.clone(),
            name,
            delay_s: 0.0,
            center_frequency_mhz,
            bandwidth_mhz,
            signal: Signal::default(),
            error_models: Vec::new(),
        }
    }

    pub fn with_delay(mut self, delay_s: f64) -> Self {
        self.delay_s = delay_s;
        self
    }

    pub fn with_id<S: ToString>(mut self, id: S) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_error_model(mut self, model: ErrorModel) -> Self {
        self.error_models.push(model);
        self
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn set_signal(&mut self, signal: Signal) {
        self.signal = signal;
    }

    /// Whether the current signal falls within the passband, bounds included.
    pub fn is_feasible(&self) -> bool {
        (self.signal.value() - self.center_frequency_mhz).abs() <= self.bandwidth_mhz / 2.0
    }

    /// The first error model of the provided kind, if any.
    pub fn error_model(&self, kind: &str) -> Option<&ErrorModel> {
        self.error_models.iter().find(|em| em.kind == kind)
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
mod receiver_ut {
    use super::*;

    #[test]
    fn passband_bounds_are_inclusive() {
        let mut rx = Receiver::new("DSS-14 Rx", 2200.0, 10.0);
        rx.set_signal(Signal::new(2195.0));
        assert!(rx.is_feasible(), "lower edge must be in band");
        rx.set_signal(Signal::new(2205.0));
        assert!(rx.is_feasible(), "upper edge must be in band");
        rx.set_signal(Signal::new(2205.0001));
        assert!(!rx.is_feasible());
        rx.set_signal(Signal::new(2194.9999));
        assert!(!rx.is_feasible());
    }

    #[test]
    fn error_model_lookup_by_kind() {
        let rx = Receiver::new("GPS Rx", 1575.42, 20.0)
            .with_error_model(ErrorModel::new("GPS_PosVec", 0.010, 0.0));
        assert!(rx.error_model("GPS_PosVec").is_some());
        assert!(rx.error_model("Range").is_none());
    }
}
