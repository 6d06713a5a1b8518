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

//! Measurement models composing signal legs into tracking observables.

use crate::hardware::FrequencyBand;
use crate::signal::FeasibilityReason;
use crate::time::Epoch;
use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::Normal;
use rand_pcg::Pcg64Mcg;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

mod doppler;
mod gps;
mod range;

pub use doppler::{AveragedDoppler, DsnTwoWayDoppler};
pub use gps::GpsPosVecAdapter;
pub use range::DsnTwoWayRange;

/// Reference frequency of the DSN station 14 transmitter, in Hz, used as the range unit
/// conversion fallback when the uplink is outside of the known bands.
pub const DSN14_FREQUENCY_HZ: f64 = 2_090_659_968.0;

/// Default Doppler averaging interval, in seconds.
pub const DEFAULT_DOPPLER_INTERVAL_S: f64 = 1.0;

/// Default range ambiguity modulo, in range units.
pub const DEFAULT_RANGE_MODULO: f64 = 1.0e18;

/// The kind of observable produced by a measurement model.
#[derive(Copy, Clone, Debug, Hash, Serialize, Deserialize, PartialEq, Eq)]
pub enum MeasurementType {
    /// DSN range, in range units.
    Range,
    /// Averaged Doppler, in Hz.
    Doppler,
    /// Body fixed position vector, in km.
    GpsPosVec,
}

impl MeasurementType {
    /// Returns the expected unit of this measurement type
    pub fn unit(self) -> &'static str {
        match self {
            Self::Range => "RU",
            Self::Doppler => "Hz",
            Self::GpsPosVec => "km",
        }
    }

    /// Dimension of the observable.
    pub fn dimension(self) -> usize {
        match self {
            Self::Range | Self::Doppler => 1,
            Self::GpsPosVec => 3,
        }
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?} ({})", self.unit())
    }
}

/// The externally visible result of one measurement evaluation. Overwritten on every
/// call; consumed by an estimator or simulator.
#[derive(Clone, Debug)]
pub struct MeasurementData {
    pub epoch: Epoch,
    pub msr_type: MeasurementType,
    pub value: Vec<f64>,
    pub is_feasible: bool,
    pub unfeasible_reason: FeasibilityReason,
    /// Elevation angle backing the feasibility decision, in degrees.
    pub feasibility_value: f64,
    /// Number of light time events this observable depends on.
    pub event_count: usize,
    pub participant_ids: Vec<String>,
    pub sensor_ids: Vec<String>,
    pub noise_sigma: Vec<f64>,
    pub bias: Vec<f64>,
    pub covariance: DMatrix<f64>,
    /// Uplink carrier at the transmit epoch, in Hz.
    pub uplink_frequency_hz: f64,
    pub uplink_band: Option<FrequencyBand>,
    /// Range ambiguity modulo, in range units.
    pub range_modulo: f64,
    /// Doppler averaging interval, in seconds.
    pub doppler_count_interval_s: f64,
}

impl MeasurementData {
    pub fn new(epoch: Epoch, msr_type: MeasurementType, participant_ids: Vec<String>) -> Self {
        let dim = msr_type.dimension();
        Self {
            epoch,
            msr_type,
            value: vec![0.0; dim],
            is_feasible: false,
            unfeasible_reason: FeasibilityReason::Normal,
            feasibility_value: 0.0,
            event_count: 0,
            participant_ids,
            sensor_ids: Vec::new(),
            noise_sigma: vec![0.0; dim],
            bias: vec![0.0; dim],
            covariance: DMatrix::identity(dim, dim),
            uplink_frequency_hz: 0.0,
            uplink_band: None,
            range_modulo: DEFAULT_RANGE_MODULO,
            doppler_count_interval_s: DEFAULT_DOPPLER_INTERVAL_S,
        }
    }

    /// The observable folded into the range ambiguity interval.
    pub fn modulo_value(&self) -> f64 {
        self.value[0].rem_euclid(self.range_modulo)
    }
}

impl fmt::Display for MeasurementData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} @ {} = {:?} ({})",
            self.msr_type,
            self.epoch,
            self.value,
            if self.is_feasible {
                "feasible".to_string()
            } else {
                format!("infeasible: {}", self.unfeasible_reason)
            }
        )
    }
}

/// Range unit conversion factor of a DSN uplink (Moyer eq. 13-122 family): half the
/// carrier in S-band, 11/75 of the carrier in X-band, and the DSN 14 S-band factor for
/// anything else.
pub fn frequency_factor(frequency_hz: f64) -> f64 {
    match FrequencyBand::classify(frequency_hz) {
        Some(FrequencyBand::S) => frequency_hz / 2.0,
        Some(FrequencyBand::X) => frequency_hz * 11.0 / 75.0,
        None => DSN14_FREQUENCY_HZ / 2.0,
    }
}

/// Draws the measured value from a Gaussian centered on the computed value, redrawing
/// while the sample crosses zero so that the noisy observable keeps the sign of the
/// truth.
pub(crate) fn gaussian_keeping_sign(value: f64, sigma: f64, rng: &mut Pcg64Mcg) -> f64 {
    if sigma <= 0.0 {
        return value;
    }
    let sign = if value < 0.0 { -1.0 } else { 1.0 };
    let dist = Normal::new(value, sigma).unwrap();
    let mut sample = rng.sample(dist);
    while sample * sign <= 0.0 {
        sample = rng.sample(dist);
    }
    sample
}

#[cfg(test)]
mod msr_ut {
    use super::*;

    #[test]
    fn frequency_factor_bands() {
        // Any S-band frequency maps to half itself.
        assert_eq!(frequency_factor(2.2e9), 1.1e9);
        assert_eq!(frequency_factor(2.0e9), 1.0e9);
        assert_eq!(frequency_factor(4.0e9), 2.0e9);
        // Any X-band frequency maps to 11/75 of itself.
        assert_eq!(frequency_factor(8.1e9), 8.1e9 * 11.0 / 75.0);
        // Everything else falls back to the DSN 14 constant.
        assert_eq!(frequency_factor(1.0e9), DSN14_FREQUENCY_HZ / 2.0);
        assert_eq!(frequency_factor(32.0e9), DSN14_FREQUENCY_HZ / 2.0);
    }

    #[test]
    fn noise_redraw_keeps_sign() {
        let mut rng = Pcg64Mcg::new(42);
        for _ in 0..100 {
            let sample = gaussian_keeping_sign(1.0, 5.0, &mut rng);
            assert!(sample > 0.0);
            let sample = gaussian_keeping_sign(-1.0, 5.0, &mut rng);
            assert!(sample < 0.0);
        }
    }

    #[test]
    fn modulo_folds_the_range() {
        let mut msr = MeasurementData::new(
            Epoch::from_gregorian_utc_at_midnight(2024, 1, 1),
            MeasurementType::Range,
            vec!["DSS-14".to_string(), "SC".to_string()],
        );
        msr.value[0] = 2.5e6;
        msr.range_modulo = 1.0e6;
        assert_eq!(msr.modulo_value(), 0.5e6);
    }
}
