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

use super::{MeasurementData, MeasurementType};
use crate::cosmic::{rotation::inertial_to_ecef, EphemerisSource, SsBody};
use crate::errors::{MissingErrorModelSnafu, MissingHardwareSnafu, NotYetEvaluatedSnafu};
use crate::participants::SpacecraftNode;
use crate::signal::FeasibilityReason;
use crate::time::Epoch;
use crate::MeasurementError;
use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::Normal;
use rand_pcg::Pcg64Mcg;

/// The error model kind a GPS receiver must carry to produce this observable.
pub const GPS_POS_VEC_ERROR_MODEL: &str = "GPS_PosVec";

/// A position vector observable: the spacecraft position relative to the Earth center,
/// rotated into the Earth fixed frame, as produced by an onboard GPS receiver.
///
/// Requires exactly one participant and one strand; the spacecraft must carry the named
/// receiver with a `GPS_PosVec` error model supplying the per axis noise sigma and bias.
#[derive(Clone, Debug)]
pub struct GpsPosVecAdapter {
    spacecraft: SpacecraftNode,
    receiver_name: String,
    /// Whether Gaussian noise is drawn around the computed value.
    pub add_noise: bool,
    /// Whether the error model bias is added, strictly after the noise so that the
    /// bias itself never acquires simulated noise.
    pub add_bias: bool,
    current: MeasurementData,
    evaluated: bool,
}

impl GpsPosVecAdapter {
    pub fn new<S: ToString>(spacecraft: SpacecraftNode, receiver_name: S) -> Self {
        let placeholder = Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0);
        let participant_ids = vec![spacecraft.id.clone()];
        Self {
            spacecraft,
            receiver_name: receiver_name.to_string(),
            add_noise: false,
            add_bias: false,
            current: MeasurementData::new(placeholder, MeasurementType::GpsPosVec, participant_ids),
            evaluated: false,
        }
    }

    pub fn with_noise(mut self) -> Self {
        self.add_noise = true;
        self
    }

    pub fn with_bias(mut self) -> Self {
        self.add_bias = true;
        self
    }

    /// The last computed measurement.
    pub fn measurement(&self) -> Result<&MeasurementData, MeasurementError> {
        if !self.evaluated {
            return NotYetEvaluatedSnafu {
                observable: "GPSAdapter",
            }
            .fail();
        }
        Ok(&self.current)
    }

    /// Computes the Earth fixed position observable at `epoch`.
    pub fn calculate_measurement(
        &mut self,
        epoch: Epoch,
        eph: &dyn EphemerisSource,
        rng: Option<&mut Pcg64Mcg>,
    ) -> Result<&MeasurementData, MeasurementError> {
        self.current = MeasurementData::new(
            epoch,
            MeasurementType::GpsPosVec,
            vec![self.spacecraft.id.clone()],
        );

        let (mut pos_km, _) = self.spacecraft.trajectory.state_at(epoch)?;

        // Re-center on the Earth when the spacecraft frame origin is another body.
        if self.spacecraft.central_body != SsBody::Earth {
            let origin_to_earth = eph.ssb_position_km(SsBody::Earth, epoch)
                - eph.ssb_position_km(self.spacecraft.central_body, epoch);
            pos_km -= origin_to_earth;
        }

        let fixed_km = inertial_to_ecef(epoch) * pos_km;

        let receiver = self
            .spacecraft
            .hardware
            .iter()
            .find_map(|hw| hw.as_receiver().filter(|rx| rx.name == self.receiver_name))
            .ok_or_else(|| {
                MissingHardwareSnafu {
                    participant: self.spacecraft.name.clone(),
                    kind: "receiver",
                    action: "perform the GPS measurement",
                }
                .build()
            })?;
        let error_model = receiver
            .error_model(GPS_POS_VEC_ERROR_MODEL)
            .ok_or_else(|| {
                MissingErrorModelSnafu {
                    device: receiver.name.clone(),
                    kind: GPS_POS_VEC_ERROR_MODEL.to_string(),
                }
                .build()
            })?;

        let sigma = error_model.noise_sigma;
        let bias = error_model.bias;
        self.current.sensor_ids = vec![receiver.id.clone()];
        self.current.noise_sigma = vec![sigma; 3];
        self.current.bias = vec![bias; 3];

        // Degenerate sigma falls back to a unit variance instead of a singular
        // covariance.
        let variance = if sigma != 0.0 { sigma * sigma } else { 1.0 };
        self.current.covariance = DMatrix::from_diagonal_element(3, 3, variance);

        let mut rng = rng;
        for i in 0..3 {
            let mut value = fixed_km[i];
            if self.add_noise {
                if let Some(rng) = rng.as_deref_mut() {
                    value = rng.sample(Normal::new(value, sigma).unwrap());
                }
            }
            // The bias lands after the noise so it never acquires simulated noise.
            if self.add_bias {
                value += bias;
            }
            self.current.value[i] = value;
        }

        self.current.is_feasible = true;
        self.current.unfeasible_reason = FeasibilityReason::Normal;
        self.current.feasibility_value = 0.0;
        self.current.event_count = 0;
        self.evaluated = true;

        Ok(&self.current)
    }
}
