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

//! Tracking participants: the ground stations and spacecraft between which signal legs
//! are modeled.

use crate::cosmic::rotation::{ecef_to_inertial, ecef_to_sez, geodetic_to_ecef_km, inertial_to_ecef};
use crate::cosmic::{SsBody, EARTH_ANGULAR_VELOCITY_RAD_S};
use crate::hardware::{Hardware, Receiver, Transmitter, Transponder};
use crate::time::Epoch;
use crate::MeasurementError;
use nalgebra::{Matrix3, Matrix6, Vector3};
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// State source for a spacecraft participant, in its central body MJ2000 frame.
///
/// The actual propagation is outside of this crate; an orbit determination process will
/// typically back this with an interpolated trajectory.
pub trait Trajectory: Send + Sync {
    /// Position (km) and velocity (km/s) at `epoch`.
    fn state_at(&self, epoch: Epoch) -> Result<(Vector3<f64>, Vector3<f64>), MeasurementError>;

    /// State transition matrix from the trajectory reference epoch to `epoch`.
    /// Defaults to identity for sources which do not carry variational equations.
    fn stm_at(&self, _epoch: Epoch) -> Matrix6<f64> {
        Matrix6::identity()
    }
}

/// Constant velocity extrapolation from an anchor state. Useful for tests and for
/// short-arc modeling where the light time is a few milliseconds.
#[derive(Copy, Clone, Debug)]
pub struct LinearState {
    pub epoch: Epoch,
    pub pos_km: Vector3<f64>,
    pub vel_km_s: Vector3<f64>,
}

impl Trajectory for LinearState {
    fn state_at(&self, epoch: Epoch) -> Result<(Vector3<f64>, Vector3<f64>), MeasurementError> {
        let dt = (epoch - self.epoch).to_seconds();
        Ok((self.pos_km + self.vel_km_s * dt, self.vel_km_s))
    }
}

/// Elevation and azimuth of a topocentric state, and whether it clears the station mask.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ElevationReport {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    /// Positive when the elevation clears the station mask.
    pub visibility: f64,
}

/// A tracking station on the Earth surface.
///
/// Station states are computed from the geodetic coordinates through the crate's mean
/// rotation model; no external propagation is involved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundStation {
    pub name: String,
    /// Identifier reported in the measurement participant list.
    pub id: String,
    /// in degrees
    pub latitude_deg: f64,
    /// in degrees
    pub longitude_deg: f64,
    /// in km
    pub height_km: f64,
    /// in degrees
    pub elevation_mask_deg: f64,
    /// Troposphere model name, e.g. "HopfieldSaastamoinen" or "Marini"; None disables.
    pub troposphere_model: Option<String>,
    /// Ionosphere model name, e.g. "IRI2007"; None disables.
    pub ionosphere_model: Option<String>,
    #[serde(default)]
    pub hardware: Vec<Hardware>,
}

impl GroundStation {
    /// Initializes a station at a point on the surface, with a zero elevation mask and
    /// no media models.
    pub fn from_point<S: ToString>(
        name: S,
        latitude_deg: f64,
        longitude_deg: f64,
        height_km: f64,
    ) -> Self {
        let name = name.to_string();
        Self {
            id: name.clone(),
            name,
            latitude_deg,
            longitude_deg,
            height_km,
            elevation_mask_deg: 0.0,
            troposphere_model: None,
            ionosphere_model: None,
            hardware: Vec::new(),
        }
    }

    pub fn with_elevation_mask(mut self, mask_deg: f64) -> Self {
        self.elevation_mask_deg = mask_deg;
        self
    }

    pub fn with_hardware(mut self, hw: Hardware) -> Self {
        self.hardware.push(hw);
        self
    }

    pub fn with_id<S: ToString>(mut self, id: S) -> Self {
        self.id = id.to_string();
        self
    }

    /// Earth fixed position of the station, in km.
    pub fn ecef_position_km(&self) -> Vector3<f64> {
        geodetic_to_ecef_km(self.latitude_deg, self.longitude_deg, self.height_km)
    }

    /// Station state in the Earth MJ2000 frame at `epoch`.
    pub fn state_at(&self, epoch: Epoch) -> (Vector3<f64>, Vector3<f64>) {
        let r = ecef_to_inertial(epoch) * self.ecef_position_km();
        let omega = Vector3::new(0.0, 0.0, EARTH_ANGULAR_VELOCITY_RAD_S);
        (r, omega.cross(&r))
    }

    /// DCM from the Earth MJ2000 frame to this station's south-east-zenith frame.
    pub fn sez_rotation(&self, epoch: Epoch) -> Matrix3<f64> {
        ecef_to_sez(self.latitude_deg, self.longitude_deg) * inertial_to_ecef(epoch)
    }

    /// Evaluates the elevation and azimuth of a topocentric (SEZ) position, and the
    /// visibility against the station elevation mask: positive means visible.
    pub fn is_valid_elevation(&self, sez_pos_km: &Vector3<f64>) -> ElevationReport {
        let u = sez_pos_km / sez_pos_km.norm();
        let elevation_deg = u.z.asin().to_degrees();
        let azimuth_deg = u.y.atan2(-u.x).to_degrees().rem_euclid(360.0);
        ElevationReport {
            elevation_deg,
            azimuth_deg,
            visibility: elevation_deg - self.elevation_mask_deg,
        }
    }
}

impl fmt::Display for GroundStation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (lat.: {:.4} deg    long.: {:.4} deg    alt.: {:.3} m)",
            self.name,
            self.latitude_deg,
            self.longitude_deg,
            self.height_km * 1e3,
        )
    }
}

/// A spacecraft participant, backed by an external trajectory source.
#[derive(Clone)]
pub struct SpacecraftNode {
    pub name: String,
    /// Identifier reported in the measurement participant list.
    pub id: String,
    /// The body at the origin of the trajectory frame.
    pub central_body: SsBody,
    pub hardware: Vec<Hardware>,
    pub trajectory: Arc<dyn Trajectory>,
}

impl SpacecraftNode {
    pub fn new<S: ToString>(name: S, trajectory: Arc<dyn Trajectory>) -> Self {
        let name = name.to_string();
        Self {
            id: name.clone(),
            name,
            central_body: SsBody::Earth,
            hardware: Vec::new(),
            trajectory,
        }
    }

    pub fn with_central_body(mut self, body: SsBody) -> Self {
        self.central_body = body;
        self
    }

    pub fn with_hardware(mut self, hw: Hardware) -> Self {
        self.hardware.push(hw);
        self
    }

    pub fn with_id<S: ToString>(mut self, id: S) -> Self {
        self.id = id.to_string();
        self
    }
}

impl fmt::Debug for SpacecraftNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SpacecraftNode")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("central_body", &self.central_body)
            .field("hardware", &self.hardware)
            .finish_non_exhaustive()
    }
}

/// Either end of a signal leg.
#[derive(Clone, Debug)]
pub enum Participant {
    Station(GroundStation),
    Spacecraft(SpacecraftNode),
}

impl Participant {
    pub fn name(&self) -> &str {
        match self {
            Self::Station(gs) => &gs.name,
            Self::Spacecraft(sc) => &sc.name,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Station(gs) => &gs.id,
            Self::Spacecraft(sc) => &sc.id,
        }
    }

    pub fn is_station(&self) -> bool {
        matches!(self, Self::Station(_))
    }

    pub fn central_body(&self) -> SsBody {
        match self {
            Self::Station(_) => SsBody::Earth,
            Self::Spacecraft(sc) => sc.central_body,
        }
    }

    /// Participant state in its central body MJ2000 frame at `epoch`.
    pub fn state_at(&self, epoch: Epoch) -> Result<(Vector3<f64>, Vector3<f64>), MeasurementError> {
        match self {
            Self::Station(gs) => Ok(gs.state_at(epoch)),
            Self::Spacecraft(sc) => sc.trajectory.state_at(epoch),
        }
    }

    pub fn hardware(&self) -> &[Hardware] {
        match self {
            Self::Station(gs) => &gs.hardware,
            Self::Spacecraft(sc) => &sc.hardware,
        }
    }

    pub fn hardware_mut(&mut self) -> &mut [Hardware] {
        match self {
            Self::Station(gs) => &mut gs.hardware,
            Self::Spacecraft(sc) => &mut sc.hardware,
        }
    }

    pub fn first_transmitter(&self) -> Option<&Transmitter> {
        self.hardware().iter().find_map(Hardware::as_transmitter)
    }

    pub fn first_receiver(&self) -> Option<&Receiver> {
        self.hardware().iter().find_map(Hardware::as_receiver)
    }

    pub fn first_transponder(&self) -> Option<&Transponder> {
        self.hardware().iter().find_map(Hardware::as_transponder)
    }

    pub fn first_receiver_mut(&mut self) -> Option<&mut Receiver> {
        self.hardware_mut()
            .iter_mut()
            .find_map(Hardware::as_receiver_mut)
    }

    pub fn first_transponder_mut(&mut self) -> Option<&mut Transponder> {
        self.hardware_mut()
            .iter_mut()
            .find_map(Hardware::as_transponder_mut)
    }

    /// Hardware delay of this participant in its transmitting role: the first
    /// transmitter if any, else the first transponder. Zero without hardware.
    pub fn transmit_delay_s(&self) -> f64 {
        if let Some(tx) = self.first_transmitter() {
            tx.delay_s
        } else if let Some(tp) = self.first_transponder() {
            tp.total_delay_s()
        } else {
            0.0
        }
    }

    /// Hardware delay of this participant in its receiving role: the first receiver if
    /// any, else the first transponder. Zero without hardware.
    pub fn receive_delay_s(&self) -> f64 {
        if let Some(rx) = self.first_receiver() {
            rx.delay_s
        } else if let Some(tp) = self.first_transponder() {
            tp.total_delay_s()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod participants_ut {
    use super::*;
    use approx::assert_abs_diff_eq;
    use hifitime::TimeUnits;

    #[test]
    fn station_state_rotates_with_the_earth() {
        let gs = GroundStation::from_point("Equator", 0.0, 0.0, 0.0);
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 6, 1);
        let (r0, v0) = gs.state_at(epoch);
        let (r1, _) = gs.state_at(epoch + 10.0.seconds());
        assert_abs_diff_eq!(r0.norm(), r1.norm(), epsilon = 1e-9);
        // Velocity is horizontal and about 465 m/s at the equator.
        assert_abs_diff_eq!(v0.norm(), 0.4651, epsilon = 1e-3);
        assert_abs_diff_eq!(r0.dot(&v0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn zenith_pass_reports_ninety_degrees() {
        let gs = GroundStation::from_point("Anywhere", 35.0, -116.0, 1.0).with_elevation_mask(10.0);
        let report = gs.is_valid_elevation(&Vector3::new(0.0, 0.0, 800.0));
        assert_abs_diff_eq!(report.elevation_deg, 90.0, epsilon = 1e-12);
        assert!(report.visibility > 0.0);

        let below = gs.is_valid_elevation(&Vector3::new(500.0, 300.0, -50.0));
        assert!(below.visibility < 0.0);
        assert!(below.elevation_deg < 0.0);
    }

    #[test]
    fn linear_state_extrapolates() {
        let epoch = Epoch::from_gregorian_utc_at_noon(2024, 6, 1);
        let traj = LinearState {
            epoch,
            pos_km: Vector3::new(7000.0, 0.0, 0.0),
            vel_km_s: Vector3::new(0.0, 7.5, 0.0),
        };
        let (r, v) = traj.state_at(epoch + 2.0.seconds()).unwrap();
        assert_abs_diff_eq!(r.y, 15.0, epsilon = 1e-12);
        assert_eq!(v, Vector3::new(0.0, 7.5, 0.0));
    }
}
