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

use crate::time::Epoch;
use nalgebra::Vector3;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub mod rotation;

/// Speed of light in vacuum, in m/s.
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;
/// Speed of light in vacuum, in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;
/// Constant part of the ET minus TAI timescale offset, in seconds (Moyer eq. 2-23).
pub const ET_TAI_OFFSET_S: f64 = 32.184;
/// Earth equatorial radius, in km.
pub const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.1363;
/// Earth ellipsoid flattening.
pub const EARTH_FLATTENING: f64 = 1.0 / 298.257_223_563;
/// Mean Earth rotation rate, in rad/s.
pub const EARTH_ANGULAR_VELOCITY_RAD_S: f64 = 7.292_115_146_706_979e-5;

/// A solar system body or barycenter that the measurement corrections may query.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum SsBody {
    Sun,
    Mercury,
    Venus,
    Earth,
    Luna,
    EarthMoonBarycenter,
    Mars,
    Jupiter,
    Saturn,
    SolarSystemBarycenter,
}

impl SsBody {
    /// Gravitational parameter, in km^3/s^2.
    pub fn mu_km3_s2(self) -> f64 {
        match self {
            Self::Sun => 132_712_440_017.99,
            Self::Mercury => 22_032.080_486_418,
            Self::Venus => 324_858.598_826_46,
            Self::Earth => 398_600.4415,
            Self::Luna => 4_902.800_582_147_8,
            Self::EarthMoonBarycenter => 398_600.4415 + 4_902.800_582_147_8,
            Self::Mars => 42_828.314_258_067,
            Self::Jupiter => 126_712_767.8578,
            Self::Saturn => 37_940_626.061_137,
            Self::SolarSystemBarycenter => 0.0,
        }
    }
}

impl fmt::Display for SsBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Ephemeris contract consumed by the signal corrections: positions and velocities of
/// solar system bodies with respect to the solar system barycenter, MJ2000 axes.
///
/// The propagation of the actual participants is a separate contract
/// ([crate::participants::Trajectory]); this one only serves the celestial geometry of
/// the relativistic and ET-TAI corrections and the origin offsets between participants
/// whose central bodies differ.
pub trait EphemerisSource: Send + Sync {
    /// Position of `body` with respect to the solar system barycenter at `epoch`, in km.
    fn ssb_position_km(&self, body: SsBody, epoch: Epoch) -> Vector3<f64>;

    /// Velocity of `body` with respect to the solar system barycenter at `epoch`, in km/s.
    fn ssb_velocity_km_s(&self, body: SsBody, epoch: Epoch) -> Vector3<f64>;

    /// The bodies summed over in the relativistic range correction.
    fn bodies(&self) -> Vec<SsBody>;
}

/// A geocentric ephemeris: the Earth is pinned at the barycenter and no other body
/// contributes. Appropriate for Earth orbiting scenarios where the relativistic and
/// ET-TAI corrections are either disabled or dominated by the Earth term.
#[derive(Copy, Clone, Debug, Default)]
pub struct EarthCentered;

impl EphemerisSource for EarthCentered {
    fn ssb_position_km(&self, _body: SsBody, _epoch: Epoch) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn ssb_velocity_km_s(&self, _body: SsBody, _epoch: Epoch) -> Vector3<f64> {
        Vector3::zeros()
    }

    fn bodies(&self) -> Vec<SsBody> {
        vec![SsBody::Earth]
    }
}

/// An ephemeris of fixed states, mostly useful to build test scenarios with a known
/// celestial geometry. Bodies without an entry report a zero state.
#[derive(Clone, Debug, Default)]
pub struct StaticEphemeris {
    states: HashMap<SsBody, (Vector3<f64>, Vector3<f64>)>,
}

impl StaticEphemeris {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `body` at the provided barycentric state.
    pub fn with_state(mut self, body: SsBody, pos_km: Vector3<f64>, vel_km_s: Vector3<f64>) -> Self {
        self.states.insert(body, (pos_km, vel_km_s));
        self
    }
}

impl EphemerisSource for StaticEphemeris {
    fn ssb_position_km(&self, body: SsBody, _epoch: Epoch) -> Vector3<f64> {
        self.states.get(&body).map(|s| s.0).unwrap_or_default()
    }

    fn ssb_velocity_km_s(&self, body: SsBody, _epoch: Epoch) -> Vector3<f64> {
        self.states.get(&body).map(|s| s.1).unwrap_or_default()
    }

    fn bodies(&self) -> Vec<SsBody> {
        self.states.keys().copied().collect()
    }
}

#[cfg(test)]
mod cosmic_ut {
    use super::*;

    #[test]
    fn static_ephemeris_reports_pinned_states() {
        let eph = StaticEphemeris::new().with_state(
            SsBody::Earth,
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(-1.0, 0.5, 0.0),
        );
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 3, 1);
        assert_eq!(
            eph.ssb_position_km(SsBody::Earth, epoch),
            Vector3::new(1.0, 2.0, 3.0)
        );
        assert_eq!(eph.ssb_velocity_km_s(SsBody::Sun, epoch), Vector3::zeros());
        assert_eq!(eph.bodies(), vec![SsBody::Earth]);
    }

    #[test]
    fn mu_ratios_match_moyer_tables() {
        // The Jupiter and Saturn mass ratio terms of the ET-TAI expansion.
        let mu_sun = SsBody::Sun.mu_km3_s2();
        let ratio_jup = SsBody::Jupiter.mu_km3_s2() / (mu_sun + SsBody::Jupiter.mu_km3_s2());
        assert!(ratio_jup > 9.0e-4 && ratio_jup < 1.0e-3);
    }
}
