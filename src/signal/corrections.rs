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

//! Relativistic range correction and the ET minus TAI timescale offset.

use crate::cosmic::{EphemerisSource, SsBody, ET_TAI_OFFSET_S, SPEED_OF_LIGHT_KM_S};
use crate::time::Epoch;
use nalgebra::Vector3;

/// Shapiro delay of a signal leg, summed over every body of the ephemeris, in km.
///
/// `r1_ssb` is the transmit participant position at `t1`, `r2_ssb` the receive
/// participant position at `t2`, both barycentric. Each body contributes
/// `(1+gamma) mu/c^2 ln((r1+r2+r12+term)/(r1+r2-r12+term))` where the `+term` inside the
/// logarithm is reserved for the Sun.
pub fn relativity_correction(
    eph: &dyn EphemerisSource,
    r1_ssb_km: Vector3<f64>,
    r2_ssb_km: Vector3<f64>,
    t1: Epoch,
    t2: Epoch,
) -> f64 {
    let gamma = 1.0;
    let c = SPEED_OF_LIGHT_KM_S;

    let mut total_km = 0.0;
    for body in eph.bodies() {
        let b1 = eph.ssb_position_km(body, t1);
        let b2 = eph.ssb_position_km(body, t2);

        // Participant positions in the body's local inertial frame.
        let r1 = r1_ssb_km - b1;
        let r2 = r2_ssb_km - b2;
        let r12 = r2 - r1;
        let r1_mag = r1.norm();
        let r2_mag = r2.norm();
        let r12_mag = r12.norm();

        let term = (1.0 + gamma) * (body.mu_km3_s2() / c) / c;
        let correction = if body == SsBody::Sun {
            term * ((r1_mag + r2_mag + r12_mag + term) / (r1_mag + r2_mag - r12_mag + term)).ln()
        } else {
            term * ((r1_mag + r2_mag + r12_mag) / (r1_mag + r2_mag - r12_mag)).ln()
        };
        total_km += correction;
    }

    total_km
}

/// ET minus TAI at a participant, in seconds (Moyer eq. 2-23, plus the eq. 2-24
/// spacecraft term when `is_spacecraft`).
///
/// `earth_to_participant_km` and its rate locate the participant with respect to the
/// Earth center in MJ2000 axes.
pub fn et_minus_tai(
    eph: &dyn EphemerisSource,
    epoch: Epoch,
    earth_to_participant_km: Vector3<f64>,
    earth_to_participant_rate_km_s: Vector3<f64>,
    is_spacecraft: bool,
) -> f64 {
    let c = SPEED_OF_LIGHT_KM_S;

    let sun_pos = eph.ssb_position_km(SsBody::Sun, epoch);
    let sun_vel = eph.ssb_velocity_km_s(SsBody::Sun, epoch);
    let earth_pos = eph.ssb_position_km(SsBody::Earth, epoch);
    let earth_vel = eph.ssb_velocity_km_s(SsBody::Earth, epoch);
    let emb_pos = eph.ssb_position_km(SsBody::EarthMoonBarycenter, epoch);
    let emb_vel = eph.ssb_velocity_km_s(SsBody::EarthMoonBarycenter, epoch);
    let jup_pos = eph.ssb_position_km(SsBody::Jupiter, epoch);
    let jup_vel = eph.ssb_velocity_km_s(SsBody::Jupiter, epoch);
    let sat_pos = eph.ssb_position_km(SsBody::Saturn, epoch);
    let sat_vel = eph.ssb_velocity_km_s(SsBody::Saturn, epoch);

    let mu_sun = SsBody::Sun.mu_km3_s2();
    let mu_jup = SsBody::Jupiter.mu_km3_s2();
    let mu_sat = SsBody::Saturn.mu_km3_s2();

    let em_wrt_sun_pos = emb_pos - sun_pos;
    let em_wrt_sun_vel = emb_vel - sun_vel;
    let e_wrt_em_pos = earth_pos - emb_pos;

    let c2 = c * c;
    let mut et_tai = ET_TAI_OFFSET_S
        + 2.0 * em_wrt_sun_vel.dot(&em_wrt_sun_pos) / c2
        + emb_vel.dot(&e_wrt_em_pos) / c2
        + earth_vel.dot(&earth_to_participant_km) / c2
        + (mu_jup / (mu_sun + mu_jup)) * (jup_vel - sun_vel).dot(&(jup_pos - sun_pos)) / c2
        + (mu_sat / (mu_sun + mu_sat)) * (sat_vel - sun_vel).dot(&(sat_pos - sun_pos)) / c2
        + sun_vel.dot(&em_wrt_sun_pos) / c2;

    if is_spacecraft {
        // Moyer eq. 2-24 Psat term.
        et_tai += 2.0 * earth_to_participant_rate_km_s.dot(&earth_to_participant_km) / c2;
    }

    et_tai
}

#[cfg(test)]
mod corrections_ut {
    use super::*;
    use crate::cosmic::{EarthCentered, StaticEphemeris};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn geocentric_relativity_is_micrometric_at_leo() {
        let eph = EarthCentered;
        let epoch = Epoch::from_gregorian_utc_at_noon(2024, 2, 2);
        let r1 = Vector3::new(6378.0, 0.0, 0.0);
        let r2 = Vector3::new(0.0, 7000.0, 0.0);
        let corr = relativity_correction(&eph, r1, r2, epoch, epoch);
        // The Earth Shapiro delay over a LEO leg is centimetric but nonzero.
        assert!(corr > 0.0);
        assert!(corr < 1.0e-4, "correction was {corr} km");
    }

    #[test]
    fn sun_log_term_regularizes_conjunction() {
        // Signal path grazing the Sun: r1 + r2 - r12 tends to zero, and only the Sun's
        // +term keeps the logarithm finite.
        let eph = StaticEphemeris::new().with_state(SsBody::Sun, Vector3::zeros(), Vector3::zeros());
        let epoch = Epoch::from_gregorian_utc_at_noon(2024, 2, 2);
        let r1 = Vector3::new(1.5e8, 0.0, 0.0);
        let r2 = Vector3::new(-2.3e8, 0.0, 0.0);
        let corr = relativity_correction(&eph, r1, r2, epoch, epoch);
        assert!(corr.is_finite());
        // Superior conjunction delays are tens of kilometers equivalent.
        assert!(corr > 1.0, "correction was {corr} km");
    }

    #[test]
    fn et_tai_reduces_to_constant_for_geocentric_ephemeris() {
        let eph = EarthCentered;
        let epoch = Epoch::from_gregorian_utc_at_noon(2024, 2, 2);
        let et_tai = et_minus_tai(&eph, epoch, Vector3::new(6378.0, 0.0, 0.0), Vector3::zeros(), false);
        assert_abs_diff_eq!(et_tai, ET_TAI_OFFSET_S, epsilon = 1e-12);
    }

    #[test]
    fn spacecraft_term_adds_psat() {
        let eph = EarthCentered;
        let epoch = Epoch::from_gregorian_utc_at_noon(2024, 2, 2);
        let r = Vector3::new(7000.0, 0.0, 0.0);
        let v = Vector3::new(1.0, 7.5, 0.0);
        let station = et_minus_tai(&eph, epoch, r, v, false);
        let sc = et_minus_tai(&eph, epoch, r, v, true);
        let psat = 2.0 * v.dot(&r) / (SPEED_OF_LIGHT_KM_S * SPEED_OF_LIGHT_KM_S);
        assert_relative_eq!(sc - station, psat, epsilon = 1e-18);
    }
}
