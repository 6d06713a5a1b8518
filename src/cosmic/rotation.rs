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

//! Mean Earth rotation model: the Earth rotation angle about the MJ2000 pole, with no
//! precession, nutation, or polar motion. This is the body fixed frame used for station
//! states, topocentric visibility, and the GPS position vector observable.

use crate::time::{Epoch, Unit};
use nalgebra::{Matrix3, Vector3};
use std::f64::consts::TAU;

use super::{EARTH_EQUATORIAL_RADIUS_KM, EARTH_FLATTENING};

/// Earth rotation angle at `epoch`, in radians (IERS linear model in UT days from J2000).
pub fn earth_rotation_angle_rad(epoch: Epoch) -> f64 {
    let j2000 = Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0);
    let tu = (epoch - j2000).to_unit(Unit::Day);
    let era = TAU * (0.779_057_273_264_0 + 1.002_737_811_911_354_48 * tu);
    era.rem_euclid(TAU)
}

/// Rotation about the third axis.
pub fn r3(angle_rad: f64) -> Matrix3<f64> {
    let (s, c) = angle_rad.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

/// Rotation about the second axis.
pub fn r2(angle_rad: f64) -> Matrix3<f64> {
    let (s, c) = angle_rad.sin_cos();
    Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c)
}

/// DCM from the MJ2000 frame to the Earth fixed frame at `epoch`.
pub fn inertial_to_ecef(epoch: Epoch) -> Matrix3<f64> {
    r3(earth_rotation_angle_rad(epoch))
}

/// DCM from the Earth fixed frame to the MJ2000 frame at `epoch`.
pub fn ecef_to_inertial(epoch: Epoch) -> Matrix3<f64> {
    inertial_to_ecef(epoch).transpose()
}

/// Earth fixed position of a point at the given geodetic coordinates, in km.
pub fn geodetic_to_ecef_km(latitude_deg: f64, longitude_deg: f64, height_km: f64) -> Vector3<f64> {
    let lat = latitude_deg.to_radians();
    let lon = longitude_deg.to_radians();
    let e2 = EARTH_FLATTENING * (2.0 - EARTH_FLATTENING);
    let (slat, clat) = lat.sin_cos();
    let (slon, clon) = lon.sin_cos();
    let n = EARTH_EQUATORIAL_RADIUS_KM / (1.0 - e2 * slat * slat).sqrt();
    Vector3::new(
        (n + height_km) * clat * clon,
        (n + height_km) * clat * slon,
        (n * (1.0 - e2) + height_km) * slat,
    )
}

/// DCM from the Earth fixed frame to the topocentric south-east-zenith frame of a site
/// at the given geodetic coordinates.
pub fn ecef_to_sez(latitude_deg: f64, longitude_deg: f64) -> Matrix3<f64> {
    r2(std::f64::consts::FRAC_PI_2 - latitude_deg.to_radians()) * r3(longitude_deg.to_radians())
}

#[cfg(test)]
mod rotation_ut {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn era_wraps_and_advances_at_sidereal_rate() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2023, 7, 14);
        let theta0 = earth_rotation_angle_rad(epoch);
        let theta1 = earth_rotation_angle_rad(epoch + Unit::Second * 60.0);
        let mut advance = theta1 - theta0;
        if advance < 0.0 {
            advance += TAU;
        }
        // One minute of Earth rotation is about 4.4e-3 rad.
        assert_abs_diff_eq!(advance, 60.0 * crate::cosmic::EARTH_ANGULAR_VELOCITY_RAD_S, epsilon = 1e-7);
        assert!((0.0..TAU).contains(&theta0));
    }

    #[test]
    fn geodetic_round_trip_on_the_equator() {
        let r = geodetic_to_ecef_km(0.0, 0.0, 0.0);
        assert_abs_diff_eq!(r.x, EARTH_EQUATORIAL_RADIUS_KM, epsilon = 1e-9);
        assert_abs_diff_eq!(r.y, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(r.z, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn sez_zenith_is_up() {
        // At the north pole, the zenith axis is +Z of the Earth fixed frame.
        let dcm = ecef_to_sez(90.0, 0.0);
        let up = dcm * Vector3::new(0.0, 0.0, 1.0);
        assert_abs_diff_eq!(up.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn inertial_ecef_dcms_are_transposes() {
        let epoch = Epoch::from_gregorian_utc_at_noon(2025, 1, 1);
        let fwd = inertial_to_ecef(epoch);
        let back = ecef_to_inertial(epoch);
        let eye = fwd * back;
        for i in 0..3 {
            for j in 0..3 {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(eye[(i, j)], expect, epsilon = 1e-14);
            }
        }
    }
}
