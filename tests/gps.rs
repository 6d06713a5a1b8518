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

use std::sync::Arc;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use moyer::prelude::*;
use nalgebra::Vector3;
use rand_pcg::Pcg64Mcg;

fn epoch() -> Epoch {
    Epoch::from_gregorian_utc(2024, 8, 20, 6, 30, 0, 0)
}

fn gps_spacecraft(noise_sigma: f64, bias: f64) -> SpacecraftNode {
    SpacecraftNode::new(
        "LEO Sat",
        Arc::new(LinearState {
            epoch: epoch(),
            pos_km: Vector3::new(6800.0, 1200.0, -300.0),
            vel_km_s: Vector3::new(-1.2, 7.1, 0.4),
        }),
    )
    .with_hardware(Hardware::Receiver(
        Receiver::new("GPS Rx", 1575.42, 20.0)
            .with_id("RX-1")
            .with_error_model(ErrorModel::new("GPS_PosVec", noise_sigma, bias)),
    ))
}

#[test]
fn noise_free_measurement_is_bit_identical() {
    let mut adapter = GpsPosVecAdapter::new(gps_spacecraft(0.0, 0.0), "GPS Rx");

    let eph = EarthCentered;
    let first = adapter
        .calculate_measurement(epoch(), &eph, None)
        .unwrap()
        .value
        .clone();
    let second = adapter
        .calculate_measurement(epoch(), &eph, None)
        .unwrap()
        .value
        .clone();

    assert_eq!(first, second);

    // The rotation into the Earth fixed frame preserves the norm.
    let truth = Vector3::new(6800.0, 1200.0, -300.0);
    let value = Vector3::new(first[0], first[1], first[2]);
    assert_relative_eq!(value.norm(), truth.norm(), epsilon = 1e-9);
}

#[test]
fn zero_sigma_covariance_falls_back_to_unity() {
    let mut adapter = GpsPosVecAdapter::new(gps_spacecraft(0.0, 0.0), "GPS Rx");
    let eph = EarthCentered;
    let msr = adapter.calculate_measurement(epoch(), &eph, None).unwrap();

    for i in 0..3 {
        for j in 0..3 {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_eq!(msr.covariance[(i, j)], expected);
        }
    }
    assert_eq!(msr.sensor_ids, vec!["RX-1".to_string()]);
    assert!(msr.is_feasible);
}

#[test]
fn nonzero_sigma_squares_onto_the_diagonal() {
    let mut adapter = GpsPosVecAdapter::new(gps_spacecraft(0.010, 0.0), "GPS Rx");
    let eph = EarthCentered;
    let msr = adapter.calculate_measurement(epoch(), &eph, None).unwrap();

    for i in 0..3 {
        assert_abs_diff_eq!(msr.covariance[(i, i)], 1.0e-4, epsilon = 1e-18);
    }
}

#[test]
fn bias_lands_after_noise() {
    let eph = EarthCentered;

    let mut plain = GpsPosVecAdapter::new(gps_spacecraft(0.0, 0.25), "GPS Rx");
    let truth = plain
        .calculate_measurement(epoch(), &eph, None)
        .unwrap()
        .value
        .clone();

    let mut biased = GpsPosVecAdapter::new(gps_spacecraft(0.0, 0.25), "GPS Rx").with_bias();
    let value = biased
        .calculate_measurement(epoch(), &eph, None)
        .unwrap()
        .value
        .clone();

    for i in 0..3 {
        assert_abs_diff_eq!(value[i] - truth[i], 0.25, epsilon = 1e-12);
    }

    // With a zero sigma, drawing noise cannot perturb the value either.
    let mut rng = Pcg64Mcg::new(7);
    let mut noisy = GpsPosVecAdapter::new(gps_spacecraft(0.0, 0.25), "GPS Rx").with_noise();
    let noisy_value = noisy
        .calculate_measurement(epoch(), &eph, Some(&mut rng))
        .unwrap()
        .value
        .clone();
    assert_eq!(noisy_value, truth);
}

#[test]
fn missing_receiver_or_error_model_is_a_configuration_error() {
    let eph = EarthCentered;

    let bare = SpacecraftNode::new(
        "Bare Sat",
        Arc::new(LinearState {
            epoch: epoch(),
            pos_km: Vector3::new(7000.0, 0.0, 0.0),
            vel_km_s: Vector3::zeros(),
        }),
    );
    let mut adapter = GpsPosVecAdapter::new(bare, "GPS Rx");
    assert!(matches!(
        adapter.calculate_measurement(epoch(), &eph, None),
        Err(MeasurementError::MissingHardware { .. })
    ));

    let no_model = SpacecraftNode::new(
        "No Model Sat",
        Arc::new(LinearState {
            epoch: epoch(),
            pos_km: Vector3::new(7000.0, 0.0, 0.0),
            vel_km_s: Vector3::zeros(),
        }),
    )
    .with_hardware(Hardware::Receiver(Receiver::new("GPS Rx", 1575.42, 20.0)));
    let mut adapter = GpsPosVecAdapter::new(no_model, "GPS Rx");
    assert!(matches!(
        adapter.calculate_measurement(epoch(), &eph, None),
        Err(MeasurementError::MissingErrorModel { .. })
    ));
}
