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
use moyer::cosmic::SPEED_OF_LIGHT_KM_S;
use moyer::msr::frequency_factor;
use moyer::prelude::*;
use nalgebra::Vector3;

const UPLINK_MHZ: f64 = 2090.659968;
const TURNAROUND: f64 = 240.0 / 221.0;

fn epoch() -> Epoch {
    Epoch::from_gregorian_utc_at_noon(2024, 5, 17)
}

/// A DSN style station on the equator with a full transmit and receive chain.
fn dsn_station() -> GroundStation {
    GroundStation::from_point("DSS-14", 0.0, 0.0, 0.0)
        .with_elevation_mask(5.0)
        .with_hardware(Hardware::Transmitter(
            Transmitter::new("DSS-14 Tx", UPLINK_MHZ).with_delay(1.0e-6),
        ))
        .with_hardware(Hardware::Receiver(
            Receiver::new("DSS-14 Rx", UPLINK_MHZ * TURNAROUND, 100.0).with_delay(2.0e-6),
        ))
}

/// A spacecraft parked `altitude_km` above the station's zenith at the test epoch,
/// moving at `radial_km_s` away from the Earth center.
fn spacecraft_above(station: &GroundStation, altitude_km: f64, radial_km_s: f64) -> SpacecraftNode {
    let (site, _) = station.state_at(epoch());
    let zenith = site / site.norm();
    SpacecraftNode::new(
        "Voyager Jr",
        Arc::new(LinearState {
            epoch: epoch(),
            pos_km: zenith * (site.norm() + altitude_km),
            vel_km_s: zenith * radial_km_s,
        }),
    )
    .with_hardware(Hardware::Transponder(
        Transponder::new("SC Transponder", "240/221")
            .with_input_band(UPLINK_MHZ, 100.0)
            .with_delay(1.0e-6),
    ))
}

#[test]
fn two_way_range_geometric_pass() {
    let station = dsn_station();
    let spacecraft = spacecraft_above(&station, 1000.0, 0.0);
    let mut model = DsnTwoWayRange::new(station, spacecraft).unwrap();

    let eph = EarthCentered;
    let msr = model
        .evaluate(epoch(), false, &eph, None)
        .unwrap()
        .clone();

    assert!(msr.is_feasible);
    assert_eq!(msr.event_count, 2);
    assert_abs_diff_eq!(msr.value[0], 1000.0, epsilon = 1e-9);
    assert_abs_diff_eq!(msr.feasibility_value, 90.0, epsilon = 1e-6);
}

#[test]
fn two_way_range_below_horizon_is_infeasible() {
    let station = dsn_station();
    let (site, _) = station.state_at(epoch());
    let nadir = -site / site.norm();
    let spacecraft = SpacecraftNode::new(
        "Antipode",
        Arc::new(LinearState {
            epoch: epoch(),
            pos_km: nadir * (site.norm() + 1000.0),
            vel_km_s: Vector3::zeros(),
        }),
    );
    let mut model = DsnTwoWayRange::new(station, spacecraft).unwrap();

    let eph = EarthCentered;
    let msr = model.evaluate(epoch(), false, &eph, None).unwrap();

    assert!(!msr.is_feasible);
    assert_eq!(msr.value[0], 0.0);
    assert_eq!(msr.event_count, 0);
    assert_eq!(msr.unfeasible_reason.code(), "B");
}

#[test]
fn two_way_range_full_matches_light_time_and_delays() {
    let _ = pretty_env_logger::try_init();

    let station = dsn_station();
    let spacecraft = spacecraft_above(&station, 1000.0, 0.0);
    let mut model = DsnTwoWayRange::new(station, spacecraft).unwrap();

    let eph = EarthCentered;
    let msr = model.evaluate(epoch(), true, &eph, None).unwrap();

    assert!(msr.is_feasible, "reason: {}", msr.unfeasible_reason);
    assert_eq!(msr.event_count, 2);
    assert_eq!(msr.uplink_band, Some(FrequencyBand::S));
    assert_eq!(msr.uplink_frequency_hz, UPLINK_MHZ * 1.0e6);

    // Two legs of about 1000 km plus the transmitter, transponder, and receiver
    // delays, converted to range units at half the S-band carrier.
    let travel_s = msr.value[0] / frequency_factor(UPLINK_MHZ * 1.0e6);
    let expected_s = 2.0 * 1000.0 / SPEED_OF_LIGHT_KM_S + 1.0e-6 + 1.0e-6 + 2.0e-6;
    assert_abs_diff_eq!(travel_s, expected_s, epsilon = 1.0e-8);
}

#[test]
fn two_way_range_media_correction_lengthens_the_path() {
    struct ConstantMedia;
    impl MediaCorrectionModel for ConstantMedia {
        fn correction(
            &self,
            _frequency_mhz: f64,
            _r_station_ssb_km: Vector3<f64>,
            _r_remote_ssb_km: Vector3<f64>,
            _epoch_station: Epoch,
            _epoch_remote: Epoch,
            _elevation_rad: f64,
        ) -> MediaCorrection {
            MediaCorrection {
                range_m: 100.0,
                angle_arcsec: 0.0,
                time_s: 100.0 / 299_792_458.0,
            }
        }

        fn name(&self) -> &str {
            "ConstantMedia"
        }
    }

    let station = dsn_station();
    let spacecraft = spacecraft_above(&station, 1000.0, 0.0);
    let eph = EarthCentered;

    let mut plain = DsnTwoWayRange::new(station.clone(), spacecraft.clone()).unwrap();
    let plain_value = plain.evaluate(epoch(), true, &eph, None).unwrap().value[0];

    let mut corrected = DsnTwoWayRange::new(station, spacecraft)
        .unwrap()
        .with_media(MediaSuite::none().with_troposphere(Arc::new(ConstantMedia)));
    let corrected_value = corrected.evaluate(epoch(), true, &eph, None).unwrap().value[0];

    // 100 m on each of the two legs.
    let expected_delta = frequency_factor(UPLINK_MHZ * 1.0e6) * 0.2 / SPEED_OF_LIGHT_KM_S;
    assert_abs_diff_eq!(corrected_value - plain_value, expected_delta, epsilon = 0.5);
}

#[test]
fn two_way_range_out_of_band_is_infeasible_not_an_error() {
    let station = GroundStation::from_point("DSS-14", 0.0, 0.0, 0.0)
        .with_hardware(Hardware::Transmitter(Transmitter::new(
            "DSS-14 Tx",
            UPLINK_MHZ,
        )))
        // A receiver whose passband cannot contain the turned around carrier.
        .with_hardware(Hardware::Receiver(Receiver::new("DSS-14 Rx", 100.0, 1.0)));
    let spacecraft = spacecraft_above(&station, 1000.0, 0.0);
    let mut model = DsnTwoWayRange::new(station, spacecraft).unwrap();

    let eph = EarthCentered;
    let msr = model.evaluate(epoch(), true, &eph, None).unwrap();
    assert!(!msr.is_feasible);
    assert_eq!(msr.unfeasible_reason.code(), "F");
    assert_eq!(msr.value[0], 0.0);
}

#[test]
fn two_way_range_ambiguous_hardware_is_a_configuration_error() {
    let station = dsn_station().with_hardware(Hardware::Transmitter(Transmitter::new(
        "Backup Tx",
        UPLINK_MHZ,
    )));
    let spacecraft = spacecraft_above(&station, 1000.0, 0.0);
    let mut model = DsnTwoWayRange::new(station, spacecraft).unwrap();

    let eph = EarthCentered;
    let err = model.evaluate(epoch(), true, &eph, None).unwrap_err();
    assert!(matches!(err, MeasurementError::AmbiguousHardware { .. }));
}

#[test]
fn two_way_range_hardware_free_fallback() {
    let station = GroundStation::from_point("Bare Station", 0.0, 0.0, 0.0);
    let (site, _) = station.state_at(epoch());
    let zenith = site / site.norm();
    let spacecraft = SpacecraftNode::new(
        "Bare Sat",
        Arc::new(LinearState {
            epoch: epoch(),
            pos_km: zenith * (site.norm() + 2000.0),
            vel_km_s: Vector3::zeros(),
        }),
    );
    let mut model = DsnTwoWayRange::new(station, spacecraft).unwrap();

    let eph = EarthCentered;
    let msr = model.evaluate(epoch(), true, &eph, None).unwrap();

    assert!(msr.is_feasible);
    // No hardware: geometric delays only, at the model's default carrier.
    let travel_s = msr.value[0] / frequency_factor(msr.uplink_frequency_hz);
    assert_abs_diff_eq!(
        travel_s,
        2.0 * 2000.0 / SPEED_OF_LIGHT_KM_S,
        epsilon = 1.0e-8
    );
}

#[test]
fn two_way_doppler_of_a_receding_spacecraft() {
    let _ = pretty_env_logger::try_init();

    let station = dsn_station();
    let spacecraft = spacecraft_above(&station, 1000.0, 2.0);
    let mut model = DsnTwoWayDoppler::new(station, spacecraft).unwrap();

    let eph = EarthCentered;

    // Geometric pass: Doppler is undefined from a single snapshot.
    let msr = model.evaluate(epoch(), false, &eph, None).unwrap();
    assert!(msr.is_feasible);
    assert_eq!(msr.value[0], 0.0);
    assert_eq!(msr.event_count, 4);

    // Full pass: the round trip time grows by 2 * rdot / c each second, scaled by the
    // turned around carrier.
    let msr = model.evaluate(epoch(), true, &eph, None).unwrap();
    assert!(msr.is_feasible, "reason: {}", msr.unfeasible_reason);
    assert_eq!(msr.event_count, 4);
    let predicted = TURNAROUND * UPLINK_MHZ * 1.0e6 * (2.0 * 2.0 / SPEED_OF_LIGHT_KM_S);
    assert_relative_eq!(msr.value[0], predicted, max_relative = 0.05);
    assert_eq!(msr.doppler_count_interval_s, 1.0);
}

#[test]
fn doppler_turnaround_defaults_to_band_when_unset() {
    let station = dsn_station();
    // A transponder whose ratio string evaluates to exactly one, i.e. unset.
    let (site, _) = station.state_at(epoch());
    let zenith = site / site.norm();
    let spacecraft = SpacecraftNode::new(
        "Unset Ratio Sat",
        Arc::new(LinearState {
            epoch: epoch(),
            pos_km: zenith * (site.norm() + 1000.0),
            vel_km_s: zenith * 2.0,
        }),
    )
    .with_hardware(Hardware::Transponder(
        Transponder::new("SC Transponder", "1.0").with_input_band(UPLINK_MHZ, 100.0),
    ));

    let mut model = DsnTwoWayDoppler::new(station, spacecraft).unwrap();
    let eph = EarthCentered;
    model.evaluate(epoch(), true, &eph, None).unwrap();
    assert_relative_eq!(model.averaging().turnaround, 240.0 / 221.0, epsilon = 1e-12);
}

#[test]
fn range_derivatives_project_on_the_line_of_sight() {
    let station = dsn_station();
    let spacecraft = spacecraft_above(&station, 1000.0, 0.0);
    let (site, _) = station.state_at(epoch());
    let zenith = site / site.norm();

    let mut model = DsnTwoWayRange::new(station, spacecraft).unwrap();
    let eph = EarthCentered;
    model.evaluate(epoch(), true, &eph, None).unwrap();

    // Bias always contributes a unit derivative.
    let bias = model
        .calculate_measurement_derivatives("Voyager Jr", DerivativeParam::Bias)
        .unwrap();
    assert_eq!(bias, vec![vec![1.0]]);

    // Both legs project onto the (radial) line of sight with the same sign, scaled by
    // the range unit factor over c.
    let pos = model
        .calculate_measurement_derivatives("Voyager Jr", DerivativeParam::Position)
        .unwrap();
    let deriv = Vector3::new(pos[0][0], pos[0][1], pos[0][2]);
    let expected_mag = 2.0 * frequency_factor(UPLINK_MHZ * 1.0e6) / SPEED_OF_LIGHT_KM_S;
    assert_relative_eq!(deriv.norm(), expected_mag, max_relative = 1e-3);
    assert!(deriv.dot(&zenith) / deriv.norm() > 0.999);

    // A parameter on an unknown object is independent of this observable.
    let other = model
        .calculate_measurement_derivatives("Some Other Craft", DerivativeParam::Position)
        .unwrap();
    assert_eq!(other, vec![vec![0.0, 0.0, 0.0]]);

    // Station state partials are not supported.
    assert!(model
        .calculate_measurement_derivatives("DSS-14", DerivativeParam::Position)
        .is_err());
}

#[test]
fn doppler_derivatives_difference_the_two_paths() {
    let station = dsn_station();
    let spacecraft = spacecraft_above(&station, 1000.0, 2.0);
    let mut model = DsnTwoWayDoppler::new(station, spacecraft).unwrap();
    let eph = EarthCentered;
    model.evaluate(epoch(), true, &eph, None).unwrap();

    let bias = model
        .calculate_measurement_derivatives("Voyager Jr", DerivativeParam::Bias)
        .unwrap();
    assert_eq!(bias, vec![vec![1.0]]);

    // With an identity STM the two paths nearly cancel: the count rate sensitivity to
    // position is orders of magnitude below the per path projection scale.
    let pos = model
        .calculate_measurement_derivatives("Voyager Jr", DerivativeParam::Position)
        .unwrap();
    let deriv = Vector3::new(pos[0][0], pos[0][1], pos[0][2]);
    let per_path_scale =
        TURNAROUND * UPLINK_MHZ * 1.0e6 * 2.0 / SPEED_OF_LIGHT_KM_S;
    assert!(deriv.norm() < per_path_scale * 1.0e-2);
}

#[test]
fn path_bias_derivative_only_at_endpoints() {
    let station = dsn_station();
    let spacecraft = spacecraft_above(&station, 1000.0, 0.0);
    let mut model = DsnTwoWayRange::new(station, spacecraft).unwrap();
    let eph = EarthCentered;
    model.evaluate(epoch(), true, &eph, None).unwrap();

    // The station owns both endpoints of the two way path; the spacecraft owns none.
    let path = model.path();
    let at_station = path
        .model_signal_derivative(0, DerivativeParam::Bias, "DSS-14", epoch())
        .unwrap();
    assert_eq!(at_station, vec![1.0]);
    let at_spacecraft = path
        .model_signal_derivative(0, DerivativeParam::Bias, "Voyager Jr", epoch())
        .unwrap();
    assert_eq!(at_spacecraft, vec![0.0]);

    // The chain walk sums both legs the spacecraft appears in.
    let chain = path
        .model_signal_derivative(0, DerivativeParam::CartesianState, "Voyager Jr", epoch())
        .unwrap();
    assert_eq!(chain.len(), 6);
    let pos_part = Vector3::new(chain[0], chain[1], chain[2]);
    assert_relative_eq!(pos_part.norm(), 2.0, max_relative = 1e-3);
}

#[test]
fn measurement_before_evaluation_is_an_error() {
    let station = dsn_station();
    let spacecraft = spacecraft_above(&station, 1000.0, 0.0);
    let model = DsnTwoWayRange::new(station, spacecraft).unwrap();
    assert!(matches!(
        model.measurement(),
        Err(MeasurementError::NotYetEvaluated { .. })
    ));
}
