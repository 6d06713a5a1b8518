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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use moyer::cosmic::SPEED_OF_LIGHT_KM_S;
use moyer::prelude::*;
use nalgebra::Vector3;

fn epoch() -> Epoch {
    Epoch::from_gregorian_utc_at_noon(2024, 5, 17)
}

fn static_spacecraft(name: &str, pos_km: Vector3<f64>) -> SpacecraftNode {
    SpacecraftNode::new(
        name,
        Arc::new(LinearState {
            epoch: epoch(),
            pos_km,
            vel_km_s: Vector3::zeros(),
        }),
    )
}

/// For a static two body scenario with known separation, the light time converges to
/// distance over c within the stated tolerance, well inside the iteration cap.
#[test]
fn static_geometry_converges_to_d_over_c() {
    let sep_km = 384_400.0;
    let sc1 = static_spacecraft("Orbiter", Vector3::new(7000.0, 0.0, 0.0));
    let sc2 = static_spacecraft("Relay", Vector3::new(7000.0 + sep_km, 0.0, 0.0));

    let mut path = SignalPath::new(
        vec![Participant::Spacecraft(sc1), Participant::Spacecraft(sc2)],
        &[0, 1],
    )
    .unwrap();

    let eph = EarthCentered;
    assert!(path.model(epoch(), true, &eph).unwrap());

    let leg = &path.legs[0];
    // The epoch difference is limited by the epoch representation; the converged
    // geometry itself carries the sub-millimeter solution.
    let light_time = leg.data.light_time_s();
    assert_abs_diff_eq!(
        light_time,
        sep_km / SPEED_OF_LIGHT_KM_S,
        epsilon = 1.0e-8
    );
    assert_relative_eq!(
        leg.data.range_km() / SPEED_OF_LIGHT_KM_S,
        sep_km / SPEED_OF_LIGHT_KM_S,
        epsilon = 1.0e-12
    );
    // The receive node was held fixed at the anchor epoch.
    assert_eq!(leg.data.rx_epoch, epoch());
    assert_abs_diff_eq!(leg.data.range_km(), sep_km, epsilon = 1e-6);
    // A spacecraft to spacecraft leg is unconditionally feasible.
    assert!(leg.data.feasibility.feasible);
    assert_eq!(leg.data.feasibility.value_deg, -100.0);
}

/// A trajectory whose reported position jumps by hundreds of kilometers on every
/// lookup, so the fixed point iteration can never meet the tolerance.
struct JitteringState {
    calls: AtomicUsize,
}

impl Trajectory for JitteringState {
    fn state_at(&self, _epoch: Epoch) -> Result<(Vector3<f64>, Vector3<f64>), MeasurementError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        let offset = if n % 2 == 0 { 300.0 } else { -300.0 };
        Ok((
            Vector3::new(40_000.0 + offset, 0.0, 0.0),
            Vector3::zeros(),
        ))
    }
}

/// Oscillating geometry must terminate at the iteration cap without erroring: the loop
/// is bounded and best effort.
#[test]
fn pathological_geometry_stops_at_the_cap() {
    let anchor = epoch();
    let jitter = SpacecraftNode::new(
        "Jitterbug",
        Arc::new(JitteringState {
            calls: AtomicUsize::new(0),
        }),
    );
    let fixed = static_spacecraft("Watcher", Vector3::new(7000.0, 0.0, 0.0));

    let mut path = SignalPath::new(
        vec![
            Participant::Spacecraft(jitter),
            Participant::Spacecraft(fixed),
        ],
        &[0, 1],
    )
    .unwrap();

    let eph = EarthCentered;
    // Must not error nor loop forever; the caller proceeds with the last state.
    assert!(path.model(anchor, true, &eph).unwrap());
    let light_time = path.legs[0].data.light_time_s();
    // The last computed state is within the oscillation envelope.
    let d_nominal = (40_000.0 - 7000.0) / SPEED_OF_LIGHT_KM_S;
    assert!((light_time - d_nominal).abs() < 2.0e-3);
}

/// Ten iterations with a sub-millimeter tolerance also handles a moving transmitter:
/// the converged transmit epoch leads the receive epoch by the light time.
#[test]
fn moving_transmitter_epochs_are_consistent() {
    let rx = static_spacecraft("Chaser", Vector3::new(7000.0, 0.0, 0.0));
    let tx = SpacecraftNode::new(
        "Target",
        Arc::new(LinearState {
            epoch: epoch(),
            pos_km: Vector3::new(7000.0, 2000.0, 0.0),
            vel_km_s: Vector3::new(0.0, 0.0, 7.5),
        }),
    );

    let mut path = SignalPath::new(
        vec![Participant::Spacecraft(tx), Participant::Spacecraft(rx)],
        &[0, 1],
    )
    .unwrap();

    let eph = EarthCentered;
    assert!(path.model(epoch(), true, &eph).unwrap());

    let data = &path.legs[0].data;
    let implied = data.range_km() / SPEED_OF_LIGHT_KM_S;
    assert_abs_diff_eq!(data.light_time_s(), implied, epsilon = 1e-8);
    assert!(data.tx_epoch < data.rx_epoch);
}

/// With the relativistic correction enabled in a heliocentric geometry, the converged
/// delay exceeds the coordinate distance over c by the Shapiro term.
#[test]
fn relativity_lengthens_the_delay() {
    let au_km = 1.496e8;
    let sc1 = static_spacecraft("Inner", Vector3::new(au_km, 0.0, 0.0));
    let sc2 = static_spacecraft("Outer", Vector3::new(-1.6 * au_km, 10_000.0, 0.0));

    let mut with_rel = SignalPath::new(
        vec![
            Participant::Spacecraft(sc1.clone()),
            Participant::Spacecraft(sc2.clone()),
        ],
        &[0, 1],
    )
    .unwrap();
    with_rel.add_correction(CorrectionKind::Relativity);

    let mut without_rel = SignalPath::new(
        vec![Participant::Spacecraft(sc1), Participant::Spacecraft(sc2)],
        &[0, 1],
    )
    .unwrap();

    let eph = StaticEphemeris::new().with_state(SsBody::Sun, Vector3::zeros(), Vector3::zeros());
    with_rel.model(epoch(), true, &eph).unwrap();
    without_rel.model(epoch(), true, &eph).unwrap();

    let rel_delay = with_rel.legs[0].data.light_time_s().abs();
    let geo_delay = without_rel.legs[0].data.light_time_s().abs();
    assert!(with_rel.legs[0].relativity_correction_km() > 1.0);
    assert!(rel_delay > geo_delay);
}
