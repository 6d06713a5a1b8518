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

use approx::assert_relative_eq;
use moyer::prelude::*;
use rstest::rstest;

#[rstest]
#[case("240/221", 240.0 / 221.0)]
#[case("880/749", 880.0 / 749.0)]
#[case("1.5", 1.5)]
#[case("2", 2.0)]
fn turnaround_ratio_parsing(#[case] ratio: &str, #[case] expected: f64) {
    let tp = Transponder::new("SC Transponder", ratio);
    assert_relative_eq!(tp.turnaround_ratio().unwrap(), expected, epsilon = 1e-15);
}

#[test]
fn turnaround_ratio_malformed_is_a_configuration_error() {
    for bad in ["240/", "/221", "fast", "240-221", ""] {
        let tp = Transponder::new("SC Transponder", bad);
        assert!(
            tp.turnaround_ratio().is_err(),
            "ratio {bad:?} should not parse"
        );
    }
}

/// The chain scenario: a 1500 MHz transmitter feeding a 240/221 transponder whose input
/// passband is a zero width window centered on 1500 MHz.
#[test]
fn transmitter_feeds_transponder() {
    let transmitter = Transmitter::new("Uplink Tx", 1500.0);
    let mut transponder =
        Transponder::new("SC Transponder", "240/221").with_input_band(1500.0, 0.0);

    transponder.set_signal(transmitter.signal(), 0).unwrap();

    assert_relative_eq!(
        transponder.signal(1).unwrap().value(),
        1500.0 * 240.0 / 221.0,
        epsilon = 1e-9
    );
    assert_relative_eq!(transponder.signal(1).unwrap().value(), 1628.959, epsilon = 1e-3);
    // The input lands exactly on the passband center, which is inclusive.
    assert!(transponder.is_feasible(0).unwrap());

    // Retuning with the same input is idempotent.
    let before = transponder.signal(1).unwrap().value();
    transponder.set_signal(transmitter.signal(), 0).unwrap();
    assert_eq!(transponder.signal(1).unwrap().value(), before);
}

#[test]
fn receiver_band_edges_are_feasible() {
    let mut rx = Receiver::new("Downlink Rx", 2200.0, 40.0);
    for (freq, expected) in [
        (2180.0, true),
        (2220.0, true),
        (2200.0, true),
        (2179.999, false),
        (2220.001, false),
    ] {
        rx.set_signal(Signal::new(freq));
        assert_eq!(rx.is_feasible(), expected, "at {freq} MHz");
    }
}

#[test]
fn delay_indices_are_device_specific() {
    let tx = Transmitter::new("Tx", 2100.0).with_delay(1e-6);
    assert!(tx.delay(0).is_ok());
    assert!(tx.delay(1).is_err());

    let rx = Receiver::new("Rx", 2200.0, 10.0).with_delay(2e-6);
    assert!(rx.delay(0).is_ok());
    assert!(rx.delay(2).is_err());

    let ant = Antenna::new("Dish").with_delay(5e-8);
    assert!(ant.delay(0).is_ok());
    assert!(ant.delay(1).is_err());

    let tp = Transponder::new("Tp", "240/221").with_delay(1e-6);
    assert!(tp.delay(0).is_err());
    assert!(tp.delay(1).is_ok());
    assert!(tp.delay(2).is_ok());
    assert!(tp.delay(3).is_err());
}
