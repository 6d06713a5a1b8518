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
use snafu::prelude::Snafu;

/// Configuration class failures of a measurement model.
///
/// Infeasibility (elevation below the station mask, a frequency outside a passband) is
/// _not_ an error: it is carried in the measurement data with a reason code, and the
/// estimator or simulator is expected to skip that measurement.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MeasurementError {
    #[snafu(display("participant {participant} does not have a {kind} to {action}"))]
    MissingHardware {
        participant: String,
        kind: &'static str,
        action: &'static str,
    },
    #[snafu(display("participant {participant} has more than one {kind}"))]
    AmbiguousHardware {
        participant: String,
        kind: &'static str,
    },
    #[snafu(display("{device} has no error model of kind {kind}"))]
    MissingErrorModel { device: String, kind: String },
    #[snafu(display("delay index {which} is invalid for {device}"))]
    InvalidDelayIndex { which: usize, device: String },
    #[snafu(display("signal index {which} is invalid for {device}"))]
    InvalidSignalIndex { which: usize, device: String },
    #[snafu(display("turnaround ratio {ratio} of {device} is not a number or N/D fraction"))]
    InvalidTurnaroundRatio { ratio: String, device: String },
    #[snafu(display("{observable} requires {need} participants in the order {order}"))]
    ParticipantCount {
        observable: &'static str,
        need: usize,
        order: &'static str,
    },
    #[snafu(display("signal leg {leg} references no {role} participant"))]
    DanglingLeg { leg: usize, role: &'static str },
    #[snafu(display("no trajectory data for {participant} at {epoch}"))]
    OutsideTrajectory { participant: String, epoch: Epoch },
    #[snafu(display("state transition matrix of {participant} is singular at {epoch}"))]
    SingularStm { participant: String, epoch: Epoch },
    #[snafu(display("derivatives with respect to the state of {participant} are not supported"))]
    UnsupportedDerivative { participant: String },
    #[snafu(display("measurement of {observable} was requested before it was evaluated"))]
    NotYetEvaluated { observable: &'static str },
}
