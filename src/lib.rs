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

/*! # moyer

Radiometric tracking measurement modeling for deep space and near Earth navigation:
the signal chain from a transmitting ground station through a spacecraft transponder
and back, with light time iteration, relativistic and timescale corrections, media
correction hooks, and the measurement partials an orbit determination filter needs.

Named after the JPL monograph by T. D. Moyer which defines the formulation of the
Deep Space Network tracking observables modeled here.
*/

/// Solar system bodies, physical constants, ephemeris contracts, and the mean Earth rotation model.
pub mod cosmic;

/// The RF hardware chain: transmitters, receivers, transponders, and antennas.
pub mod hardware;

/// Tracking participants: ground stations and spacecraft nodes.
pub mod participants;

/// Troposphere and ionosphere correction contracts.
pub mod media;

/// Signal legs and paths: the light time iteration and correction engine.
pub mod signal;

/// Measurement models: DSN two-way range and Doppler, GPS position vectors.
pub mod msr;

/// YAML configuration loading.
pub mod io;

mod errors;
/// Moyer will (almost) never panic and functions which may fail will return an error.
pub use self::errors::MeasurementError;

#[macro_use]
extern crate log;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use nalgebra::base::*;
}

#[allow(unused_imports)]
pub mod prelude {
    pub use crate::cosmic::{EarthCentered, EphemerisSource, SsBody, StaticEphemeris};
    pub use crate::hardware::{
        Antenna, ErrorModel, FrequencyBand, Hardware, Receiver, Signal, Transmitter, Transponder,
    };
    pub use crate::media::{MediaCorrection, MediaCorrectionModel, MediaSuite};
    pub use crate::msr::{
        AveragedDoppler, DsnTwoWayDoppler, DsnTwoWayRange, GpsPosVecAdapter, MeasurementData,
        MeasurementType,
    };
    pub use crate::participants::{
        GroundStation, LinearState, Participant, SpacecraftNode, Trajectory,
    };
    pub use crate::signal::{
        CorrectionKind, DerivativeParam, FeasibilityReason, SignalData, SignalLeg, SignalPath,
    };
    pub use crate::MeasurementError;

    pub use crate::time::{Duration, Epoch, TimeUnits, Unit};
}
