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

//! Troposphere and ionosphere correction contracts.
//!
//! The correction model internals (Hopfield-Saastamoinen, Marini, IRI) live outside of
//! this crate; a signal leg consumes them through the [MediaCorrectionModel] trait. A leg
//! without a model attached uses a zero correction and flags the ledger entry unused.

use crate::time::Epoch;
use nalgebra::Vector3;
use std::fmt;
use std::sync::Arc;

/// The three components of a media correction.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MediaCorrection {
    /// Range correction, in meters.
    pub range_m: f64,
    /// Elevation angle correction, in arcseconds.
    pub angle_arcsec: f64,
    /// Time delay correction, in seconds.
    pub time_s: f64,
}

/// A troposphere or ionosphere correction model, driven by the signal frequency, the
/// station and remote participant barycentric positions, and the epochs at both ends of
/// the leg.
pub trait MediaCorrectionModel: Send + Sync {
    fn correction(
        &self,
        frequency_mhz: f64,
        r_station_ssb_km: Vector3<f64>,
        r_remote_ssb_km: Vector3<f64>,
        epoch_station: Epoch,
        epoch_remote: Epoch,
        elevation_rad: f64,
    ) -> MediaCorrection;

    /// Model name, reported in the correction ledger and logs.
    fn name(&self) -> &str;
}

/// The media models attached to one signal leg.
#[derive(Clone, Default)]
pub struct MediaSuite {
    pub troposphere: Option<Arc<dyn MediaCorrectionModel>>,
    pub ionosphere: Option<Arc<dyn MediaCorrectionModel>>,
}

impl MediaSuite {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_troposphere(mut self, model: Arc<dyn MediaCorrectionModel>) -> Self {
        self.troposphere = Some(model);
        self
    }

    pub fn with_ionosphere(mut self, model: Arc<dyn MediaCorrectionModel>) -> Self {
        self.ionosphere = Some(model);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.troposphere.is_none() && self.ionosphere.is_none()
    }
}

impl fmt::Debug for MediaSuite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "MediaSuite {{ troposphere: {:?}, ionosphere: {:?} }}",
            self.troposphere.as_ref().map(|m| m.name().to_string()),
            self.ionosphere.as_ref().map(|m| m.name().to_string()),
        )
    }
}
