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

use serde_derive::{Deserialize, Serialize};

use crate::errors::InvalidDelayIndexSnafu;
use crate::MeasurementError;

/// A passive antenna: a pure propagation delay in the chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Antenna {
    pub name: String,
    pub delay_s: f64,
}

impl Antenna {
    pub fn new<S: ToString>(name: S) -> Self {
        Self {
            name: name.to_string(),
            delay_s: 0.0,
        }
    }

    pub fn with_delay(mut self, delay_s: f64) -> Self {
        self.delay_s = delay_s;
        self
    }

    pub fn delay(&self, which: usize) -> Result<f64, MeasurementError> {
        snafu::ensure!(
            which == 0,
            InvalidDelayIndexSnafu {
                which,
                device: self.name.clone()
            }
        );
        Ok(self.delay_s)
    }

    pub fn set_delay(&mut self, delay_s: f64, which: usize) -> Result<(), MeasurementError> {
        snafu::ensure!(
            which == 0,
            InvalidDelayIndexSnafu {
                which,
                device: self.name.clone()
            }
        );
        self.delay_s = delay_s;
        Ok(())
    }
}
