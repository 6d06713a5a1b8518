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

/// The carrier state of a signal as it moves through the RF chain.
///
/// A signal has no identity of its own: it is owned by exactly one hardware element and
/// carries a single frequency value, in MHz. No validation is performed on set.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    value_mhz: f64,
}

impl Signal {
    pub fn new(value_mhz: f64) -> Self {
        Self { value_mhz }
    }

    /// Current frequency, in MHz.
    pub fn value(&self) -> f64 {
        self.value_mhz
    }

    pub fn set_value(&mut self, value_mhz: f64) {
        self.value_mhz = value_mhz;
    }
}
