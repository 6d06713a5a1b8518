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

//! Measurement partials through the leg chain.
//!
//! The total sensitivity of a range or Doppler observable to a participant state
//! parameter is the sum of the per leg geometric partials along every leg that
//! participant appears in, each projected through the state transition mapping back to
//! the measurement epoch.

use super::SignalPath;
use crate::errors::{SingularStmSnafu, UnsupportedDerivativeSnafu};
use crate::participants::Participant;
use crate::time::Epoch;
use crate::MeasurementError;
use nalgebra::{Matrix6, Vector6};

/// The solve-for parameter a derivative is taken with respect to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DerivativeParam {
    Position,
    Velocity,
    CartesianState,
    Bias,
}

impl DerivativeParam {
    /// Number of scalar entries of the derivative row.
    pub fn size(&self) -> usize {
        match self {
            Self::Position | Self::Velocity => 3,
            Self::CartesianState => 6,
            Self::Bias => 1,
        }
    }
}

impl SignalPath {
    /// Geometric partial of one leg's range with respect to the state of participant
    /// `wrt`, projected through `Phi(leg epoch) * Phi(measurement epoch)^-1`.
    ///
    /// Position entries land in rows 0..3. Velocity entries land in rows 3..6 when the
    /// position is also requested, rows 0..3 otherwise. Transmit side partials carry a
    /// minus sign since the range vector points away from the transmitter.
    pub(crate) fn leg_range_partial(
        &self,
        leg_idx: usize,
        wrt: usize,
        stm_inv: &Matrix6<f64>,
        wrt_r: bool,
        wrt_v: bool,
    ) -> Result<Vector6<f64>, MeasurementError> {
        let leg = &self.legs[leg_idx];
        let spacecraft = match &self.participants[wrt] {
            Participant::Spacecraft(sc) => sc,
            Participant::Station(gs) => {
                return UnsupportedDerivativeSnafu {
                    participant: gs.name.clone(),
                }
                .fail()
            }
        };

        let wrt_is_tx = wrt == leg.tx;
        let epoch = if wrt_is_tx {
            leg.data.tx_epoch
        } else {
            leg.data.rx_epoch
        };
        let sign = if wrt_is_tx { -1.0 } else { 1.0 };

        let phi = spacecraft.trajectory.stm_at(epoch) * stm_inv;
        let unit_range = leg.data.range_vec_inertial_km / leg.data.range_km();

        let mut deriv = Vector6::zeros();
        if wrt_r {
            let block = phi.fixed_view::<3, 3>(0, 0).into_owned();
            let row = (unit_range.transpose() * block).transpose() * sign;
            deriv.fixed_rows_mut::<3>(0).copy_from(&row);
        }
        if wrt_v {
            let block = phi.fixed_view::<3, 3>(0, 3).into_owned();
            let row = (unit_range.transpose() * block).transpose() * sign;
            let offset = if wrt_r { 3 } else { 0 };
            deriv.fixed_rows_mut::<3>(offset).copy_from(&row);
        }

        Ok(deriv)
    }

    /// Inverse state transition matrix of a spacecraft participant at the measurement
    /// epoch.
    pub(crate) fn inverse_stm(
        &self,
        wrt: usize,
        epoch: Epoch,
    ) -> Result<Matrix6<f64>, MeasurementError> {
        match &self.participants[wrt] {
            Participant::Spacecraft(sc) => {
                sc.trajectory.stm_at(epoch).try_inverse().ok_or_else(|| {
                    SingularStmSnafu {
                        participant: sc.name.clone(),
                        epoch,
                    }
                    .build()
                })
            }
            Participant::Station(gs) => UnsupportedDerivativeSnafu {
                participant: gs.name.clone(),
            }
            .fail(),
        }
    }

    /// Walks the chain from `start_leg` to the final leg, accumulating the partial of
    /// the total path range with respect to `param` on the named participant. Each leg
    /// the participant appears in adds its own geometric partial; a bias parameter
    /// contributes a unit derivative only at a path endpoint owned by that participant.
    pub fn model_signal_derivative(
        &self,
        start_leg: usize,
        param: DerivativeParam,
        participant: &str,
        msr_epoch: Epoch,
    ) -> Result<Vec<f64>, MeasurementError> {
        let wrt = match self
            .participants
            .iter()
            .position(|p| p.name() == participant)
        {
            Some(idx) => idx,
            None => return Ok(vec![0.0; param.size()]),
        };

        if param == DerivativeParam::Bias {
            let first = &self.legs[0];
            let last = &self.legs[self.legs.len() - 1];
            let at_endpoint = first.tx == wrt || last.rx == wrt;
            return Ok(vec![if at_endpoint { 1.0 } else { 0.0 }]);
        }

        let (wrt_r, wrt_v) = match param {
            DerivativeParam::Position => (true, false),
            DerivativeParam::Velocity => (false, true),
            DerivativeParam::CartesianState => (true, true),
            DerivativeParam::Bias => unreachable!(),
        };

        let stm_inv = self.inverse_stm(wrt, msr_epoch)?;
        let size = param.size();
        let mut total = vec![0.0; size];
        for leg_idx in start_leg..self.legs.len() {
            let leg = &self.legs[leg_idx];
            if leg.tx != wrt && leg.rx != wrt {
                continue;
            }
            let partial = self.leg_range_partial(leg_idx, wrt, &stm_inv, wrt_r, wrt_v)?;
            for (i, slot) in total.iter_mut().enumerate() {
                *slot += partial[i];
            }
        }

        Ok(total)
    }
}
