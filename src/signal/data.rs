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
use nalgebra::Vector3;
use std::fmt;

/// A named correction tracked in a signal leg's ledger.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CorrectionKind {
    Troposphere,
    TroposphereElev,
    Ionosphere,
    IonosphereElev,
    Relativity,
    EtTai,
}

impl fmt::Display for CorrectionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Troposphere => write!(f, "Troposphere"),
            Self::TroposphereElev => write!(f, "Troposphere-Elev"),
            Self::Ionosphere => write!(f, "Ionosphere"),
            Self::IonosphereElev => write!(f, "Ionosphere-Elev"),
            Self::Relativity => write!(f, "Relativity"),
            Self::EtTai => write!(f, "ET-TAI"),
        }
    }
}

/// One entry of the correction ledger. Range corrections are in km, elevation
/// corrections in radians.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Correction {
    pub kind: CorrectionKind,
    pub value: f64,
    pub enabled: bool,
}

/// Why a measurement or leg is infeasible.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FeasibilityReason {
    /// Nominal: the signal is observable.
    Normal,
    /// The leg is below the local horizon.
    Blocked,
    /// The uplink leg is below the mask.
    BlockedUplink,
    /// The downlink leg is below the mask.
    BlockedDownlink,
    /// The start path's uplink leg is below the mask.
    BlockedUplinkStart,
    /// The start path's downlink leg is below the mask.
    BlockedDownlinkStart,
    /// The end path's uplink leg is below the mask.
    BlockedUplinkEnd,
    /// The end path's downlink leg is below the mask.
    BlockedDownlinkEnd,
    /// A chained frequency fell outside a device passband.
    OutOfBand,
}

impl FeasibilityReason {
    /// The short code reported with observation records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Normal => "N",
            Self::Blocked => "B",
            Self::BlockedUplink => "B1",
            Self::BlockedDownlink => "B2",
            Self::BlockedUplinkStart => "B1S",
            Self::BlockedDownlinkStart => "B2S",
            Self::BlockedUplinkEnd => "B1E",
            Self::BlockedDownlinkEnd => "B2E",
            Self::OutOfBand => "F",
        }
    }
}

impl fmt::Display for FeasibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Feasibility of one signal leg.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Feasibility {
    pub feasible: bool,
    pub reason: FeasibilityReason,
    /// Elevation angle at the checked station, in degrees; -100 when no station is
    /// involved.
    pub value_deg: f64,
}

impl Default for Feasibility {
    fn default() -> Self {
        Self {
            feasible: true,
            reason: FeasibilityReason::Normal,
            value_deg: -100.0,
        }
    }
}

/// The mutable state threaded through one hop of a signal path during an evaluation.
///
/// Positions and velocities are in each participant's central body MJ2000 frame, with
/// the origin states locating those central bodies with respect to the solar system
/// barycenter. Nothing here is persisted beyond one measurement evaluation.
#[derive(Clone, Debug)]
pub struct SignalData {
    /// Epoch at which the transmit node radiates.
    pub tx_epoch: Epoch,
    /// Epoch at which the receive node receives.
    pub rx_epoch: Epoch,
    pub tx_pos_km: Vector3<f64>,
    pub tx_vel_km_s: Vector3<f64>,
    pub rx_pos_km: Vector3<f64>,
    pub rx_vel_km_s: Vector3<f64>,
    /// Transmit node's frame origin with respect to the SSB at the transmit epoch.
    pub tx_origin_pos_ssb_km: Vector3<f64>,
    pub tx_origin_vel_ssb_km_s: Vector3<f64>,
    /// Receive node's frame origin with respect to the SSB at the receive epoch.
    pub rx_origin_pos_ssb_km: Vector3<f64>,
    pub rx_origin_vel_ssb_km_s: Vector3<f64>,
    /// Range vector from transmit to receive node, barycentric inertial axes, in km.
    pub range_vec_inertial_km: Vector3<f64>,
    pub range_rate_vec_inertial_km_s: Vector3<f64>,
    /// Range vector in the observing station's topocentric SEZ frame.
    pub range_vec_obs_km: Vector3<f64>,
    pub range_rate_vec_obs_km_s: Vector3<f64>,
    pub corrections: Vec<Correction>,
    pub feasibility: Feasibility,
    /// Transmit side delay: the full device delay at a path endpoint, half the
    /// transponder delay at an intermediate node.
    pub tx_delay_s: f64,
    /// Receive side delay, with the same endpoint/intermediate convention.
    pub rx_delay_s: f64,
    /// Carrier frequency arriving from the upstream leg, in MHz; None on the first leg.
    pub arrive_freq_mhz: Option<f64>,
    /// Carrier frequency radiated by the transmit node, in MHz.
    pub transmit_freq_mhz: f64,
    /// Doppler shifted frequency seen at the receive node, in MHz.
    pub receive_freq_mhz: f64,
}

impl SignalData {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            tx_epoch: epoch,
            rx_epoch: epoch,
            tx_pos_km: Vector3::zeros(),
            tx_vel_km_s: Vector3::zeros(),
            rx_pos_km: Vector3::zeros(),
            rx_vel_km_s: Vector3::zeros(),
            tx_origin_pos_ssb_km: Vector3::zeros(),
            tx_origin_vel_ssb_km_s: Vector3::zeros(),
            rx_origin_pos_ssb_km: Vector3::zeros(),
            rx_origin_vel_ssb_km_s: Vector3::zeros(),
            range_vec_inertial_km: Vector3::zeros(),
            range_rate_vec_inertial_km_s: Vector3::zeros(),
            range_vec_obs_km: Vector3::zeros(),
            range_rate_vec_obs_km_s: Vector3::zeros(),
            corrections: Vec::new(),
            feasibility: Feasibility::default(),
            tx_delay_s: 0.0,
            rx_delay_s: 0.0,
            arrive_freq_mhz: None,
            transmit_freq_mhz: 0.0,
            receive_freq_mhz: 0.0,
        }
    }

    /// Transmit node position with respect to the SSB, in km.
    pub fn tx_pos_ssb_km(&self) -> Vector3<f64> {
        self.tx_pos_km + self.tx_origin_pos_ssb_km
    }

    /// Receive node position with respect to the SSB, in km.
    pub fn rx_pos_ssb_km(&self) -> Vector3<f64> {
        self.rx_pos_km + self.rx_origin_pos_ssb_km
    }

    pub fn tx_vel_ssb_km_s(&self) -> Vector3<f64> {
        self.tx_vel_km_s + self.tx_origin_vel_ssb_km_s
    }

    pub fn rx_vel_ssb_km_s(&self) -> Vector3<f64> {
        self.rx_vel_km_s + self.rx_origin_vel_ssb_km_s
    }

    /// Magnitude of the inertial range vector, in km.
    pub fn range_km(&self) -> f64 {
        self.range_vec_inertial_km.norm()
    }

    /// Projection of the range rate vector onto the range direction, in km/s.
    pub fn range_rate_km_s(&self) -> f64 {
        let range = self.range_km();
        if range > 0.0 {
            self.range_vec_inertial_km.dot(&self.range_rate_vec_inertial_km_s) / range
        } else {
            0.0
        }
    }

    /// One way light time implied by the leg epochs, in seconds.
    pub fn light_time_s(&self) -> f64 {
        (self.rx_epoch - self.tx_epoch).to_seconds()
    }

    pub fn correction(&self, kind: CorrectionKind) -> Option<&Correction> {
        self.corrections.iter().find(|c| c.kind == kind)
    }

    /// Inserts or overwrites the ledger entry of the given kind.
    pub fn set_correction(&mut self, kind: CorrectionKind, value: f64, enabled: bool) {
        match self.corrections.iter_mut().find(|c| c.kind == kind) {
            Some(entry) => {
                entry.value = value;
                entry.enabled = enabled;
            }
            None => self.corrections.push(Correction {
                kind,
                value,
                enabled,
            }),
        }
    }

    /// Value of an enabled ledger entry, zero otherwise.
    pub fn correction_value(&self, kind: CorrectionKind) -> f64 {
        self.correction(kind)
            .filter(|c| c.enabled)
            .map(|c| c.value)
            .unwrap_or(0.0)
    }

    /// Sum of the enabled media range corrections, in km.
    pub fn media_range_correction_km(&self) -> f64 {
        self.correction_value(CorrectionKind::Troposphere)
            + self.correction_value(CorrectionKind::Ionosphere)
    }
}
