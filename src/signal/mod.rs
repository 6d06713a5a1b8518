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

//! Signal legs and paths: light time iteration, corrections, and feasibility.
//!
//! A [SignalPath] owns its participants and an ordered sequence of [SignalLeg]s;
//! adjacency is positional, so leg `i` hands over to leg `i-1` (walking toward the
//! transmitter) or `i+1` (walking toward the receiver). The path is built once per
//! measurement model and re-evaluated, never rebuilt, on each measurement.

use crate::cosmic::{EphemerisSource, SsBody, SPEED_OF_LIGHT_KM_S};
use crate::errors::{DanglingLegSnafu, MissingHardwareSnafu};
use crate::hardware::Signal;
use crate::media::MediaSuite;
use crate::participants::{GroundStation, Participant, SpacecraftNode};
use crate::time::{Epoch, Unit};
use crate::MeasurementError;
use nalgebra::Vector3;

mod corrections;
mod data;
mod derivatives;

pub use corrections::{et_minus_tai, relativity_correction};
pub use data::{Correction, CorrectionKind, Feasibility, FeasibilityReason, SignalData};
pub use derivatives::DerivativeParam;

/// Tolerance on the light time fixed point iteration, in seconds. Equivalent to about
/// 0.3 mm of one way range.
pub const LIGHT_TIME_TOLERANCE_S: f64 = 1.0e-12;

/// Iteration cap of the light time loop. The loop is bounded and best effort: hitting
/// the cap leaves the last computed state in place without raising an error.
pub const LIGHT_TIME_MAX_ITERATIONS: usize = 10;

/// One directional hop of a signal path between two participants.
#[derive(Clone, Debug)]
pub struct SignalLeg {
    /// Index of the transmit participant.
    pub tx: usize,
    /// Index of the receive participant.
    pub rx: usize,
    pub data: SignalData,
    /// Whether the light time iteration runs; when false the leg is purely geometric.
    pub light_time: bool,
    pub use_relativity: bool,
    pub use_ettai: bool,
    pub media: MediaSuite,
    pub(crate) relativity_km: f64,
    pub(crate) ettai_km: f64,
}

impl SignalLeg {
    fn new(tx: usize, rx: usize) -> Self {
        Self {
            tx,
            rx,
            data: SignalData::new(Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0)),
            light_time: true,
            use_relativity: false,
            use_ettai: false,
            media: MediaSuite::none(),
            relativity_km: 0.0,
            ettai_km: 0.0,
        }
    }

    /// Relativistic range correction of the last evaluation, in km.
    pub fn relativity_correction_km(&self) -> f64 {
        self.relativity_km
    }

    /// ET-TAI range correction of the last evaluation, in km.
    pub fn ettai_correction_km(&self) -> f64 {
        self.ettai_km
    }
}

/// An owned sequence of signal legs over an owned set of participants.
#[derive(Clone, Debug)]
pub struct SignalPath {
    pub participants: Vec<Participant>,
    pub legs: Vec<SignalLeg>,
}

impl SignalPath {
    /// Builds a path along `strand`, a sequence of participant indices such as
    /// `[0, 1, 0]` for a two way track through participant 1.
    pub fn new(participants: Vec<Participant>, strand: &[usize]) -> Result<Self, MeasurementError> {
        let mut legs = Vec::with_capacity(strand.len().saturating_sub(1));
        for (i, pair) in strand.windows(2).enumerate() {
            snafu::ensure!(
                pair[0] < participants.len(),
                DanglingLegSnafu {
                    leg: i,
                    role: "transmit"
                }
            );
            snafu::ensure!(
                pair[1] < participants.len(),
                DanglingLegSnafu {
                    leg: i,
                    role: "receive"
                }
            );
            legs.push(SignalLeg::new(pair[0], pair[1]));
        }
        snafu::ensure!(
            !legs.is_empty(),
            DanglingLegSnafu {
                leg: 0_usize,
                role: "receive"
            }
        );
        Ok(Self { participants, legs })
    }

    /// The canonical two way path: station, spacecraft, and back.
    pub fn two_way(
        station: GroundStation,
        spacecraft: SpacecraftNode,
    ) -> Result<Self, MeasurementError> {
        Self::new(
            vec![
                Participant::Station(station),
                Participant::Spacecraft(spacecraft),
            ],
            &[0, 1, 0],
        )
    }

    pub fn set_light_time(&mut self, enabled: bool) {
        for leg in &mut self.legs {
            leg.light_time = enabled;
        }
    }

    /// Enables a correction on every leg of the path.
    pub fn add_correction(&mut self, kind: CorrectionKind) {
        for leg in &mut self.legs {
            match kind {
                CorrectionKind::Relativity => {
                    leg.use_relativity = true;
                    leg.data.set_correction(CorrectionKind::Relativity, 0.0, true);
                }
                CorrectionKind::EtTai => {
                    leg.use_ettai = true;
                    leg.data.set_correction(CorrectionKind::EtTai, 0.0, true);
                }
                _ => {}
            }
        }
    }

    /// Attaches the media models to every leg of the path.
    pub fn set_media(&mut self, suite: MediaSuite) {
        for leg in &mut self.legs {
            leg.media = suite.clone();
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.legs.iter().all(|leg| leg.data.feasibility.feasible)
    }

    fn last_leg(&self) -> usize {
        self.legs.len() - 1
    }

    /// State of a participant in its central body frame at `epoch`.
    fn participant_state(
        &self,
        idx: usize,
        epoch: Epoch,
    ) -> Result<(Vector3<f64>, Vector3<f64>), MeasurementError> {
        self.participants[idx].state_at(epoch)
    }

    /// Convenience entry point: anchors the whole path at `epoch` and models every leg.
    /// With `epoch_at_receive`, the anchor is the reception timetag of the final leg
    /// and the chain is walked backward; otherwise the anchor is the transmission
    /// timetag of the first leg and the chain is walked forward.
    pub fn model(
        &mut self,
        epoch: Epoch,
        epoch_at_receive: bool,
        eph: &dyn EphemerisSource,
    ) -> Result<bool, MeasurementError> {
        self.hardware_delay_pass();
        let start = if epoch_at_receive { self.last_leg() } else { 0 };
        self.model_signal(start, epoch, epoch_at_receive, eph)
    }

    /// Models one leg anchored at `at_epoch`, then recursively triggers the adjacent
    /// leg at the newly computed epoch of the shared node. A leg with no neighbor in
    /// the walk direction terminates the recursion.
    pub fn model_signal(
        &mut self,
        leg_idx: usize,
        at_epoch: Epoch,
        epoch_at_receive: bool,
        eph: &dyn EphemerisSource,
    ) -> Result<bool, MeasurementError> {
        let last = self.last_leg();

        // The anchor epoch absorbs the endpoint hardware delay: the full device delay
        // at a path endpoint, twice the stored half delay at an intermediate node.
        let anchor = {
            let data = &self.legs[leg_idx].data;
            if epoch_at_receive {
                let delay = if leg_idx == last {
                    data.rx_delay_s
                } else {
                    2.0 * data.rx_delay_s
                };
                at_epoch - delay * Unit::Second
            } else {
                let delay = if leg_idx == 0 {
                    data.tx_delay_s
                } else {
                    2.0 * data.tx_delay_s
                };
                at_epoch + delay * Unit::Second
            }
        };

        self.legs[leg_idx].relativity_km = 0.0;
        self.legs[leg_idx].ettai_km = 0.0;

        debug!(
            "modeling leg {} ({} -> {}) anchored at {} with fixed {}",
            leg_idx,
            self.participants[self.legs[leg_idx].tx].name(),
            self.participants[self.legs[leg_idx].rx].name(),
            anchor,
            if epoch_at_receive {
                "receiver"
            } else {
                "transmitter"
            },
        );

        self.move_to_epoch(leg_idx, anchor, epoch_at_receive, true, eph)?;
        self.update_leg_vectors(leg_idx);

        if self.legs[leg_idx].light_time {
            self.generate_light_time_data(leg_idx, anchor, epoch_at_receive, eph)?;
        }

        if self.legs[leg_idx].use_ettai {
            let tx_ettai = self.node_et_minus_tai(leg_idx, true, eph);
            let rx_ettai = self.node_et_minus_tai(leg_idx, false, eph);
            let ettai_km = (tx_ettai - rx_ettai) * SPEED_OF_LIGHT_KM_S;
            let leg = &mut self.legs[leg_idx];
            leg.ettai_km = ettai_km;
            leg.data
                .set_correction(CorrectionKind::EtTai, ettai_km, true);
        }

        self.feasibility_check(leg_idx);

        let next_epoch = if epoch_at_receive {
            self.legs[leg_idx].data.tx_epoch
        } else {
            self.legs[leg_idx].data.rx_epoch
        };

        if epoch_at_receive {
            if leg_idx > 0 {
                return self.model_signal(leg_idx - 1, next_epoch, true, eph);
            }
        } else if leg_idx < last {
            return self.model_signal(leg_idx + 1, next_epoch, false, eph);
        }

        Ok(true)
    }

    /// Places the fixed node (and, with `move_both`, the free node) of a leg at `epoch`
    /// and refreshes the node and frame origin states.
    fn move_to_epoch(
        &mut self,
        leg_idx: usize,
        epoch: Epoch,
        at_receive: bool,
        move_both: bool,
        eph: &dyn EphemerisSource,
    ) -> Result<(), MeasurementError> {
        let (tx, rx) = (self.legs[leg_idx].tx, self.legs[leg_idx].rx);

        if at_receive || move_both {
            let (pos, vel) = self.participant_state(rx, epoch)?;
            let body = self.participants[rx].central_body();
            let origin_pos = eph.ssb_position_km(body, epoch);
            let origin_vel = eph.ssb_velocity_km_s(body, epoch);
            let data = &mut self.legs[leg_idx].data;
            data.rx_epoch = epoch;
            data.rx_pos_km = pos;
            data.rx_vel_km_s = vel;
            data.rx_origin_pos_ssb_km = origin_pos;
            data.rx_origin_vel_ssb_km_s = origin_vel;
        }

        if !at_receive || move_both {
            let (pos, vel) = self.participant_state(tx, epoch)?;
            let body = self.participants[tx].central_body();
            let origin_pos = eph.ssb_position_km(body, epoch);
            let origin_vel = eph.ssb_velocity_km_s(body, epoch);
            let data = &mut self.legs[leg_idx].data;
            data.tx_epoch = epoch;
            data.tx_pos_km = pos;
            data.tx_vel_km_s = vel;
            data.tx_origin_pos_ssb_km = origin_pos;
            data.tx_origin_vel_ssb_km_s = origin_vel;
        }

        Ok(())
    }

    /// Rebuilds the inertial and observer frame range and range rate vectors from the
    /// current node states.
    fn update_leg_vectors(&mut self, leg_idx: usize) {
        let (tx, rx) = (self.legs[leg_idx].tx, self.legs[leg_idx].rx);
        let data = &self.legs[leg_idx].data;
        let range = data.rx_pos_ssb_km() - data.tx_pos_ssb_km();
        let rate = data.rx_vel_ssb_km_s() - data.tx_vel_ssb_km_s();

        // The observer frame belongs to the station endpoint, transmit side preferred.
        let obs = if let Participant::Station(gs) = &self.participants[tx] {
            let dcm = gs.sez_rotation(data.tx_epoch);
            Some((dcm * range, dcm * rate))
        } else if let Participant::Station(gs) = &self.participants[rx] {
            let dcm = gs.sez_rotation(data.rx_epoch);
            Some((dcm * range, dcm * rate))
        } else {
            None
        };

        let data = &mut self.legs[leg_idx].data;
        data.range_vec_inertial_km = range;
        data.range_rate_vec_inertial_km_s = rate;
        match obs {
            Some((obs_range, obs_rate)) => {
                data.range_vec_obs_km = obs_range;
                data.range_rate_vec_obs_km_s = obs_rate;
            }
            None => {
                data.range_vec_obs_km = range;
                data.range_rate_vec_obs_km_s = rate;
            }
        }
    }

    /// Fixed point iteration of the light time solution: alternate between computing
    /// the barycentric displacement, converting it (plus the optional relativistic
    /// correction) into a delay at vacuum light speed, and re-anchoring the free node
    /// at `fixed epoch +/- delay`. Terminates at [LIGHT_TIME_TOLERANCE_S] or after
    /// [LIGHT_TIME_MAX_ITERATIONS], whichever comes first.
    fn generate_light_time_data(
        &mut self,
        leg_idx: usize,
        at_epoch: Epoch,
        epoch_at_receive: bool,
        eph: &dyn EphemerisSource,
    ) -> Result<(), MeasurementError> {
        self.move_to_epoch(leg_idx, at_epoch, epoch_at_receive, true, eph)?;

        let sign = if epoch_at_receive { -1.0 } else { 1.0 };

        let mut displacement = {
            let d = &self.legs[leg_idx].data;
            d.rx_pos_ssb_km() - d.tx_pos_ssb_km()
        };
        // Epoch offset of the free node from the anchor; both nodes start there, and
        // the residual is tracked in floating point seconds so that the tolerance is
        // not limited by the epoch representation.
        let mut delta_e = 0.0;
        let mut delta_t = sign * displacement.norm() / SPEED_OF_LIGHT_KM_S;

        trace!(
            "light time start: dR = {:.3} km, dT = {:.12e} s",
            displacement.norm(),
            delta_t
        );

        let mut loop_count = 0;
        while (delta_e - delta_t).abs() > LIGHT_TIME_TOLERANCE_S
            && loop_count < LIGHT_TIME_MAX_ITERATIONS
        {
            self.move_to_epoch(
                leg_idx,
                at_epoch + delta_t * Unit::Second,
                !epoch_at_receive,
                false,
                eph,
            )?;
            delta_e = delta_t;

            let use_relativity = self.legs[leg_idx].use_relativity;
            let (r1, r2, t1, t2) = {
                let d = &self.legs[leg_idx].data;
                (
                    d.tx_pos_ssb_km(),
                    d.rx_pos_ssb_km(),
                    d.tx_epoch,
                    d.rx_epoch,
                )
            };
            displacement = r2 - r1;

            let rel_correction = if use_relativity {
                relativity_correction(eph, r1, r2, t1, t2)
            } else {
                0.0
            };
            {
                let leg = &mut self.legs[leg_idx];
                leg.relativity_km = rel_correction;
                leg.data.set_correction(
                    CorrectionKind::Relativity,
                    rel_correction,
                    use_relativity,
                );
            }

            delta_t = sign * (displacement.norm() + rel_correction) / SPEED_OF_LIGHT_KM_S;
            loop_count += 1;
        }

        if loop_count == LIGHT_TIME_MAX_ITERATIONS
            && (delta_e - delta_t).abs() > LIGHT_TIME_TOLERANCE_S
        {
            debug!(
                "light time iteration on leg {leg_idx} stopped at the cap with residual {:.3e} s",
                (delta_e - delta_t).abs()
            );
        }

        self.update_leg_vectors(leg_idx);
        Ok(())
    }

    /// ET minus TAI at one node of a leg, in seconds.
    fn node_et_minus_tai(
        &self,
        leg_idx: usize,
        at_transmit: bool,
        eph: &dyn EphemerisSource,
    ) -> f64 {
        let leg = &self.legs[leg_idx];
        let data = &leg.data;
        let (epoch, pos_ssb, vel_ssb, idx) = if at_transmit {
            (
                data.tx_epoch,
                data.tx_pos_ssb_km(),
                data.tx_vel_ssb_km_s(),
                leg.tx,
            )
        } else {
            (
                data.rx_epoch,
                data.rx_pos_ssb_km(),
                data.rx_vel_ssb_km_s(),
                leg.rx,
            )
        };
        let earth_pos = eph.ssb_position_km(SsBody::Earth, epoch);
        let earth_vel = eph.ssb_velocity_km_s(SsBody::Earth, epoch);
        et_minus_tai(
            eph,
            epoch,
            pos_ssb - earth_pos,
            vel_ssb - earth_vel,
            !self.participants[idx].is_station(),
        )
    }

    /// Elevation feasibility of a leg: every ground station endpoint must see the
    /// remote node above its mask. Legs without a station endpoint are unconditionally
    /// feasible (obstructing body occlusion is a known gap).
    fn feasibility_check(&mut self, leg_idx: usize) {
        let (tx, rx) = (self.legs[leg_idx].tx, self.legs[leg_idx].rx);
        let mut feasibility = Feasibility::default();

        if let Participant::Station(gs) = &self.participants[tx] {
            let report = gs.is_valid_elevation(&self.legs[leg_idx].data.range_vec_obs_km);
            feasibility.value_deg = report.elevation_deg;
            if report.visibility <= 0.0 {
                feasibility.feasible = false;
                feasibility.reason = FeasibilityReason::Blocked;
            }
        }

        if feasibility.feasible {
            if let Participant::Station(gs) = &self.participants[rx] {
                let data = &self.legs[leg_idx].data;
                // The stored observer vectors are in the transmit station frame when
                // both ends are stations, so rebuild the topocentric vector here.
                let sez = gs.sez_rotation(data.rx_epoch) * -data.range_vec_inertial_km;
                let report = gs.is_valid_elevation(&sez);
                feasibility.value_deg = report.elevation_deg;
                if report.visibility <= 0.0 {
                    feasibility.feasible = false;
                    feasibility.reason = FeasibilityReason::Blocked;
                }
            }
        }

        if !feasibility.feasible {
            debug!(
                "leg {} infeasible: elevation {:.3} deg",
                leg_idx, feasibility.value_deg
            );
        }

        self.legs[leg_idx].data.feasibility = feasibility;
    }

    /// Refreshes the per leg endpoint delays from the participant hardware: the full
    /// device delay at the path endpoints, half the transponder delay at intermediate
    /// nodes (the transponder's single delay straddles the receive side of one leg and
    /// the transmit side of the next). Missing hardware yields a zero delay.
    pub fn hardware_delay_pass(&mut self) {
        let last = self.last_leg();
        for i in 0..self.legs.len() {
            let (tx, rx) = (self.legs[i].tx, self.legs[i].rx);
            let tx_delay = self.participants[tx].transmit_delay_s();
            let rx_delay = self.participants[rx].receive_delay_s();
            let data = &mut self.legs[i].data;
            data.tx_delay_s = if i == 0 { tx_delay } else { tx_delay / 2.0 };
            data.rx_delay_s = if i == last { rx_delay } else { rx_delay / 2.0 };
        }
    }

    /// Propagates the carrier through the chain: the first leg radiates the transmitter
    /// frequency (or the provided override), every other leg radiates its upstream
    /// transponder output; each hop applies the Doppler factor `1 - range rate / c`,
    /// retunes the receiving transponder (which recomputes its own output), and seeds
    /// the arriving frequency of the next leg.
    pub fn signal_frequency_pass(
        &mut self,
        uplink_freq_mhz: Option<f64>,
    ) -> Result<(), MeasurementError> {
        let last = self.last_leg();
        for i in 0..self.legs.len() {
            let (tx, rx) = (self.legs[i].tx, self.legs[i].rx);

            let frequency = if i == 0 && self.legs[i].data.arrive_freq_mhz.is_none() {
                match uplink_freq_mhz {
                    Some(f) => f,
                    None => {
                        self.participants[tx]
                            .first_transmitter()
                            .ok_or_else(|| {
                                MissingHardwareSnafu {
                                    participant: self.participants[tx].name().to_string(),
                                    kind: "transmitter",
                                    action: "transmit the signal",
                                }
                                .build()
                            })?
                            .signal()
                            .value()
                    }
                }
            } else {
                self.participants[tx]
                    .first_transponder()
                    .ok_or_else(|| {
                        MissingHardwareSnafu {
                            participant: self.participants[tx].name().to_string(),
                            kind: "transponder",
                            action: "pass the signal",
                        }
                        .build()
                    })?
                    .signal(1)?
                    .value()
            };

            let range_rate = self.legs[i].data.range_rate_km_s();
            let shifted = frequency * (1.0 - range_rate / SPEED_OF_LIGHT_KM_S);

            {
                let data = &mut self.legs[i].data;
                data.transmit_freq_mhz = frequency;
                data.receive_freq_mhz = shifted;
            }

            let rx_name = self.participants[rx].name().to_string();
            if i < last {
                let transponder =
                    self.participants[rx].first_transponder_mut().ok_or_else(|| {
                        MissingHardwareSnafu {
                            participant: rx_name.clone(),
                            kind: "transponder",
                            action: "pass the signal",
                        }
                        .build()
                    })?;
                transponder.set_signal(Signal::new(shifted), 0)?;
                self.legs[i + 1].data.arrive_freq_mhz = Some(shifted);
            } else {
                let receiver = self.participants[rx].first_receiver_mut().ok_or_else(|| {
                    MissingHardwareSnafu {
                        participant: rx_name.clone(),
                        kind: "receiver",
                        action: "receive the signal",
                    }
                    .build()
                })?;
                receiver.set_signal(Signal::new(shifted));
            }
        }
        Ok(())
    }

    /// Evaluates the media corrections of every leg with a station endpoint and records
    /// them in the leg ledgers. Absent models record a zero, disabled entry.
    pub fn media_correction_pass(&mut self) {
        for i in 0..self.legs.len() {
            let (tx, rx) = (self.legs[i].tx, self.legs[i].rx);
            let station_side = if self.participants[tx].is_station() {
                Some(true)
            } else if self.participants[rx].is_station() {
                Some(false)
            } else {
                None
            };

            let leg = &self.legs[i];
            let has_tropo = leg.media.troposphere.is_some();
            let has_iono = leg.media.ionosphere.is_some();

            let mut tropo = (0.0, 0.0, has_tropo && station_side.is_some());
            let mut iono = (0.0, 0.0, has_iono && station_side.is_some());

            if let Some(station_is_tx) = station_side {
                if has_tropo || has_iono {
                    let data = &leg.data;
                    let obs = if station_is_tx {
                        data.range_vec_obs_km
                    } else {
                        -data.range_vec_obs_km
                    };
                    let elevation_rad = (obs.z / obs.norm()).asin();

                    // Media corrections only apply above the local horizon.
                    if elevation_rad > 1.0e-8 {
                        let (frequency, r_station, r_remote, e_station, e_remote) = if station_is_tx
                        {
                            (
                                data.transmit_freq_mhz,
                                data.tx_pos_ssb_km(),
                                data.rx_pos_ssb_km(),
                                data.tx_epoch,
                                data.rx_epoch,
                            )
                        } else {
                            (
                                data.receive_freq_mhz,
                                data.rx_pos_ssb_km(),
                                data.tx_pos_ssb_km(),
                                data.rx_epoch,
                                data.tx_epoch,
                            )
                        };

                        if let Some(model) = &leg.media.troposphere {
                            let corr = model.correction(
                                frequency,
                                r_station,
                                r_remote,
                                e_station,
                                e_remote,
                                elevation_rad,
                            );
                            tropo.0 = corr.range_m * 1.0e-3;
                            tropo.1 = (corr.angle_arcsec / 3600.0).to_radians();
                        }
                        if let Some(model) = &leg.media.ionosphere {
                            let corr = model.correction(
                                frequency,
                                r_station,
                                r_remote,
                                e_station,
                                e_remote,
                                elevation_rad,
                            );
                            iono.0 = corr.range_m * 1.0e-3;
                            iono.1 = (corr.angle_arcsec / 3600.0).to_radians();
                        }
                    }
                }
            }

            let data = &mut self.legs[i].data;
            data.set_correction(CorrectionKind::Troposphere, tropo.0, tropo.2);
            data.set_correction(CorrectionKind::TroposphereElev, tropo.1, tropo.2);
            data.set_correction(CorrectionKind::Ionosphere, iono.0, iono.2);
            data.set_correction(CorrectionKind::IonosphereElev, iono.1, iono.2);
        }
    }
}
