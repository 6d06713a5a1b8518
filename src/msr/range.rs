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

use super::{
    frequency_factor, gaussian_keeping_sign, MeasurementData, MeasurementType, DSN14_FREQUENCY_HZ,
    DEFAULT_RANGE_MODULO,
};
use crate::cosmic::{EphemerisSource, SsBody, SPEED_OF_LIGHT_KM_S};
use crate::errors::{
    AmbiguousHardwareSnafu, MissingHardwareSnafu, NotYetEvaluatedSnafu, ParticipantCountSnafu,
    UnsupportedDerivativeSnafu,
};
use crate::hardware::{FrequencyBand, Hardware};
use crate::media::MediaSuite;
use crate::participants::{GroundStation, Participant, SpacecraftNode};
use crate::signal::{et_minus_tai, CorrectionKind, DerivativeParam, FeasibilityReason, SignalPath};
use crate::time::Epoch;
use crate::MeasurementError;
use rand_pcg::Pcg64Mcg;

/// The DSN two way range observable: a ground station uplink, a spacecraft transponder
/// turnaround, and the downlink back to the same station, reported in range units.
///
/// The observable is the total signal travel time (light time per leg corrected by
/// media, relativity, and optionally ET-TAI, plus the three hardware delays) multiplied
/// by the frequency dependent range unit factor.
#[derive(Clone, Debug)]
pub struct DsnTwoWayRange {
    path: SignalPath,
    /// Range ambiguity modulo, in range units.
    pub range_modulo: f64,
    /// One sigma measurement noise, in range units; None evaluates noise free.
    pub noise_sigma: Option<f64>,
    /// Whether the ET-TAI timescale correction contributes to the travel time.
    pub use_ettai: bool,
    transmit_delay_s: f64,
    receive_delay_s: f64,
    target_delay_s: f64,
    frequency_hz: f64,
    freq_band: Option<FrequencyBand>,
    current: MeasurementData,
    msr_epoch: Option<Epoch>,
}

pub(crate) fn count_hardware(
    hw: &[Hardware],
    kind: &'static str,
) -> usize {
    hw.iter()
        .filter(|h| match kind {
            "transmitter" => matches!(h, Hardware::Transmitter(_)),
            "receiver" => matches!(h, Hardware::Receiver(_)),
            "transponder" => matches!(h, Hardware::Transponder(_)),
            _ => false,
        })
        .count()
}

/// Requires exactly one device of the given kind on the participant.
pub(crate) fn require_exactly_one(
    participant: &Participant,
    kind: &'static str,
    action: &'static str,
) -> Result<(), MeasurementError> {
    match count_hardware(participant.hardware(), kind) {
        0 => MissingHardwareSnafu {
            participant: participant.name().to_string(),
            kind,
            action,
        }
        .fail(),
        1 => Ok(()),
        _ => AmbiguousHardwareSnafu {
            participant: participant.name().to_string(),
            kind,
        }
        .fail(),
    }
}

impl DsnTwoWayRange {
    pub fn new(
        station: GroundStation,
        spacecraft: SpacecraftNode,
    ) -> Result<Self, MeasurementError> {
        let participant_ids = vec![station.id.clone(), spacecraft.id.clone()];
        let path = SignalPath::two_way(station, spacecraft)?;
        let placeholder = Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0);
        Ok(Self {
            path,
            range_modulo: DEFAULT_RANGE_MODULO,
            noise_sigma: None,
            use_ettai: false,
            transmit_delay_s: 0.0,
            receive_delay_s: 0.0,
            target_delay_s: 0.0,
            frequency_hz: DSN14_FREQUENCY_HZ,
            freq_band: None,
            current: MeasurementData::new(placeholder, MeasurementType::Range, participant_ids),
            msr_epoch: None,
        })
    }

    pub fn with_range_modulo(mut self, modulo: f64) -> Self {
        self.range_modulo = modulo;
        self
    }

    pub fn with_noise_sigma(mut self, sigma: f64) -> Self {
        self.noise_sigma = Some(sigma);
        self
    }

    pub fn with_ettai(mut self) -> Self {
        self.use_ettai = true;
        self.path.add_correction(CorrectionKind::EtTai);
        self
    }

    pub fn with_relativity(mut self) -> Self {
        self.path.add_correction(CorrectionKind::Relativity);
        self
    }

    pub fn with_media(mut self, suite: MediaSuite) -> Self {
        self.path.set_media(suite);
        self
    }

    /// Disables the light time iteration, making every leg purely geometric.
    pub fn without_light_time(mut self) -> Self {
        self.path.set_light_time(false);
        self
    }

    pub fn path(&self) -> &SignalPath {
        &self.path
    }

    /// The last computed measurement.
    pub fn measurement(&self) -> Result<&MeasurementData, MeasurementError> {
        if self.msr_epoch.is_none() {
            return NotYetEvaluatedSnafu {
                observable: "DSNTwoWayRange",
            }
            .fail();
        }
        Ok(&self.current)
    }

    fn station(&self) -> Result<&GroundStation, MeasurementError> {
        match &self.path.participants[0] {
            Participant::Station(gs) => Ok(gs),
            Participant::Spacecraft(_) => ParticipantCountSnafu {
                observable: "DSNTwoWayRange",
                need: 2_usize,
                order: "ground station, spacecraft",
            }
            .fail(),
        }
    }

    /// Refreshes the hardware delays (and the uplink carrier) from the participant
    /// hardware. A missing device silently leaves the previous value in place; the
    /// full evaluation path instead demands exactly one of each.
    pub fn set_hardware_delays(&mut self) {
        if let Some(tx) = self.path.participants[0].first_transmitter() {
            self.transmit_delay_s = tx.delay_s;
            self.frequency_hz = tx.frequency_mhz() * 1.0e6;
        }
        if let Some(tp) = self.path.participants[1].first_transponder() {
            self.target_delay_s = tp.total_delay_s();
        }
        if let Some(rx) = self.path.participants[0].first_receiver() {
            self.receive_delay_s = rx.delay_s;
        }
    }

    /// Evaluates the observable at the reception timetag `epoch`.
    ///
    /// Without events, this is a feasibility only pass: the instantaneous geometric
    /// range and its elevation at the station, with no delay or correction. With
    /// events, the signal legs are iterated to light time convergence and the full
    /// corrected travel time is converted into range units.
    pub fn evaluate(
        &mut self,
        epoch: Epoch,
        with_events: bool,
        eph: &dyn EphemerisSource,
        rng: Option<&mut Pcg64Mcg>,
    ) -> Result<&MeasurementData, MeasurementError> {
        self.current = MeasurementData::new(
            epoch,
            MeasurementType::Range,
            self.current.participant_ids.clone(),
        );
        self.current.range_modulo = self.range_modulo;
        self.msr_epoch = Some(epoch);

        if with_events {
            self.evaluate_full(epoch, eph, rng)?;
        } else {
            self.evaluate_geometric(epoch, eph)?;
        }
        Ok(&self.current)
    }

    /// Geometric pass: feasibility from the topocentric elevation sign, value set to
    /// the instantaneous range.
    fn evaluate_geometric(
        &mut self,
        epoch: Epoch,
        eph: &dyn EphemerisSource,
    ) -> Result<(), MeasurementError> {
        let (gs_pos, _) = self.path.participants[0].state_at(epoch)?;
        let (sc_pos, _) = self.path.participants[1].state_at(epoch)?;
        let gs_ssb = gs_pos + eph.ssb_position_km(SsBody::Earth, epoch);
        let sc_body = self.path.participants[1].central_body();
        let sc_ssb = sc_pos + eph.ssb_position_km(sc_body, epoch);
        let range_vec = sc_ssb - gs_ssb;

        let station = self.station()?.clone();
        let sez = station.sez_rotation(epoch) * range_vec;
        let report = station.is_valid_elevation(&sez);
        self.current.feasibility_value = report.elevation_deg;

        if sez.z > 0.0 {
            self.current.is_feasible = true;
            self.current.value[0] = range_vec.norm();
            self.current.event_count = 2;
            self.set_hardware_delays();
        } else {
            self.current.is_feasible = false;
            self.current.unfeasible_reason = FeasibilityReason::Blocked;
            self.current.value[0] = 0.0;
            self.current.event_count = 0;
        }
        Ok(())
    }

    /// Full pass over the converged legs.
    fn evaluate_full(
        &mut self,
        epoch: Epoch,
        eph: &dyn EphemerisSource,
        rng: Option<&mut Pcg64Mcg>,
    ) -> Result<(), MeasurementError> {
        self.path.model(epoch, true, eph)?;

        let hardware_free = self
            .path
            .participants
            .iter()
            .all(|p| p.hardware().is_empty());

        if !hardware_free {
            require_exactly_one(
                &self.path.participants[0],
                "transmitter",
                "send the signal",
            )?;
            require_exactly_one(
                &self.path.participants[0],
                "receiver",
                "receive the signal",
            )?;
            require_exactly_one(
                &self.path.participants[1],
                "transponder",
                "transpond the signal",
            )?;
            self.set_hardware_delays();
            self.freq_band = FrequencyBand::classify(self.frequency_hz);

            self.path.signal_frequency_pass(None)?;

            // Passband checks along the Doppler shifted chain.
            let transponder_ok = self.path.participants[1]
                .first_transponder()
                .map(|tp| tp.is_feasible(0))
                .transpose()?
                .unwrap_or(false);
            let receiver_ok = self.path.participants[0]
                .first_receiver()
                .map(|rx| rx.is_feasible())
                .unwrap_or(false);
            if !transponder_ok || !receiver_ok {
                warn!(
                    "{} cannot lock the {} signal: out of band",
                    if transponder_ok {
                        "receiver"
                    } else {
                        "transponder"
                    },
                    if transponder_ok { "downlink" } else { "uplink" },
                );
                self.current.is_feasible = false;
                self.current.unfeasible_reason = FeasibilityReason::OutOfBand;
                self.current.value[0] = 0.0;
                self.current.uplink_frequency_hz = self.frequency_hz;
                self.current.uplink_band = self.freq_band;
                return Ok(());
            }

            self.path.media_correction_pass();
        }

        let uplink = self.path.legs[0].data.clone();
        let downlink = self.path.legs[1].data.clone();
        let t1t = uplink.tx_epoch;
        let t3r = downlink.rx_epoch;

        let uplink_real_km = uplink.range_km()
            + uplink.media_range_correction_km()
            + self.path.legs[0].relativity_correction_km();
        let downlink_real_km = downlink.range_km()
            + downlink.media_range_correction_km()
            + self.path.legs[1].relativity_correction_km();

        // ET-TAI is evaluated at the station transmit and receive epochs.
        let ettai_s = if self.use_ettai {
            let earth_t1 = eph.ssb_position_km(SsBody::Earth, t1t);
            let earth_v1 = eph.ssb_velocity_km_s(SsBody::Earth, t1t);
            let earth_t3 = eph.ssb_position_km(SsBody::Earth, t3r);
            let earth_v3 = eph.ssb_velocity_km_s(SsBody::Earth, t3r);
            let ettai_t1 = et_minus_tai(
                eph,
                t1t,
                uplink.tx_pos_ssb_km() - earth_t1,
                uplink.tx_vel_ssb_km_s() - earth_v1,
                false,
            );
            let ettai_t3 = et_minus_tai(
                eph,
                t3r,
                downlink.rx_pos_ssb_km() - earth_t3,
                downlink.rx_vel_ssb_km_s() - earth_v3,
                false,
            );
            ettai_t1 - ettai_t3
        } else {
            0.0
        };

        let uplink_time_s = uplink_real_km / SPEED_OF_LIGHT_KM_S;
        let downlink_time_s = downlink_real_km / SPEED_OF_LIGHT_KM_S;
        let travel_time_s = uplink_time_s
            + downlink_time_s
            + ettai_s
            + self.receive_delay_s
            + self.transmit_delay_s
            + self.target_delay_s;

        debug!(
            "two way range travel time: up {:.9} s + down {:.9} s + ET-TAI {:.3e} s + delays {:.3e} s",
            uplink_time_s,
            downlink_time_s,
            ettai_s,
            self.receive_delay_s + self.transmit_delay_s + self.target_delay_s,
        );

        // Elevation feasibility of both legs against the station mask.
        let station = self.station()?.clone();
        let up_report =
            station.is_valid_elevation(&(station.sez_rotation(t1t) * uplink.range_vec_inertial_km));
        self.current.feasibility_value = up_report.elevation_deg;
        if up_report.visibility > 0.0 {
            let down_report = station
                .is_valid_elevation(&(station.sez_rotation(t3r) * -downlink.range_vec_inertial_km));
            if down_report.visibility > 0.0 {
                self.current.is_feasible = true;
                self.current.unfeasible_reason = FeasibilityReason::Normal;
            } else {
                self.current.feasibility_value = down_report.elevation_deg;
                self.current.is_feasible = false;
                self.current.unfeasible_reason = FeasibilityReason::BlockedDownlink;
            }
        } else {
            self.current.is_feasible = false;
            self.current.unfeasible_reason = FeasibilityReason::BlockedUplink;
        }

        let mut value = travel_time_s * frequency_factor(self.frequency_hz);
        if let (Some(sigma), Some(rng)) = (self.noise_sigma, rng) {
            value = gaussian_keeping_sign(value, sigma, rng);
            self.current.noise_sigma = vec![sigma];
        }

        self.current.value[0] = value;
        self.current.event_count = 2;
        self.current.uplink_frequency_hz = self.frequency_hz;
        self.current.uplink_band = self.freq_band;
        Ok(())
    }

    /// Partials of the observable with respect to `param` on the named participant.
    ///
    /// State partials combine the inverse state transition matrix at the measurement
    /// epoch with the per leg range projections, scaled by the range unit factor over
    /// the speed of light. A bias parameter always contributes a unit derivative; any
    /// other parameter contributes zero.
    pub fn calculate_measurement_derivatives(
        &self,
        participant: &str,
        param: DerivativeParam,
    ) -> Result<Vec<Vec<f64>>, MeasurementError> {
        let msr_epoch = self.msr_epoch.ok_or_else(|| {
            NotYetEvaluatedSnafu {
                observable: "DSNTwoWayRange",
            }
            .build()
        })?;

        let size = param.size();
        let mut row = vec![0.0; size];

        if param == DerivativeParam::Bias {
            row.iter_mut().for_each(|v| *v = 1.0);
            return Ok(vec![row]);
        }

        let Some(wrt) = self
            .path
            .participants
            .iter()
            .position(|p| p.name() == participant)
        else {
            // Independent of this observable.
            return Ok(vec![row]);
        };
        if self.path.participants[wrt].is_station() {
            return UnsupportedDerivativeSnafu {
                participant: participant.to_string(),
            }
            .fail();
        }

        let (wrt_r, wrt_v) = match param {
            DerivativeParam::Position => (true, false),
            DerivativeParam::Velocity => (false, true),
            DerivativeParam::CartesianState => (true, true),
            DerivativeParam::Bias => unreachable!(),
        };

        let stm_inv = self.path.inverse_stm(wrt, msr_epoch)?;
        let f_factor = frequency_factor(self.frequency_hz) / SPEED_OF_LIGHT_KM_S;
        let up = self.path.leg_range_partial(0, wrt, &stm_inv, wrt_r, wrt_v)?;
        let down = self.path.leg_range_partial(1, wrt, &stm_inv, wrt_r, wrt_v)?;
        for (i, slot) in row.iter_mut().enumerate() {
            *slot = f_factor * (up[i] + down[i]);
        }
        Ok(vec![row])
    }
}
