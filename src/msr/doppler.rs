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

use super::range::require_exactly_one;
use super::{
    gaussian_keeping_sign, MeasurementData, MeasurementType, DEFAULT_DOPPLER_INTERVAL_S,
    DSN14_FREQUENCY_HZ,
};
use crate::cosmic::{EphemerisSource, SsBody, SPEED_OF_LIGHT_KM_S};
use crate::errors::{NotYetEvaluatedSnafu, ParticipantCountSnafu, UnsupportedDerivativeSnafu};
use crate::hardware::FrequencyBand;
use crate::media::MediaSuite;
use crate::participants::{GroundStation, Participant, SpacecraftNode};
use crate::signal::{
    et_minus_tai, CorrectionKind, DerivativeParam, FeasibilityReason, SignalData, SignalPath,
};
use crate::time::{Epoch, Unit};
use crate::MeasurementError;
use rand_pcg::Pcg64Mcg;

/// Travel time and station geometry of one complete round trip.
struct RoundTrip {
    travel_time_s: f64,
    uplink: SignalData,
    downlink: SignalData,
}

/// The averaging machinery shared by count rate Doppler observables: two complete round
/// trips, anchored half the averaging interval before and after the measurement epoch.
///
/// Each round trip owns a private copy of the participants (and therefore of all
/// hardware signal state), so evaluating the start and end paths never aliases.
#[derive(Clone, Debug)]
pub struct AveragedDoppler {
    pub(crate) path_start: SignalPath,
    pub(crate) path_end: SignalPath,
    /// Doppler averaging (count) interval, in seconds.
    pub interval_s: f64,
    /// Transponder turnaround ratio; refreshed from the hardware when present.
    pub turnaround: f64,
    /// Uplink carrier, in Hz; refreshed from the transmitter when present.
    pub frequency_hz: f64,
    pub(crate) transmit_delay_s: f64,
    pub(crate) target_delay_s: f64,
    pub(crate) receive_delay_s: f64,
    pub use_ettai: bool,
    pub(crate) participant_ids: Vec<String>,
}

impl AveragedDoppler {
    pub fn new(
        station: GroundStation,
        spacecraft: SpacecraftNode,
    ) -> Result<Self, MeasurementError> {
        let participant_ids = vec![station.id.clone(), spacecraft.id.clone()];
        let path_start = SignalPath::two_way(station.clone(), spacecraft.clone())?;
        let path_end = SignalPath::two_way(station, spacecraft)?;
        Ok(Self {
            path_start,
            path_end,
            interval_s: DEFAULT_DOPPLER_INTERVAL_S,
            turnaround: 1.1,
            frequency_hz: DSN14_FREQUENCY_HZ,
            transmit_delay_s: 0.0,
            target_delay_s: 0.0,
            receive_delay_s: 0.0,
            use_ettai: false,
            participant_ids,
        })
    }

    /// Refreshes the delays, the carrier, and the turnaround ratio from the hardware of
    /// the first participant (transmitter, receiver) and second participant
    /// (transponder). A missing device silently leaves the previous value in place.
    pub fn set_hardware_delays(&mut self) {
        if let Some(tx) = self.path_start.participants[0].first_transmitter() {
            self.transmit_delay_s = tx.delay_s;
            self.frequency_hz = tx.frequency_mhz() * 1.0e6;
        }
        if let Some(tp) = self.path_start.participants[1].first_transponder() {
            self.target_delay_s = tp.total_delay_s();
            if let Ok(ratio) = tp.turnaround_ratio() {
                self.turnaround = ratio;
            }
        }
        if let Some(rx) = self.path_start.participants[0].first_receiver() {
            self.receive_delay_s = rx.delay_s;
        }
    }

    /// Reception timetags of the start and end round trips, straddling the epoch by
    /// half the averaging interval.
    pub fn timetags(&self, epoch: Epoch) -> (Epoch, Epoch) {
        (
            epoch - (self.interval_s / 2.0) * Unit::Second,
            epoch + (self.interval_s / 2.0) * Unit::Second,
        )
    }

    fn station_of(path: &SignalPath) -> Result<&GroundStation, MeasurementError> {
        match &path.participants[0] {
            Participant::Station(gs) => Ok(gs),
            Participant::Spacecraft(_) => ParticipantCountSnafu {
                observable: "AveragedDoppler",
                need: 2_usize,
                order: "ground station, spacecraft",
            }
            .fail(),
        }
    }

    fn hardware_free(&self) -> bool {
        self.path_start
            .participants
            .iter()
            .all(|p| p.hardware().is_empty())
    }
}

/// The DSN two way averaged Doppler observable: the difference of two round trip travel
/// times taken one averaging interval apart, scaled by the turned around carrier. A
/// count rate observable, not an instantaneous frequency shift.
#[derive(Clone, Debug)]
pub struct DsnTwoWayDoppler {
    inner: AveragedDoppler,
    /// One sigma measurement noise, in Hz; None evaluates noise free.
    pub noise_sigma: Option<f64>,
    freq_band: Option<FrequencyBand>,
    current: MeasurementData,
    msr_epoch: Option<Epoch>,
}

impl DsnTwoWayDoppler {
    pub fn new(
        station: GroundStation,
        spacecraft: SpacecraftNode,
    ) -> Result<Self, MeasurementError> {
        let inner = AveragedDoppler::new(station, spacecraft)?;
        let placeholder = Epoch::from_gregorian_utc(2000, 1, 1, 12, 0, 0, 0);
        let current = MeasurementData::new(
            placeholder,
            MeasurementType::Doppler,
            inner.participant_ids.clone(),
        );
        Ok(Self {
            inner,
            noise_sigma: None,
            freq_band: None,
            current,
            msr_epoch: None,
        })
    }

    pub fn with_interval(mut self, interval_s: f64) -> Self {
        self.inner.interval_s = interval_s;
        self
    }

    pub fn with_noise_sigma(mut self, sigma: f64) -> Self {
        self.noise_sigma = Some(sigma);
        self
    }

    pub fn with_ettai(mut self) -> Self {
        self.inner.use_ettai = true;
        self.inner.path_start.add_correction(CorrectionKind::EtTai);
        self.inner.path_end.add_correction(CorrectionKind::EtTai);
        self
    }

    pub fn with_relativity(mut self) -> Self {
        self.inner
            .path_start
            .add_correction(CorrectionKind::Relativity);
        self.inner
            .path_end
            .add_correction(CorrectionKind::Relativity);
        self
    }

    pub fn with_media(mut self, suite: MediaSuite) -> Self {
        self.inner.path_start.set_media(suite.clone());
        self.inner.path_end.set_media(suite);
        self
    }

    pub fn averaging(&self) -> &AveragedDoppler {
        &self.inner
    }

    /// The last computed measurement.
    pub fn measurement(&self) -> Result<&MeasurementData, MeasurementError> {
        if self.msr_epoch.is_none() {
            return NotYetEvaluatedSnafu {
                observable: "DSNTwoWayDoppler",
            }
            .fail();
        }
        Ok(&self.current)
    }

    /// Evaluates the observable at the measurement timetag `epoch`.
    ///
    /// Without events this is a feasibility only pass: Doppler requires two time
    /// separated samples, so the value is always zero and only the geometric
    /// visibility is reported. With events, both round trips are iterated to light
    /// time convergence and the count rate observable is formed.
    pub fn evaluate(
        &mut self,
        epoch: Epoch,
        with_events: bool,
        eph: &dyn EphemerisSource,
        rng: Option<&mut Pcg64Mcg>,
    ) -> Result<&MeasurementData, MeasurementError> {
        self.current = MeasurementData::new(
            epoch,
            MeasurementType::Doppler,
            self.inner.participant_ids.clone(),
        );
        self.current.doppler_count_interval_s = self.inner.interval_s;
        self.msr_epoch = Some(epoch);

        if with_events {
            self.evaluate_full(epoch, eph, rng)?;
        } else {
            self.evaluate_geometric(epoch, eph)?;
        }
        Ok(&self.current)
    }

    fn evaluate_geometric(
        &mut self,
        epoch: Epoch,
        eph: &dyn EphemerisSource,
    ) -> Result<(), MeasurementError> {
        let (gs_pos, _) = self.inner.path_start.participants[0].state_at(epoch)?;
        let (sc_pos, _) = self.inner.path_start.participants[1].state_at(epoch)?;
        let gs_ssb = gs_pos + eph.ssb_position_km(SsBody::Earth, epoch);
        let sc_body = self.inner.path_start.participants[1].central_body();
        let sc_ssb = sc_pos + eph.ssb_position_km(sc_body, epoch);
        let range_vec = sc_ssb - gs_ssb;

        let station = AveragedDoppler::station_of(&self.inner.path_start)?.clone();
        let sez = station.sez_rotation(epoch) * range_vec;
        let report = station.is_valid_elevation(&sez);
        self.current.feasibility_value = report.elevation_deg;

        // A single geometric snapshot cannot define a Doppler count: the value stays
        // zero on this pass, only the visibility is decided.
        self.current.value[0] = 0.0;
        if sez.z > 0.0 {
            self.current.is_feasible = true;
            self.current.event_count = 4;
            self.inner.set_hardware_delays();
        } else {
            self.current.is_feasible = false;
            self.current.unfeasible_reason = FeasibilityReason::Blocked;
            self.current.event_count = 0;
        }
        Ok(())
    }

    /// Models one round trip anchored at the reception timetag `timetag` and returns
    /// its corrected travel time.
    fn round_trip(
        &mut self,
        timetag: Epoch,
        start_path: bool,
        hardware_free: bool,
        eph: &dyn EphemerisSource,
    ) -> Result<RoundTrip, MeasurementError> {
        let use_ettai = self.inner.use_ettai;
        let delays_s =
            self.inner.transmit_delay_s + self.inner.receive_delay_s + self.inner.target_delay_s;
        let path = if start_path {
            &mut self.inner.path_start
        } else {
            &mut self.inner.path_end
        };

        path.model(timetag, true, eph)?;
        if !hardware_free {
            path.signal_frequency_pass(None)?;
            path.media_correction_pass();
        }

        let uplink = path.legs[0].data.clone();
        let downlink = path.legs[1].data.clone();
        let up_real_km = uplink.range_km()
            + uplink.media_range_correction_km()
            + path.legs[0].relativity_correction_km();
        let down_real_km = downlink.range_km()
            + downlink.media_range_correction_km()
            + path.legs[1].relativity_correction_km();

        let ettai_s = if use_ettai {
            let t1t = uplink.tx_epoch;
            let t3r = downlink.rx_epoch;
            let ettai_t1 = et_minus_tai(
                eph,
                t1t,
                uplink.tx_pos_ssb_km() - eph.ssb_position_km(SsBody::Earth, t1t),
                uplink.tx_vel_ssb_km_s() - eph.ssb_velocity_km_s(SsBody::Earth, t1t),
                false,
            );
            let ettai_t3 = et_minus_tai(
                eph,
                t3r,
                downlink.rx_pos_ssb_km() - eph.ssb_position_km(SsBody::Earth, t3r),
                downlink.rx_vel_ssb_km_s() - eph.ssb_velocity_km_s(SsBody::Earth, t3r),
                false,
            );
            ettai_t1 - ettai_t3
        } else {
            0.0
        };

        let travel_time_s = (up_real_km + down_real_km) / SPEED_OF_LIGHT_KM_S + ettai_s + delays_s;

        Ok(RoundTrip {
            travel_time_s,
            uplink,
            downlink,
        })
    }

    /// Checks both legs of a round trip against the station mask and records the
    /// path specific blockage reason.
    fn check_round_trip_feasibility(
        &mut self,
        trip: &RoundTrip,
        start_path: bool,
    ) -> Result<(), MeasurementError> {
        let station = AveragedDoppler::station_of(&self.inner.path_start)?.clone();

        let up_sez =
            station.sez_rotation(trip.uplink.tx_epoch) * trip.uplink.range_vec_inertial_km;
        let up_report = station.is_valid_elevation(&up_sez);
        self.current.feasibility_value = up_report.elevation_deg;
        if up_report.visibility <= 0.0 {
            self.current.is_feasible = false;
            self.current.unfeasible_reason = if start_path {
                FeasibilityReason::BlockedUplinkStart
            } else {
                FeasibilityReason::BlockedUplinkEnd
            };
            return Ok(());
        }

        let down_sez =
            station.sez_rotation(trip.downlink.rx_epoch) * -trip.downlink.range_vec_inertial_km;
        let down_report = station.is_valid_elevation(&down_sez);
        if down_report.visibility <= 0.0 {
            self.current.feasibility_value = down_report.elevation_deg;
            self.current.is_feasible = false;
            self.current.unfeasible_reason = if start_path {
                FeasibilityReason::BlockedDownlinkStart
            } else {
                FeasibilityReason::BlockedDownlinkEnd
            };
        }
        Ok(())
    }

    fn evaluate_full(
        &mut self,
        epoch: Epoch,
        eph: &dyn EphemerisSource,
        rng: Option<&mut Pcg64Mcg>,
    ) -> Result<(), MeasurementError> {
        let hardware_free = self.inner.hardware_free();

        if !hardware_free {
            require_exactly_one(
                &self.inner.path_start.participants[0],
                "transmitter",
                "send the signal",
            )?;
            require_exactly_one(
                &self.inner.path_start.participants[0],
                "receiver",
                "receive the signal",
            )?;
            require_exactly_one(
                &self.inner.path_start.participants[1],
                "transponder",
                "transpond the signal",
            )?;
            self.inner.set_hardware_delays();
            self.freq_band = FrequencyBand::classify(self.inner.frequency_hz);

            // An unset ratio of exactly one falls back to the band standard.
            if self.inner.turnaround == 1.0 {
                if let Some(band) = self.freq_band {
                    self.inner.turnaround = band.default_turnaround();
                }
            }
        }

        let (timetag_start, timetag_end) = self.inner.timetags(epoch);
        let trip_start = self.round_trip(timetag_start, true, hardware_free, eph)?;
        let trip_end = self.round_trip(timetag_end, false, hardware_free, eph)?;

        self.current.is_feasible = true;
        self.current.unfeasible_reason = FeasibilityReason::Normal;
        self.check_round_trip_feasibility(&trip_start, true)?;
        if self.current.is_feasible {
            self.check_round_trip_feasibility(&trip_end, false)?;
        }

        let dt_start = trip_start.travel_time_s;
        let dt_end = trip_end.travel_time_s;

        debug!(
            "two way Doppler travel times: start {:.12} s, end {:.12} s, difference {:.6e} s",
            dt_start,
            dt_end,
            dt_end - dt_start
        );

        // Count rate observable over the averaging interval.
        let mut value =
            self.inner.turnaround * self.inner.frequency_hz * (dt_end - dt_start)
                / self.inner.interval_s;
        if let (Some(sigma), Some(rng)) = (self.noise_sigma, rng) {
            value = gaussian_keeping_sign(value, sigma, rng);
            self.current.noise_sigma = vec![sigma];
        }

        self.current.value[0] = value;
        self.current.event_count = 4;
        self.current.uplink_frequency_hz = self.inner.frequency_hz;
        self.current.uplink_band = self.freq_band;
        self.current.doppler_count_interval_s = self.inner.interval_s;
        Ok(())
    }

    /// Partials of the observable with respect to `param` on the named participant:
    /// the end path projections minus the start path projections, each scaled by
    /// `turnaround * frequency / (c * interval)`. A bias parameter always contributes
    /// a unit derivative; any other parameter contributes zero.
    pub fn calculate_measurement_derivatives(
        &self,
        participant: &str,
        param: DerivativeParam,
    ) -> Result<Vec<Vec<f64>>, MeasurementError> {
        let msr_epoch = self.msr_epoch.ok_or_else(|| {
            NotYetEvaluatedSnafu {
                observable: "DSNTwoWayDoppler",
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
            .inner
            .path_start
            .participants
            .iter()
            .position(|p| p.name() == participant)
        else {
            return Ok(vec![row]);
        };
        if self.inner.path_start.participants[wrt].is_station() {
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

        let pre_factor = self.inner.turnaround * self.inner.frequency_hz
            / (self.inner.interval_s * SPEED_OF_LIGHT_KM_S);

        let stm_inv_start = self.inner.path_start.inverse_stm(wrt, msr_epoch)?;
        let up_start =
            self.inner
                .path_start
                .leg_range_partial(0, wrt, &stm_inv_start, wrt_r, wrt_v)?;
        let down_start =
            self.inner
                .path_start
                .leg_range_partial(1, wrt, &stm_inv_start, wrt_r, wrt_v)?;

        let stm_inv_end = self.inner.path_end.inverse_stm(wrt, msr_epoch)?;
        let up_end = self
            .inner
            .path_end
            .leg_range_partial(0, wrt, &stm_inv_end, wrt_r, wrt_v)?;
        let down_end = self
            .inner
            .path_end
            .leg_range_partial(1, wrt, &stm_inv_end, wrt_r, wrt_v)?;

        for (i, slot) in row.iter_mut().enumerate() {
            *slot = pre_factor * (up_end[i] + down_end[i])
                - pre_factor * (up_start[i] + down_start[i]);
        }
        Ok(vec![row])
    }
}
