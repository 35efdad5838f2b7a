//! Transaction mortality

use parity_scale_codec::{Decode, Encode, Input, Output};
use quorum_errors::Error;
use serde::{Deserialize, Serialize};

const MIN_PERIOD: u64 = 4;
const MAX_PERIOD: u64 = 1 << 16;

/// Validity window of a transaction
///
/// A mortal era is valid for `period` blocks starting at the most recent
/// block whose number is congruent to `phase` modulo `period`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "RawEra")]
pub enum Era {
    Immortal,
    Mortal { period: u64, phase: u64 },
}

/// Unchecked wire shape of [`Era`]
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawEra {
    Immortal,
    Mortal { period: u64, phase: u64 },
}

impl TryFrom<RawEra> for Era {
    type Error = Error;

    fn try_from(raw: RawEra) -> Result<Self, Error> {
        match raw {
            RawEra::Immortal => Ok(Era::Immortal),
            RawEra::Mortal { period, phase } => Era::from_parts(period, phase),
        }
    }
}

impl Era {
    /// Mortal era anchored at `current`, with the period rounded up to a
    /// power of two in `4..=65536`
    pub fn mortal(period: u64, current: u64) -> Self {
        let period = period
            .checked_next_power_of_two()
            .unwrap_or(MAX_PERIOD)
            .clamp(MIN_PERIOD, MAX_PERIOD);
        let phase = current % period;
        let quantize_factor = (period >> 12).max(1);
        let quantized_phase = phase / quantize_factor * quantize_factor;

        Era::Mortal {
            period,
            phase: quantized_phase,
        }
    }

    pub fn immortal() -> Self {
        Era::Immortal
    }

    /// Validate explicit period and phase values
    pub fn from_parts(period: u64, phase: u64) -> Result<Self, Error> {
        if !period.is_power_of_two() || !(MIN_PERIOD..=MAX_PERIOD).contains(&period) {
            return Err(Error::InvalidEra(format!(
                "period {period} must be a power of two in {MIN_PERIOD}..={MAX_PERIOD}"
            )));
        }
        let quantize_factor = (period >> 12).max(1);
        if phase >= period || phase % quantize_factor != 0 {
            return Err(Error::InvalidEra(format!(
                "phase {phase} invalid for period {period}"
            )));
        }
        Ok(Era::Mortal { period, phase })
    }

    pub fn is_immortal(&self) -> bool {
        matches!(self, Era::Immortal)
    }

    /// First block of the validity window containing `current`
    pub fn birth(&self, current: u64) -> u64 {
        match *self {
            Era::Immortal => 0,
            Era::Mortal { period, phase } => (current.max(phase) - phase) / period * period + phase,
        }
    }

    /// First block at which the transaction is no longer valid
    pub fn death(&self, current: u64) -> u64 {
        match *self {
            Era::Immortal => u64::MAX,
            Era::Mortal { period, .. } => self.birth(current) + period,
        }
    }
}

impl Encode for Era {
    fn encode_to<T: Output + ?Sized>(&self, output: &mut T) {
        match *self {
            Era::Immortal => output.push_byte(0),
            Era::Mortal { period, phase } => {
                let quantize_factor = (period >> 12).max(1);
                let low = (period.trailing_zeros().saturating_sub(1)).clamp(1, 15) as u16;
                let encoded = low | (((phase / quantize_factor) as u16) << 4);
                encoded.encode_to(output);
            }
        }
    }
}

impl Decode for Era {
    fn decode<I: Input>(input: &mut I) -> Result<Self, parity_scale_codec::Error> {
        let first = input.read_byte()?;
        if first == 0 {
            return Ok(Era::Immortal);
        }
        let encoded = first as u64 + ((input.read_byte()? as u64) << 8);
        let period = 2 << (encoded % (1 << 4));
        let quantize_factor = (period >> 12).max(1);
        let phase = (encoded >> 4) * quantize_factor;
        if period >= MIN_PERIOD && phase < period {
            Ok(Era::Mortal { period, phase })
        } else {
            Err("Invalid period and phase".into())
        }
    }
}
