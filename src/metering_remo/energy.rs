use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Custom error types for the energy calculation
#[derive(Error, Debug)]
pub enum EnergyError {
    #[error("Malformed cumulative energy unit string: {0}")]
    MalformedUnitString(String),
    #[error("Invalid cumulative energy unit byte: {0:#04x}")]
    InvalidUnitCode(u8),
}

/// Convert the cumulative energy unit byte (EPC 0xE1) to the kWh value of
/// one counter tick. Every byte outside the defined table is an error.
pub fn convert_unit(code: u8) -> Result<f64, EnergyError> {
    return match code {
        0x00 => Ok(1.0),
        0x01 => Ok(0.1),
        0x02 => Ok(0.01),
        0x03 => Ok(0.001),
        0x04 => Ok(0.0001),
        0x0A => Ok(10.0),
        0x0B => Ok(100.0),
        0x0C => Ok(1000.0),
        0x0D => Ok(10000.0),
        _ => Err(EnergyError::InvalidUnitCode(code)),
    };
}

/// The unit arrives from the API as a two-hex-digit string.
pub fn decode_unit(unit: &str) -> Result<f64, EnergyError> {
    let bytes = hex::decode(unit)
        .map_err(|_| EnergyError::MalformedUnitString(unit.to_string()))?;

    if bytes.len() != 1 {
        return Err(EnergyError::MalformedUnitString(unit.to_string()));
    }

    return convert_unit(bytes[0]);
}

/// Consumption in kWh between two readings of the cumulative counter.
///
/// The counter is a fixed-width decimal register that silently wraps to zero
/// after 10^effective_digits - 1. A current reading below the previous one is
/// taken as exactly one wraparound within the interval; more than one wrap
/// per interval is not detectable from two samples and not corrected for.
pub fn calculate_energy_difference(
    current_energy: f64,
    previous_energy: f64,
    effective_digits: i64,
    coefficient: i64,
    cumulative_energy_unit: &str,
) -> Result<f64, EnergyError> {
    let energy_unit = decode_unit(cumulative_energy_unit)?;

    let max_counter_value = 10f64.powi(effective_digits as i32) - 1.0;

    let difference = if current_energy >= previous_energy {
        current_energy - previous_energy
    } else {
        current_energy - previous_energy + max_counter_value + 1.0
    };

    return Ok(difference * energy_unit * coefficient as f64);
}

/// Scheduling state for the hourly difference calculation, owned by the
/// polling loop. The baseline only moves when a difference is actually
/// computed, so polls in between read a deliberately stale baseline.
#[derive(Debug, Clone, Default)]
pub struct DeltaState {
    last_calculated: Option<DateTime<Utc>>,
    previous_energy: f64,
}

impl DeltaState {
    pub fn new() -> Self {
        return DeltaState {
            last_calculated: None,
            previous_energy: 0.0,
        };
    }

    pub fn is_seeded(&self) -> bool {
        return self.last_calculated.is_some();
    }

    pub fn previous_energy(&self) -> f64 {
        return self.previous_energy;
    }

    /// First ever sample: start tracking without emitting a difference.
    pub fn seed(&mut self, now: DateTime<Utc>, current_energy: f64) {
        self.last_calculated = Some(now);
        self.previous_energy = current_energy;
    }

    /// At least one hour has to pass between difference calculations.
    pub fn delta_due(&self, now: DateTime<Utc>) -> bool {
        return match self.last_calculated {
            Some(last) => now >= last + Duration::hours(1),
            None => false,
        };
    }

    /// Move the baseline forward after a difference has been computed and
    /// emitted. Not called on failed calculations.
    pub fn commit(&mut self, now: DateTime<Utc>, current_energy: f64) {
        self.last_calculated = Some(now);
        self.previous_energy = current_energy;
    }
}
