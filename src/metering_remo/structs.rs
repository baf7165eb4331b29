use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One appliance entry of the `/appliances` response. Everything except the
/// smart meter block is irrelevant here and left undeserialized.
#[derive(Deserialize, Debug, Clone)]
pub struct Appliance {
    pub smart_meter: Option<SmartMeter>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SmartMeter {
    pub echonetlite_properties: Vec<EchonetProperty>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct EchonetProperty {
    pub name: String,
    pub epc: u16,
    pub val: String,
    pub updated_at: DateTime<Utc>,
}

/// The metering values of one poll. Properties absent from the payload keep
/// their zero value for that cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EchonetLiteValue {
    /// Coefficient, EPC 0xD3 (211)
    pub coefficient: i64,
    /// Cumulative energy effective digits, EPC 0xD7 (215)
    pub effective_digits: i64,
    /// Normal direction cumulative energy, EPC 0xE0 (224), raw counter units
    pub normal_direction_cumulative_energy: f64,
    /// Cumulative energy unit, EPC 0xE1 (225), two hex digits
    pub cumulative_energy_unit: String,
    /// Reverse direction cumulative energy, EPC 0xE3 (227), raw counter units
    pub reverse_direction_cumulative_energy: f64,
    /// Measured instantaneous power, EPC 0xE7 (231), watts
    pub measured_instantaneous: f64,
}
