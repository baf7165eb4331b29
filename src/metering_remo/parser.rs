use crate::metering_remo::structs::{Appliance, EchonetLiteValue, EchonetProperty, SmartMeter};
use thiserror::Error;

/* Echonet Lite EPC codes of the low voltage smart electric energy meter class */
const EPC_COEFFICIENT: u16 = 211;                       /* 0xD3 */
const EPC_EFFECTIVE_DIGITS: u16 = 215;                  /* 0xD7 */
const EPC_NORMAL_DIRECTION_CUMULATIVE: u16 = 224;       /* 0xE0 */
const EPC_CUMULATIVE_ENERGY_UNIT: u16 = 225;            /* 0xE1 */
const EPC_REVERSE_DIRECTION_CUMULATIVE: u16 = 227;      /* 0xE3 */
const EPC_MEASURED_INSTANTANEOUS: u16 = 231;            /* 0xE7 */

/// Custom error types for response parsing
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed appliances response: {0}")]
    DeserializationFailed(#[from] serde_json::Error),
    #[error("Appliances response contains no smart meter")]
    NoSmartMeter,
    #[error("Value for EPC {0} is not numeric: {1}")]
    NumericParseFailed(u16, String),
}

/// Pull the smart meter block out of the appliances response. The meter is
/// expected on the first appliance entry.
pub fn smart_meter_from_response(body: &str) -> Result<SmartMeter, ParseError> {
    let appliances: Vec<Appliance> = serde_json::from_str(body)?;

    return match appliances.into_iter().next() {
        Some(Appliance { smart_meter: Some(meter) }) => Ok(meter),
        _ => Err(ParseError::NoSmartMeter),
    };
}

fn parse_integer(property: &EchonetProperty) -> Result<i64, ParseError> {
    return property.val.parse::<i64>()
        .map_err(|_| ParseError::NumericParseFailed(property.epc, property.val.clone()));
}

fn parse_float(property: &EchonetProperty) -> Result<f64, ParseError> {
    return property.val.parse::<f64>()
        .map_err(|_| ParseError::NumericParseFailed(property.epc, property.val.clone()));
}

/// Fill an `EchonetLiteValue` from the property list. Only the six known EPC
/// codes are picked up, anything else is ignored so new firmware properties
/// do not break the export. Duplicate codes overwrite sequentially.
pub fn extract_values(properties: &[EchonetProperty]) -> Result<EchonetLiteValue, ParseError> {
    let mut value = EchonetLiteValue::default();

    for property in properties {
        match property.epc {
            EPC_COEFFICIENT => {
                value.coefficient = parse_integer(property)?;
            },
            EPC_EFFECTIVE_DIGITS => {
                value.effective_digits = parse_integer(property)?;
            },
            EPC_NORMAL_DIRECTION_CUMULATIVE => {
                value.normal_direction_cumulative_energy = parse_float(property)?;
            },
            EPC_CUMULATIVE_ENERGY_UNIT => {
                value.cumulative_energy_unit = property.val.clone();
            },
            EPC_REVERSE_DIRECTION_CUMULATIVE => {
                value.reverse_direction_cumulative_energy = parse_float(property)?;
            },
            EPC_MEASURED_INSTANTANEOUS => {
                value.measured_instantaneous = parse_float(property)?;
            },
            _ => {},
        }
    }

    return Ok(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn property(epc: u16, val: &str) -> EchonetProperty {
        return EchonetProperty {
            name: format!("epc_{}", epc),
            epc,
            val: val.to_string(),
            updated_at: Utc::now(),
        };
    }

    #[test]
    fn test_extract_all_known_codes() {
        let properties = vec![
            property(211, "1"),
            property(215, "8"),
            property(224, "12345"),
            property(225, "01"),
            property(227, "42"),
            property(231, "498"),
        ];

        let value = extract_values(&properties).unwrap();
        assert_eq!(value.coefficient, 1);
        assert_eq!(value.effective_digits, 8);
        assert_eq!(value.normal_direction_cumulative_energy, 12345.0);
        assert_eq!(value.cumulative_energy_unit, "01");
        assert_eq!(value.reverse_direction_cumulative_energy, 42.0);
        assert_eq!(value.measured_instantaneous, 498.0);
    }

    #[test]
    fn test_extract_unknown_codes_ignored() {
        let properties = vec![
            property(128, "48"),
            property(224, "12345"),
            property(136, "whatever"),
        ];

        let value = extract_values(&properties).unwrap();
        assert_eq!(value.normal_direction_cumulative_energy, 12345.0);
        assert_eq!(value.coefficient, 0);
        assert_eq!(value.cumulative_energy_unit, "");
    }

    #[test]
    fn test_extract_duplicate_last_wins() {
        let properties = vec![
            property(224, "100"),
            property(224, "200"),
        ];

        let value = extract_values(&properties).unwrap();
        assert_eq!(value.normal_direction_cumulative_energy, 200.0);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let properties = vec![
            property(211, "1"),
            property(224, "12345"),
            property(225, "01"),
        ];

        let first = extract_values(&properties).unwrap();
        let second = extract_values(&properties).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_numeric_failure() {
        let properties = vec![property(224, "not-a-number")];
        let result = extract_values(&properties);
        assert!(matches!(result, Err(ParseError::NumericParseFailed(224, _))));
    }

    #[test]
    fn test_smart_meter_from_response() {
        let body = r#"[
            {
                "smart_meter": {
                    "echonetlite_properties": [
                        { "name": "coefficient", "epc": 211, "val": "1", "updated_at": "2024-05-01T12:00:00Z" }
                    ]
                }
            }
        ]"#;

        let meter = smart_meter_from_response(body).unwrap();
        assert_eq!(meter.echonetlite_properties.len(), 1);
        assert_eq!(meter.echonetlite_properties[0].epc, 211);
    }

    #[test]
    fn test_smart_meter_missing() {
        assert!(matches!(smart_meter_from_response("[]"), Err(ParseError::NoSmartMeter)));
        assert!(matches!(smart_meter_from_response("[{}]"), Err(ParseError::NoSmartMeter)));
        assert!(matches!(smart_meter_from_response("not json"), Err(ParseError::DeserializationFailed(_))));
    }
}
