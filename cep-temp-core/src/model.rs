use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt};

use crate::error::Error;

/// A Brazilian postal code: exactly eight ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for PostalCode {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::Validation(value.to_string()))
        }
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reading in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub celsius: f64,
}

impl Temperature {
    pub fn from_celsius(celsius: f64) -> Self {
        Self { celsius }
    }

    pub fn fahrenheit(&self) -> f64 {
        self.celsius * 1.8 + 32.0
    }

    pub fn kelvin(&self) -> f64 {
        self.celsius + 273.15
    }
}

/// The body returned to callers on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReport {
    #[serde(rename = "temp_C")]
    pub celsius: f64,
    #[serde(rename = "temp_F")]
    pub fahrenheit: f64,
    #[serde(rename = "temp_K")]
    pub kelvin: f64,
}

impl From<Temperature> for TemperatureReport {
    fn from(t: Temperature) -> Self {
        Self {
            celsius: t.celsius,
            fahrenheit: round2(t.fahrenheit()),
            kelvin: round2(t.kelvin()),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_eight_digits() {
        let cep = PostalCode::try_from("01001000").expect("valid cep");
        assert_eq!(cep.as_str(), "01001000");
    }

    #[test]
    fn rejects_malformed_codes() {
        for bad in ["123", "123456789", "0100100a", "01001-00", "", "٠١٠٠١٠٠٠"] {
            let err = PostalCode::try_from(bad).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn report_converts_and_rounds() {
        let report = TemperatureReport::from(Temperature::from_celsius(25.0));

        assert_eq!(report.celsius, 25.0);
        assert_eq!(report.fahrenheit, 77.0);
        assert_eq!(report.kelvin, 298.15);
    }

    #[test]
    fn report_serializes_with_unit_keys() {
        let report = TemperatureReport::from(Temperature::from_celsius(-3.5));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["temp_C"], -3.5);
        assert_eq!(json["temp_F"], 25.7);
        assert_eq!(json["temp_K"], 269.65);
    }
}
