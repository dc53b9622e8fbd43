use crate::region::{normalize, RawLocation};

use serde::Serialize;
use std::fmt;

/// Normalized answer for a single address, identical in shape for every source
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoResult {
    /// Digits only, without the `AS` prefix
    pub as_number: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
    pub organization: String,
    /// Zero when unknown
    pub latitude: f64,
    /// Zero when unknown
    pub longitude: f64,
}

/// Fields as extracted from a source, before normalization
#[derive(Debug, Clone, Default)]
pub struct RawGeo {
    pub asn: String,
    pub country: String,
    pub country_code: Option<String>,
    pub province: String,
    pub city: String,
    pub district: String,
    pub organization: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<RawGeo> for GeoResult {
    fn from(raw: RawGeo) -> Self {
        let location = normalize(&RawLocation {
            country: &raw.country,
            province: &raw.province,
            city: &raw.city,
            district: &raw.district,
            country_code: raw.country_code.as_deref(),
        });
        Self {
            as_number: asn_digits(&raw.asn).to_owned(),
            country: location.country,
            province: location.province,
            city: location.city,
            district: location.district,
            organization: raw.organization.trim().to_owned(),
            latitude: raw.latitude,
            longitude: raw.longitude,
        }
    }
}

impl fmt::Display for GeoResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let asn = match self.as_number.as_str() {
            "" => String::new(),
            digits => format!("AS{digits}"),
        };
        for part in [
            asn.as_str(),
            self.country.as_str(),
            self.province.as_str(),
            self.city.as_str(),
            self.district.as_str(),
            self.organization.as_str(),
        ] {
            if part.is_empty() {
                continue;
            }
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(part)?;
            first = false;
        }
        Ok(())
    }
}

/// First run of decimal digits, so "AS15169 Google LLC" becomes "15169"
pub fn asn_digits(s: &str) -> &str {
    let start = match s.find(|c: char| c.is_ascii_digit()) {
        Some(start) => start,
        None => return "",
    };
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    &rest[..end]
}

/// Coordinates arrive as JSON numbers or as numeric strings; anything else is unknown
pub fn coordinate(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
    .unwrap_or_default()
}

/// String form of a scalar JSON field; numbers are printed, anything else is empty
pub fn text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_owned(),
        serde_json::Value::Number(number) => number.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn asn() {
        assert_eq!(asn_digits("AS15169 Google LLC"), "15169");
        assert_eq!(asn_digits("AS4134"), "4134");
        assert_eq!(asn_digits("13335"), "13335");
        assert_eq!(asn_digits(""), "");
        assert_eq!(asn_digits("no number"), "");
    }

    #[test]
    fn coordinates() {
        assert_eq!(coordinate(&json!(37.386)), 37.386);
        assert_eq!(coordinate(&json!("-122.0838")), -122.0838);
        assert_eq!(coordinate(&json!(" 1.5 ")), 1.5);
        assert_eq!(coordinate(&json!("north")), 0.0);
        assert_eq!(coordinate(&json!(null)), 0.0);
        assert_eq!(coordinate(&json!("NaN")), 0.0);
    }

    #[test]
    fn texts() {
        assert_eq!(text(&json!(" Mountain View ")), "Mountain View");
        assert_eq!(text(&json!(15169)), "15169");
        assert_eq!(text(&json!(null)), "");
        assert_eq!(text(&json!({"nested": true})), "");
    }

    #[test]
    fn conversion_normalizes() {
        let result: GeoResult = RawGeo {
            asn: "AS9269 Hong Kong Broadband Network Ltd.".into(),
            country: "Hong Kong".into(),
            province: "Kowloon".into(),
            city: "Mong Kok".into(),
            organization: " HKBN ".into(),
            latitude: 22.3,
            longitude: 114.2,
            ..Default::default()
        }
        .into();
        assert_eq!(result.as_number, "9269");
        assert_eq!(result.country, "China");
        assert_eq!(result.province, "Hong Kong");
        assert_eq!(result.city, "");
        assert_eq!(result.district, "Kowloon Mong Kok");
        assert_eq!(result.organization, "HKBN");
        assert_eq!(result.latitude, 22.3);
        assert_eq!(
            result.to_string(),
            "AS9269 China Hong Kong Kowloon Mong Kok HKBN"
        );
    }
}
