//! Region normalization shared by every source.
//!
//! Hong Kong, Macao and Taiwan are reported by some providers as countries, by
//! others as provinces, by name or by ISO code. All of them end up in one shape:
//!
//! | field    | value                                                  |
//! |----------|--------------------------------------------------------|
//! | country  | `China`                                                |
//! | province | territory name (`Hong Kong`, `Macao`, `Taiwan`)        |
//! | city     | empty                                                  |
//! | district | raw province, city and district joined with spaces     |
//!
//! Every other country is folded onto the [country](crate::country) vocabulary.

use crate::country;

pub const TERRITORY_COUNTRY: &str = "China";

struct Territory {
    code: &'static str,
    name: &'static str,
}

const TERRITORIES: [Territory; 3] = [
    Territory {
        code: "HK",
        name: "Hong Kong",
    },
    Territory {
        code: "MO",
        name: "Macao",
    },
    Territory {
        code: "TW",
        name: "Taiwan",
    },
];

/// Location as reported by a source, before normalization
#[derive(Debug, Clone, Copy, Default)]
pub struct RawLocation<'a> {
    pub country: &'a str,
    pub province: &'a str,
    pub city: &'a str,
    pub district: &'a str,
    /// ISO 3166-1 alpha-2 code, used when `country` is empty or unrecognised
    pub country_code: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub country: String,
    pub province: String,
    pub city: String,
    pub district: String,
}

impl Location {
    pub fn as_raw(&self) -> RawLocation<'_> {
        RawLocation {
            country: &self.country,
            province: &self.province,
            city: &self.city,
            district: &self.district,
            country_code: None,
        }
    }
}

fn territory(raw: &RawLocation<'_>) -> Option<&'static Territory> {
    let code = match country::code_of(raw.country) {
        Some(code) => code,
        None => raw.country_code.and_then(country::code_of)?,
    };
    TERRITORIES.iter().find(|territory| territory.code == code)
}

pub fn normalize(raw: &RawLocation<'_>) -> Location {
    if let Some(territory) = territory(raw) {
        let mut parts: Vec<&str> = vec![];
        for part in [raw.province, raw.city, raw.district].map(str::trim) {
            let names_territory = part.eq_ignore_ascii_case(territory.name)
                || country::code_of(part) == Some(territory.code);
            if part.is_empty() || names_territory || parts.contains(&part) {
                continue;
            }
            parts.push(part);
        }
        return Location {
            country: TERRITORY_COUNTRY.to_owned(),
            province: territory.name.to_owned(),
            city: String::new(),
            district: parts.join(" "),
        };
    }

    let country = country::canonical_name(raw.country)
        .or_else(|| raw.country_code.and_then(country::canonical_name))
        .unwrap_or_default();
    if country.is_empty() && !raw.country.trim().is_empty() {
        log::debug!(r#"unknown country "{}" dropped"#, raw.country);
    }
    Location {
        country: country.to_owned(),
        province: raw.province.trim().to_owned(),
        city: raw.city.trim().to_owned(),
        district: raw.district.trim().to_owned(),
    }
}
