//! Attribute normalisation for decoded boundary records.
//!
//! Values arrive as raw bytes from the decoder. Bytes that already form
//! valid UTF-8 are taken verbatim; anything else is re-decoded as ISO-8859-1,
//! the encoding the upstream datasets declare. Every value is trimmed of
//! surrounding whitespace before use.

use std::collections::BTreeMap;

use encoding_rs::mem::decode_latin1;
use thiserror::Error;

use regionmap_core::{AttributeMap, RegionAttributes};

/// Errors raised when a record's attributes cannot identify a region.
///
/// Both variants carry the cleaned attribute set so callers can report the
/// offending record without re-decoding it.
#[derive(Debug, Error)]
pub enum AttributeError {
    /// No identifier field was present.
    #[error("record has no region identifier field")]
    MissingIdentifier {
        /// The cleaned attributes of the rejected record.
        attributes: AttributeMap,
    },
    /// The identifier field was empty after trimming.
    #[error("record region identifier is empty")]
    EmptyIdentifier {
        /// The cleaned attributes of the rejected record.
        attributes: AttributeMap,
    },
}

impl AttributeError {
    /// The cleaned attribute set of the rejected record.
    #[must_use]
    pub fn attributes(&self) -> &AttributeMap {
        match self {
            Self::MissingIdentifier { attributes } | Self::EmptyIdentifier { attributes } => {
                attributes
            }
        }
    }
}

/// Clean one record's raw attributes and extract the region fields.
///
/// The identifier is required; the display name and land area are optional
/// (an unparseable area is treated as absent, not as an error). The full
/// cleaned map is attached as metadata.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use regionmap_data::normalise_attributes;
///
/// let raw = BTreeMap::from([
///     ("GEOID10".to_owned(), b" 53033 ".to_vec()),
///     ("NAME10".to_owned(), b"King".to_vec()),
///     ("ALAND10".to_owned(), b"5486357013".to_vec()),
/// ]);
/// let attributes = normalise_attributes(&raw).expect("identifier present");
/// assert_eq!(attributes.geoid, "53033");
/// assert_eq!(attributes.name.as_deref(), Some("King"));
/// assert_eq!(attributes.land_area, Some(5_486_357_013.0));
/// ```
pub fn normalise_attributes(
    raw: &BTreeMap<String, Vec<u8>>,
) -> Result<RegionAttributes, AttributeError> {
    let cleaned: AttributeMap = raw
        .iter()
        .map(|(key, value)| (key.clone(), decode_value(value)))
        .collect();

    let geoid = field(&cleaned, "GEOID").map(ToOwned::to_owned);
    let Some(geoid) = geoid else {
        return Err(AttributeError::MissingIdentifier {
            attributes: cleaned,
        });
    };
    if geoid.is_empty() {
        return Err(AttributeError::EmptyIdentifier {
            attributes: cleaned,
        });
    }

    let name = field(&cleaned, "NAME")
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned);
    let land_area = field(&cleaned, "ALAND").and_then(|value| value.parse::<f64>().ok());

    Ok(RegionAttributes {
        geoid,
        name,
        land_area,
        metadata: cleaned,
    })
}

fn decode_value(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(value) => value.trim().to_owned(),
        Err(_) => decode_latin1(raw).trim().to_owned(),
    }
}

/// Look up `base` tolerating a numeric vintage suffix (`GEOID`, `GEOID10`,
/// `GEOID20`, ...). Earlier vintages suffix every field with the census
/// year's last two digits; later ones drop the suffix.
fn field<'a>(attributes: &'a AttributeMap, base: &str) -> Option<&'a str> {
    attributes.iter().find_map(|(key, value)| {
        key_matches(key, base).then_some(value.as_str())
    })
}

fn key_matches(key: &str, base: &str) -> bool {
    key.strip_prefix(base)
        .is_some_and(|suffix| suffix.is_empty() || suffix.bytes().all(|byte| byte.is_ascii_digit()))
}
