//! Region identity and cleaned attribute types.

use std::collections::BTreeMap;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cleaned attribute names and values of one record.
///
/// Ordered so serialised metadata is deterministic.
pub type AttributeMap = BTreeMap<String, String>;

/// Opaque identifier a sink issues for a persisted region.
///
/// Only meaningful to the sink that returned it; subsequent
/// [`part`](crate::RegionSink::part) calls hand it back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionId(i64);

impl RegionId {
    /// Wrap a backend row identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The underlying backend row identifier.
    #[must_use]
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

/// Errors returned by [`RegionAttributes::new`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegionAttributesError {
    /// The geographic identifier was empty after trimming.
    #[error("region identifier must not be empty")]
    EmptyGeoid,
}

/// The cleaned, validated attribute set of one region record.
///
/// # Examples
/// ```
/// use regionmap_core::RegionAttributes;
///
/// # fn main() -> Result<(), regionmap_core::RegionAttributesError> {
/// let attributes = RegionAttributes::new("53033")?
///     .with_name(Some("King County".into()))
///     .with_land_area(Some(5.48e9));
/// assert_eq!(attributes.geoid, "53033");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionAttributes {
    /// Externally supplied geographic identifier; non-empty.
    pub geoid: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional land area in square length units.
    pub land_area: Option<f64>,
    /// The full cleaned attribute set the record arrived with.
    pub metadata: AttributeMap,
}

impl RegionAttributes {
    /// Validate and construct an attribute set around its identifier.
    pub fn new<S: Into<String>>(geoid: S) -> Result<Self, RegionAttributesError> {
        let geoid = geoid.into();
        if geoid.trim().is_empty() {
            return Err(RegionAttributesError::EmptyGeoid);
        }
        Ok(Self {
            geoid,
            name: None,
            land_area: None,
            metadata: AttributeMap::new(),
        })
    }

    /// Attach an optional display name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Attach an optional land area.
    #[must_use]
    pub fn with_land_area(mut self, land_area: Option<f64>) -> Self {
        self.land_area = land_area;
        self
    }

    /// Attach the full cleaned attribute set as metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: AttributeMap) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("\t\n")]
    fn rejects_blank_geoid(#[case] geoid: &str) {
        let result = RegionAttributes::new(geoid);
        assert_eq!(result, Err(RegionAttributesError::EmptyGeoid));
    }

    #[rstest]
    fn builds_with_optional_fields() {
        let attributes = RegionAttributes::new("06075")
            .expect("valid geoid")
            .with_name(Some("San Francisco".into()))
            .with_land_area(Some(1.21e8))
            .with_metadata(AttributeMap::from([(
                "GEOID10".into(),
                "06075".into(),
            )]));
        assert_eq!(attributes.name.as_deref(), Some("San Francisco"));
        assert_eq!(attributes.land_area, Some(1.21e8));
        assert_eq!(attributes.metadata.get("GEOID10").map(String::as_str), Some("06075"));
    }

    #[rstest]
    fn region_id_round_trips() {
        assert_eq!(RegionId::new(42).into_inner(), 42);
    }
}
