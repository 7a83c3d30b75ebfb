//! Test-only, in-memory [`RegionSink`] used by unit and behaviour tests.

use geo::Coord;

use crate::{Bounds, FinaliseReport, RegionAttributes, RegionId, RegionSink, SinkError};

/// A region captured by [`MemoryRegionSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRegion {
    /// Attributes the region was registered with.
    pub attributes: RegionAttributes,
    /// Placeholder until finalise, then the union of the parts' bounds.
    pub bounds: Bounds,
}

/// A part captured by [`MemoryRegionSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPart {
    /// Index of the owning region in insertion order.
    pub region: RegionId,
    /// Bounding box of the part's original point stream.
    pub bounds: Bounds,
    /// The simplified point sequence.
    pub points: Vec<Coord<f64>>,
}

/// In-memory `RegionSink` applying the same contract checks as persistent
/// backends; intended only for small datasets in tests.
#[derive(Debug, Default)]
pub struct MemoryRegionSink {
    regions: Vec<StoredRegion>,
    parts: Vec<StoredPart>,
    finalised: bool,
}

impl MemoryRegionSink {
    /// Regions in insertion order.
    #[must_use]
    pub fn regions(&self) -> &[StoredRegion] {
        &self.regions
    }

    /// Parts in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[StoredPart] {
        &self.parts
    }

    /// Whether `finalise` has run.
    #[must_use]
    pub const fn is_finalised(&self) -> bool {
        self.finalised
    }

    fn expect_accumulating(&self, operation: &'static str) -> Result<(), SinkError> {
        if self.finalised {
            return Err(SinkError::Finalised { operation });
        }
        Ok(())
    }
}

impl RegionSink for MemoryRegionSink {
    fn region(&mut self, attributes: &RegionAttributes) -> Result<RegionId, SinkError> {
        self.expect_accumulating("region")?;
        self.regions.push(StoredRegion {
            attributes: attributes.clone(),
            bounds: Bounds::geographic(),
        });
        Ok(RegionId::new(self.regions.len() as i64))
    }

    fn part(
        &mut self,
        region: RegionId,
        bounds: Bounds,
        points: &[Coord<f64>],
    ) -> Result<(), SinkError> {
        self.expect_accumulating("part")?;
        if self.regions.is_empty() {
            return Err(SinkError::PartBeforeRegion);
        }
        let id = region.into_inner();
        if id < 1 || id as usize > self.regions.len() {
            return Err(SinkError::UnknownRegion { id });
        }
        if !bounds.is_valid() {
            return Err(SinkError::InvalidBounds {
                min_x: bounds.min_x,
                min_y: bounds.min_y,
                max_x: bounds.max_x,
                max_y: bounds.max_y,
            });
        }
        if points.is_empty() {
            return Err(SinkError::EmptyPart);
        }
        self.parts.push(StoredPart {
            region,
            bounds,
            points: points.to_vec(),
        });
        Ok(())
    }

    fn finalise(&mut self) -> Result<FinaliseReport, SinkError> {
        self.expect_accumulating("finalise")?;
        self.finalised = true;

        let mut regions_without_parts = Vec::new();
        for (index, region) in self.regions.iter_mut().enumerate() {
            let id = RegionId::new((index + 1) as i64);
            let mut bounds = Bounds::geographic();
            let mut has_parts = false;
            for part in self.parts.iter().filter(|part| part.region == id) {
                bounds.extend(&part.bounds);
                has_parts = true;
            }
            if has_parts {
                region.bounds = bounds;
            } else {
                regions_without_parts.push(region.attributes.geoid.clone());
            }
        }

        Ok(FinaliseReport {
            regions: self.regions.len() as u64,
            parts: self.parts.len() as u64,
            regions_without_parts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn attributes() -> RegionAttributes {
        RegionAttributes::new("53033").expect("valid geoid")
    }

    fn unit_square() -> (Bounds, Vec<Coord<f64>>) {
        (
            Bounds::seeded(0.0, 0.0, 1.0, 1.0),
            vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }],
        )
    }

    #[rstest]
    fn part_before_region_is_rejected() {
        let mut sink = MemoryRegionSink::default();
        let (bounds, points) = unit_square();
        let err = sink
            .part(RegionId::new(1), bounds, &points)
            .expect_err("part before region must fail");
        assert!(matches!(err, SinkError::PartBeforeRegion));
    }

    #[rstest]
    fn unknown_region_is_rejected(attributes: RegionAttributes) {
        let mut sink = MemoryRegionSink::default();
        sink.region(&attributes).expect("register region");
        let (bounds, points) = unit_square();
        let err = sink
            .part(RegionId::new(7), bounds, &points)
            .expect_err("unknown id must fail");
        assert!(matches!(err, SinkError::UnknownRegion { id: 7 }));
    }

    #[rstest]
    fn calls_after_finalise_fail(attributes: RegionAttributes) {
        let mut sink = MemoryRegionSink::default();
        let region = sink.region(&attributes).expect("register region");
        let (bounds, points) = unit_square();
        sink.part(region, bounds, &points).expect("store part");
        sink.finalise().expect("finalise");

        assert!(matches!(
            sink.region(&attributes),
            Err(SinkError::Finalised { operation: "region" })
        ));
        assert!(matches!(
            sink.part(region, bounds, &points),
            Err(SinkError::Finalised { operation: "part" })
        ));
        assert!(matches!(
            sink.finalise(),
            Err(SinkError::Finalised {
                operation: "finalise"
            })
        ));
    }

    #[rstest]
    fn rejects_invalid_parts(attributes: RegionAttributes) {
        let mut sink = MemoryRegionSink::default();
        let region = sink.region(&attributes).expect("register region");
        let (bounds, points) = unit_square();

        let err = sink
            .part(region, Bounds::geographic(), &points)
            .expect_err("inverted bounds must fail");
        assert!(matches!(err, SinkError::InvalidBounds { .. }));

        let err = sink.part(region, bounds, &[]).expect_err("empty part must fail");
        assert!(matches!(err, SinkError::EmptyPart));
    }

    #[rstest]
    fn finalise_unions_part_bounds(attributes: RegionAttributes) {
        let mut sink = MemoryRegionSink::default();
        let region = sink.region(&attributes).expect("register region");
        sink.part(
            region,
            Bounds::seeded(-1.0, 0.0, 2.0, 3.0),
            &[Coord { x: -1.0, y: 0.0 }],
        )
        .expect("store first part");
        sink.part(
            region,
            Bounds::seeded(0.0, -4.0, 5.0, 1.0),
            &[Coord { x: 5.0, y: -4.0 }],
        )
        .expect("store second part");

        let report = sink.finalise().expect("finalise");
        assert_eq!(report.regions, 1);
        assert_eq!(report.parts, 2);
        assert!(report.regions_without_parts.is_empty());
        assert_eq!(
            sink.regions()[0].bounds,
            Bounds::seeded(-1.0, -4.0, 5.0, 3.0)
        );
    }

    #[rstest]
    fn finalise_surfaces_partless_regions(attributes: RegionAttributes) {
        let mut sink = MemoryRegionSink::default();
        sink.region(&attributes).expect("register region");
        let report = sink.finalise().expect("finalise");
        assert_eq!(report.regions_without_parts, vec!["53033".to_owned()]);
    }
}
