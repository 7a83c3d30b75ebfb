//! Axis-aligned bounding boxes accumulated over coordinate streams.
//!
//! Accumulators are seeded with deliberately inverted extents so the first
//! recorded coordinate always collapses the box onto itself. `geo::Rect`
//! normalises its corners and therefore cannot represent the inverted seed,
//! hence the dedicated type; [`Bounds::to_rect`] converts once the box is
//! valid.

use geo::{Coord, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Running axis-aligned bounding box over a stream of coordinates.
///
/// Coordinates are WGS84 with `x = longitude` and `y = latitude` for the
/// geographic seed; [`Bounds::seeded`] supports other coordinate domains.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use regionmap_core::Bounds;
///
/// let mut bounds = Bounds::geographic();
/// bounds.include(Coord { x: 1.0, y: 5.0 });
/// bounds.include(Coord { x: -2.0, y: 3.0 });
/// bounds.include(Coord { x: 4.0, y: -1.0 });
///
/// assert_eq!(bounds, Bounds::seeded(-2.0, -1.0, 4.0, 5.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    /// Smallest x seen so far.
    pub min_x: f64,
    /// Smallest y seen so far.
    pub min_y: f64,
    /// Largest x seen so far.
    pub max_x: f64,
    /// Largest y seen so far.
    pub max_y: f64,
}

impl Bounds {
    /// Inverted seed covering the WGS84 longitude/latitude domain.
    ///
    /// Any in-range coordinate narrows the box onto itself, so no separate
    /// "empty" state is needed.
    #[must_use]
    pub const fn geographic() -> Self {
        Self::seeded(180.0, 90.0, -180.0, -90.0)
    }

    /// Seed an accumulator with explicit extents.
    ///
    /// Pass an inverted seed (minimums above maximums) for running
    /// accumulation in non-geographic coordinate domains.
    #[must_use]
    pub const fn seeded(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Fold a coordinate iterator over the given seed.
    ///
    /// # Examples
    /// ```
    /// use geo::Coord;
    /// use regionmap_core::Bounds;
    ///
    /// let bounds = Bounds::from_points(
    ///     Bounds::geographic(),
    ///     [Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: -3.0 }],
    /// );
    /// assert_eq!(bounds, Bounds::seeded(0.0, -3.0, 2.0, 0.0));
    /// ```
    #[must_use]
    pub fn from_points<I>(seed: Self, points: I) -> Self
    where
        I: IntoIterator<Item = Coord<f64>>,
    {
        let mut bounds = seed;
        for point in points {
            bounds.include(point);
        }
        bounds
    }

    /// Widen the box to cover `point`. Pure running min/max.
    pub fn include(&mut self, point: Coord<f64>) {
        self.min_x = self.min_x.min(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_x = self.max_x.max(point.x);
        self.max_y = self.max_y.max(point.y);
    }

    /// Widen the box to cover `other` (componentwise min/max union).
    pub fn extend(&mut self, other: &Self) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Componentwise union of two boxes.
    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        self.extend(other);
        self
    }

    /// Report whether the box holds at least one coordinate on both axes.
    ///
    /// A freshly seeded accumulator is invalid until the first `include`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    /// Convert to a normalised rectangle, or `None` while still inverted.
    #[must_use]
    pub fn to_rect(&self) -> Option<Rect<f64>> {
        self.is_valid().then(|| {
            Rect::new(
                Coord {
                    x: self.min_x,
                    y: self.min_y,
                },
                Coord {
                    x: self.max_x,
                    y: self.max_y,
                },
            )
        })
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::geographic()
    }
}
