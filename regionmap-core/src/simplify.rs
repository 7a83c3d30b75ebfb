//! Collinear-point elimination for boundary part geometry.
//!
//! The simplifier walks a part's coordinates once, keeping a running output
//! sequence. A candidate point only ever evicts the most recently kept point,
//! so a straight run collapses to its endpoints while the first and last
//! coordinates of the input always survive. The operation is lossy; nothing
//! reconstructs the original sequence from the output.

use geo::Coord;
use thiserror::Error;

/// Default collinearity tolerance, in coordinate units.
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// Denominator used for the middle-to-candidate gradient check.
///
/// The historic importer computed that gradient against the previous point's
/// x-coordinate where the geometry calls for its y-coordinate. `Legacy`
/// preserves the historic behaviour so stores stay byte-compatible;
/// `Geometric` applies the y-coordinate form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlopeConvention {
    /// Reproduce the historic importer's x-coordinate denominator.
    #[default]
    Legacy,
    /// Use the geometrically consistent y-coordinate denominator.
    Geometric,
}

/// Errors returned by [`Simplifier::new`].
#[derive(Debug, Error, PartialEq)]
pub enum SimplifyError {
    /// The tolerance was negative or not finite.
    #[error("collinearity tolerance must be finite and non-negative, got {tolerance}")]
    InvalidTolerance {
        /// The rejected tolerance value.
        tolerance: f64,
    },
}

/// Reduces ordered point sequences using a collinearity tolerance.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use regionmap_core::Simplifier;
///
/// # fn main() -> Result<(), regionmap_core::SimplifyError> {
/// let simplifier = Simplifier::new(0.01)?;
/// let kept = simplifier.simplify(&[
///     Coord { x: 0.0, y: 0.0 },
///     Coord { x: 1.0, y: 1.0 },
///     Coord { x: 2.0, y: 2.0 },
/// ]);
/// assert_eq!(kept, vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 2.0 }]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Simplifier {
    tolerance: f64,
    convention: SlopeConvention,
}

impl Simplifier {
    /// Validate and construct a simplifier.
    ///
    /// A tolerance of zero disables simplification entirely; [`simplify`]
    /// then returns its input unchanged.
    ///
    /// [`simplify`]: Simplifier::simplify
    pub fn new(tolerance: f64) -> Result<Self, SimplifyError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SimplifyError::InvalidTolerance { tolerance });
        }
        Ok(Self {
            tolerance,
            convention: SlopeConvention::default(),
        })
    }

    /// Select the gradient denominator convention.
    #[must_use]
    pub const fn with_slope_convention(mut self, convention: SlopeConvention) -> Self {
        self.convention = convention;
        self
    }

    /// The configured collinearity tolerance.
    #[must_use]
    pub const fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Reduce `points`, keeping endpoints and evicting interior points that
    /// extend a straight run within the tolerance.
    ///
    /// The output never exceeds the input length, and the first and last
    /// input points always appear in the output.
    #[must_use]
    pub fn simplify(&self, points: &[Coord<f64>]) -> Vec<Coord<f64>> {
        if self.tolerance == 0.0 {
            return points.to_vec();
        }

        let mut kept: Vec<Coord<f64>> = Vec::with_capacity(points.len());
        for (index, point) in points.iter().copied().enumerate() {
            // The first two input points are seeded without evaluation.
            if index >= 2
                && let [.., before, last] = kept.as_slice()
                && self.extends_straight_run(*before, *last, point)
            {
                kept.pop();
            }
            kept.push(point);
        }
        kept
    }

    /// Whether `candidate` continues the straight run ending at `last`.
    ///
    /// Gradients are compared pairwise across the three points. A zero
    /// denominator yields a non-finite gradient whose comparisons are all
    /// false, so degenerate geometry keeps the point rather than erroring.
    fn extends_straight_run(
        &self,
        before: Coord<f64>,
        last: Coord<f64>,
        candidate: Coord<f64>,
    ) -> bool {
        let outer = (candidate.x - before.x) / (candidate.y - before.y);
        let first = (last.x - before.x) / (last.y - before.y);
        let second_denominator = match self.convention {
            SlopeConvention::Legacy => candidate.y - last.x,
            SlopeConvention::Geometric => candidate.y - last.y,
        };
        let second = (candidate.x - last.x) / second_denominator;

        (first - outer).abs() < self.tolerance && (second - outer).abs() < self.tolerance
    }
}

impl Default for Simplifier {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            convention: SlopeConvention::default(),
        }
    }
}
