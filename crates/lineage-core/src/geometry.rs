//! Half-spaces and convex polytopes used by range queries.

use crate::error::SpatialError;
use crate::id::Point;

/// An oriented hyperplane `normal · x = distance`.
///
/// A point is *above* (inside the half-space) when `normal · x >= distance`.
/// The normal is expected to be unit length; nothing here depends on it,
/// but distances reported to users only make sense for unit normals.
#[derive(Clone, Debug, PartialEq)]
pub struct HyperPlane {
    normal: Point,
    distance: f64,
}

impl HyperPlane {
    /// Create a hyperplane from its normal and signed offset.
    pub fn new(normal: &[f64], distance: f64) -> Self {
        Self {
            normal: Point::from_slice(normal),
            distance,
        }
    }

    /// Create a hyperplane from a row `[n_0, ..., n_{d-1}, distance]`.
    pub fn from_row(row: &[f64]) -> Self {
        let (normal, distance) = match row.split_last() {
            Some((&m, normal)) => (Point::from_slice(normal), m),
            None => (Point::new(), 0.0),
        };
        Self { normal, distance }
    }

    /// The plane normal.
    pub fn normal(&self) -> &[f64] {
        &self.normal
    }

    /// The signed offset along the normal.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Dimensionality of the plane.
    pub fn num_dimensions(&self) -> usize {
        self.normal.len()
    }

    /// `normal · point`.
    pub fn dot(&self, point: &[f64]) -> f64 {
        self.normal.iter().zip(point).map(|(n, x)| n * x).sum()
    }

    /// Whether `point` lies in the closed half-space above the plane.
    pub fn is_above(&self, point: &[f64]) -> bool {
        self.dot(point) >= self.distance
    }
}

/// An intersection of half-spaces.
///
/// The polytope with no planes contains every point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvexPolytope {
    planes: Vec<HyperPlane>,
}

impl ConvexPolytope {
    /// Create a polytope, checking that all planes share one dimensionality.
    pub fn new(planes: Vec<HyperPlane>) -> Result<Self, SpatialError> {
        if let Some(first) = planes.first() {
            let expected = first.num_dimensions();
            if let Some(bad) = planes.iter().find(|p| p.num_dimensions() != expected) {
                return Err(SpatialError::DimensionMismatch {
                    expected,
                    found: bad.num_dimensions(),
                });
            }
        }
        Ok(Self { planes })
    }

    /// Create a polytope from rows `[n_0, ..., n_{d-1}, distance]`.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, SpatialError> {
        Self::new(rows.iter().map(|r| HyperPlane::from_row(r.as_ref())).collect())
    }

    /// The axis-aligned box `[min, max]` as 2n inward-facing planes.
    pub fn from_box(min: &[f64], max: &[f64]) -> Result<Self, SpatialError> {
        if min.len() != max.len() {
            return Err(SpatialError::DimensionMismatch {
                expected: min.len(),
                found: max.len(),
            });
        }
        let n = min.len();
        let mut planes = Vec::with_capacity(2 * n);
        for d in 0..n {
            let mut lower = Point::from_elem(0.0, n);
            lower[d] = 1.0;
            planes.push(HyperPlane::new(&lower, min[d]));
            let mut upper = Point::from_elem(0.0, n);
            upper[d] = -1.0;
            planes.push(HyperPlane::new(&upper, -max[d]));
        }
        Ok(Self { planes })
    }

    /// The half-spaces.
    pub fn planes(&self) -> &[HyperPlane] {
        &self.planes
    }

    /// Dimensionality, or `None` for the empty polytope.
    pub fn num_dimensions(&self) -> Option<usize> {
        self.planes.first().map(HyperPlane::num_dimensions)
    }

    /// Fail unless the polytope is empty or `n`-dimensional.
    pub fn check_dimensions(&self, n: usize) -> Result<(), SpatialError> {
        match self.num_dimensions() {
            Some(found) if found != n => {
                Err(SpatialError::DimensionMismatch { expected: n, found })
            }
            _ => Ok(()),
        }
    }

    /// Whether `point` is inside every half-space.
    pub fn contains(&self, point: &[f64]) -> bool {
        self.planes.iter().all(|p| p.is_above(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_on_plane_counts_as_above() {
        let p = HyperPlane::new(&[1.0, 0.0], 2.0);
        assert!(p.is_above(&[2.0, 5.0]));
        assert!(!p.is_above(&[1.999, 5.0]));
    }

    #[test]
    fn from_row_splits_normal_and_distance() {
        let p = HyperPlane::from_row(&[0.0, 1.0, 0.0, -3.0]);
        assert_eq!(p.normal(), &[0.0, 1.0, 0.0]);
        assert_eq!(p.distance(), -3.0);
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let planes = vec![HyperPlane::new(&[1.0, 0.0], 0.0), HyperPlane::new(&[1.0], 0.0)];
        assert!(matches!(
            ConvexPolytope::new(planes),
            Err(SpatialError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn box_polytope_contains_its_interior_only() {
        let b = ConvexPolytope::from_box(&[0.0, 0.0], &[1.0, 2.0]).unwrap();
        assert!(b.contains(&[0.5, 1.0]));
        assert!(b.contains(&[0.0, 2.0]));
        assert!(!b.contains(&[1.5, 1.0]));
        assert!(!b.contains(&[0.5, -0.1]));
    }

    #[test]
    fn empty_polytope_contains_everything() {
        let p = ConvexPolytope::default();
        assert!(p.contains(&[1e9, -1e9]));
        assert!(p.check_dimensions(7).is_ok());
    }
}
