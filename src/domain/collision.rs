//! Collision detection based on closed polygons.
//!
//! A [`Surface`] places a local-frame [`Polygon`] at a [`Pose`]. Two surfaces are tested in two
//! stages: [`Surface::precheck`] compares bounding spans around the centroids, and
//! [`Surface::intersect`] crosses every edge of one surface with every edge of the other.

use thiserror::Error;

use super::{Pose, Position};

pub trait HasCollision {
    fn has_collision(&self, other: &dyn HasCollision) -> bool {
        let (surface, other) = (self.surface(), other.surface());
        surface.precheck(other) && !surface.intersect(other).is_empty()
    }

    fn surface(&self) -> &Surface;
}

#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
}

/// Ordered vertices of a closed polygon. The edge from the last vertex back to the first is part
/// of the polygon.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct Polygon {
    vertices: Vec<Position>,
}

impl Polygon {
    pub fn new(vertices: Vec<Position>) -> Result<Self, GeometryError> {
        if vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices(vertices.len()));
        }
        Ok(Self { vertices })
    }

    pub fn vertices(&self) -> &[Position] {
        &self.vertices
    }

    pub fn edges(&self) -> impl Iterator<Item = LineSegment> + '_ {
        closed_edges(&self.vertices)
    }
}

impl TryFrom<&[(f64, f64)]> for Polygon {
    type Error = GeometryError;

    fn try_from(value: &[(f64, f64)]) -> Result<Self, Self::Error> {
        Polygon::new(value.iter().map(|p| Position::from(*p)).collect())
    }
}

fn closed_edges(vertices: &[Position]) -> impl Iterator<Item = LineSegment> + '_ {
    vertices
        .iter()
        .zip(vertices.iter().cycle().skip(1))
        .map(|(p1, p2)| LineSegment::new(*p1, *p2))
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct LineSegment {
    p1: Position,
    p2: Position,
}

impl LineSegment {
    pub fn new(p1: Position, p2: Position) -> Self {
        Self { p1, p2 }
    }

    pub fn p1(&self) -> Position {
        self.p1
    }

    pub fn p2(&self) -> Position {
        self.p2
    }

    /// Solves `p1 + u_a (p2 - p1) = q1 + u_b (q2 - q1)` for both parameters. The crossing point
    /// is returned only if both parameters lie in [0, 1]. Parallel, collinear and zero-length
    /// segments have a vanishing denominator and never intersect.
    pub fn intersect(&self, other: &LineSegment) -> Option<Position> {
        let (x_1, y_1) = (self.p1.x(), self.p1.y());
        let (x_2, y_2) = (self.p2.x(), self.p2.y());
        let (x_3, y_3) = (other.p1.x(), other.p1.y());
        let (x_4, y_4) = (other.p2.x(), other.p2.y());

        let denominator = (y_4 - y_3) * (x_2 - x_1) - (x_4 - x_3) * (y_2 - y_1);
        if denominator.abs() < f64::EPSILON {
            return None;
        }

        let u_a = ((x_4 - x_3) * (y_1 - y_3) - (y_4 - y_3) * (x_1 - x_3)) / denominator;
        let u_b = ((x_2 - x_1) * (y_1 - y_3) - (y_2 - y_1) * (x_1 - x_3)) / denominator;

        if (0.0..=1.0).contains(&u_a) && (0.0..=1.0).contains(&u_b) {
            Some(Position::new(
                x_1 + (x_2 - x_1) * u_a,
                y_1 + (y_2 - y_1) * u_a,
            ))
        } else {
            None
        }
    }
}

/// A polygon placed in the world. Everything derived from the pose is recomputed by
/// [`Surface::set_pose`].
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct Surface {
    geometry: Polygon,
    vertices: Vec<Position>,
    edges: Vec<LineSegment>,
    centroid: Position,
    span: f64,
}

impl Surface {
    pub fn new(pose: Pose, geometry: Polygon) -> Self {
        let mut surface = Self {
            geometry,
            vertices: vec![],
            edges: vec![],
            centroid: Position::default(),
            span: 0.0,
        };
        surface.set_pose(pose);
        surface
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.vertices = pose.transform(self.geometry.vertices());

        let n = self.vertices.len() as f64;
        let sum = self
            .vertices
            .iter()
            .fold(Position::default(), |sum, v| sum + *v);
        self.centroid = sum * n.recip();

        // Twice the largest distance from the centroid
        self.span = 2.0
            * self
                .vertices
                .iter()
                .map(|v| v.distance(self.centroid))
                .fold(0.0, f64::max);

        self.edges = closed_edges(&self.vertices).collect();
    }

    pub fn vertices(&self) -> &[Position] {
        &self.vertices
    }

    pub fn edges(&self) -> &[LineSegment] {
        &self.edges
    }

    pub fn centroid(&self) -> Position {
        self.centroid
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    /// Broad phase. May report surfaces that do not touch, but never rejects surfaces whose
    /// spans overlap.
    pub fn precheck(&self, other: &Surface) -> bool {
        self.centroid.distance(other.centroid) < (self.span + other.span) / 3.0_f64.sqrt()
    }

    /// Narrow phase. Returns every point where an edge of this surface crosses an edge of the
    /// other one.
    pub fn intersect(&self, other: &Surface) -> Vec<Position> {
        self.edges
            .iter()
            .flat_map(|a| other.edges.iter().filter_map(|b| a.intersect(b)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::{assert_abs_diff_eq, AbsDiffEq};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_polygon_needs_three_vertices() {
        assert_eq!(
            Polygon::new(vec![Position::new(0.0, 0.0), Position::new(1.0, 0.0)]),
            Err(GeometryError::TooFewVertices(2))
        );
    }

    #[test]
    fn test_polygon_edges_close() {
        let polygon = square(1.0);
        let edges = polygon.edges().collect::<Vec<_>>();
        assert_eq!(edges.len(), 4);
        assert_eq!(
            edges[3],
            LineSegment::new(Position::new(0.0, 1.0), Position::new(0.0, 0.0))
        );
    }

    #[test]
    fn test_surface_set_pose() {
        let mut surface = Surface::new(Pose::default(), square(1.0));
        assert_abs_diff_eq!(surface.centroid(), Position::new(0.5, 0.5), epsilon = EPSILON);
        assert_abs_diff_eq!(surface.span(), 2.0_f64.sqrt(), epsilon = EPSILON);

        surface.set_pose(Pose::new(2.0, 0.0, 0.5 * PI));
        assert_abs_diff_eq!(surface.centroid(), Position::new(1.5, 0.5), epsilon = EPSILON);
        assert_abs_diff_eq!(surface.span(), 2.0_f64.sqrt(), epsilon = EPSILON);
        assert_eq!(surface.edges().len(), 4);
        assert_abs_diff_eq!(
            surface.edges()[3].p2(),
            surface.vertices()[0],
            epsilon = EPSILON
        );
    }

    #[rstest]
    #[case::overlapping(0.5, true)]
    #[case::touching(1.0, true)]
    #[case::separated(3.0, false)]
    #[case::far_away(10.0, false)]
    fn test_surface_precheck(#[case] offset: f64, #[case] expected: bool) {
        let a = Surface::new(Pose::default(), square(1.0));
        let b = Surface::new(Pose::new(offset, 0.0, 0.0), square(1.0));
        assert_eq!(a.precheck(&b), expected);
        assert_eq!(b.precheck(&a), expected);
    }

    #[test]
    fn test_surface_precheck_no_false_negative_for_overlap() {
        for i in 0..20 {
            let angle = i as f64 * PI / 10.0;
            let a = Surface::new(Pose::default(), square(1.0));
            let b = Surface::new(
                Pose::new(0.9 * angle.cos(), 0.9 * angle.sin(), angle),
                square(1.0),
            );
            if !a.intersect(&b).is_empty() {
                assert!(a.precheck(&b));
            }
        }
    }

    #[test]
    fn test_surface_intersect_overlapping_squares() {
        let a = Surface::new(Pose::default(), square(1.0));
        let b = Surface::new(Pose::new(0.5, 0.0, 0.0), square(1.0));
        let points = a.intersect(&b);
        let expected = [
            Position::new(0.5, 0.0),
            Position::new(1.0, 0.0),
            Position::new(1.0, 1.0),
            Position::new(0.5, 1.0),
        ];
        assert_eq!(points.len(), expected.len());
        for (point, expected) in std::iter::zip(points, expected) {
            assert_abs_diff_eq!(point, expected, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_surface_intersect_separated_squares() {
        let a = Surface::new(Pose::default(), square(1.0));
        let b = Surface::new(Pose::new(10.0, 0.0, 0.0), square(1.0));
        assert!(a.intersect(&b).is_empty());
        assert!(!a.precheck(&b));
    }

    #[test]
    fn test_surface_intersect_non_convex() {
        // U shape crossed by a bar through both arms
        let u = Polygon::new(vec![
            Position::new(0.0, 0.0),
            Position::new(3.0, 0.0),
            Position::new(3.0, 2.0),
            Position::new(2.0, 2.0),
            Position::new(2.0, 1.0),
            Position::new(1.0, 1.0),
            Position::new(1.0, 2.0),
            Position::new(0.0, 2.0),
        ])
        .unwrap();
        let bar = Polygon::new(vec![
            Position::new(-1.0, 1.5),
            Position::new(4.0, 1.5),
            Position::new(4.0, 1.75),
            Position::new(-1.0, 1.75),
        ])
        .unwrap();
        let a = Surface::new(Pose::default(), u);
        let b = Surface::new(Pose::default(), bar);
        assert_eq!(a.intersect(&b).len(), 8);
    }

    #[rstest]
    #[case::crossing(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        LineSegment::new(Position::new(0.0, 2.0), Position::new(2.0, 0.0)),
        Some(Position::new(1.0, 1.0))
    )]
    #[case::touching_start(
        LineSegment::new(Position::new(1.0, 0.0), Position::new(1.0, 1.0)),
        LineSegment::new(Position::new(0.5, 0.0), Position::new(1.5, 0.0)),
        Some(Position::new(1.0, 0.0))
    )]
    #[case::touching_end(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(1.0, 0.0)),
        LineSegment::new(Position::new(1.0, 1.0), Position::new(1.0, -1.0)),
        Some(Position::new(1.0, 0.0))
    )]
    #[case::outside_segment(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(1.0, 0.0)),
        LineSegment::new(Position::new(2.0, 1.0), Position::new(2.0, -1.0)),
        None
    )]
    #[case::parallel(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        LineSegment::new(Position::new(0.0, 1.0), Position::new(2.0, 3.0)),
        None
    )]
    #[case::collinear(
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 0.0)),
        LineSegment::new(Position::new(1.0, 0.0), Position::new(3.0, 0.0)),
        None
    )]
    #[case::zero_length(
        LineSegment::new(Position::new(1.0, 1.0), Position::new(1.0, 1.0)),
        LineSegment::new(Position::new(0.0, 0.0), Position::new(2.0, 2.0)),
        None
    )]
    fn test_line_segment_intersect(
        #[case] a: LineSegment,
        #[case] b: LineSegment,
        #[case] expected: Option<Position>,
    ) {
        let result = a.intersect(&b);
        if let (Some(r), Some(e)) = (result, expected) {
            assert_abs_diff_eq!(r, e, epsilon = EPSILON);
        } else {
            assert_eq!(result, expected);
        }
    }

    fn square(length: f64) -> Polygon {
        Polygon::new(vec![
            Position::new(0.0, 0.0),
            Position::new(length, 0.0),
            Position::new(length, length),
            Position::new(0.0, length),
        ])
        .unwrap()
    }

    impl AbsDiffEq for LineSegment {
        type Epsilon = f64;

        fn default_epsilon() -> f64 {
            f64::EPSILON
        }

        fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
            Position::abs_diff_eq(&self.p1, &other.p1, epsilon)
                && Position::abs_diff_eq(&self.p2, &other.p2, epsilon)
        }
    }
}
