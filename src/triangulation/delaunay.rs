use std::time::Instant;

use crate::error::{HistoError, Result};
use crate::triangulation::geometry::{Edge, Point, Triangle};

/// Tunables for [`triangulate_with`].
#[derive(Debug, Clone, Copy)]
pub struct TriangulationOptions {
    /// Two y coordinates closer than this are treated as equal by the
    /// circumcircle test. The default is the smallest positive normal
    /// `f64`, which suits the [-50, 50] render cube; inputs at other
    /// scales may want something proportional to their extent.
    pub coincident_epsilon: f64,
}

impl Default for TriangulationOptions {
    fn default() -> Self {
        Self {
            coincident_epsilon: f64::MIN_POSITIVE,
        }
    }
}

/// Delaunay triangulation of `points` with default options.
pub fn triangulate(points: &[Point]) -> Result<Vec<Triangle>> {
    triangulate_with(points, TriangulationOptions::default())
}

/// Incremental (Bowyer-Watson) triangulation seeded with a super-triangle.
///
/// Returned triangles index into `points`. Duplicate positions are not
/// removed here; callers feed de-duplicated coordinates.
pub fn triangulate_with(points: &[Point], options: TriangulationOptions) -> Result<Vec<Triangle>> {
    let n = points.len();
    if n < 3 {
        return Err(HistoError::Triangulation(format!(
            "need at least 3 points, got {n}"
        )));
    }
    let started = Instant::now();
    let max_triangles = 4 * n;

    let mut vertices: Vec<Point> = Vec::with_capacity(n + 3);
    vertices.extend_from_slice(points);
    vertices.extend_from_slice(&super_triangle(points));

    let mut triangles = vec![Triangle::new(n, n + 1, n + 2)];
    let mut edges: Vec<Edge> = Vec::new();

    for i in 0..n {
        let p = vertices[i];
        edges.clear();

        triangles.retain(|t| {
            let inside = in_circumcircle(
                &p,
                &vertices[t.a],
                &vertices[t.b],
                &vertices[t.c],
                options.coincident_epsilon,
            );
            if inside {
                edges.extend_from_slice(&t.edges());
            }
            !inside
        });

        // Shared edges of the removed triangles cancel in pairs; what
        // survives is the boundary of the cavity.
        let mut shared = vec![false; edges.len()];
        for j in 0..edges.len() {
            for k in (j + 1)..edges.len() {
                if edges[j] == edges[k] {
                    shared[j] = true;
                    shared[k] = true;
                }
            }
        }

        for (edge, _) in edges.iter().zip(&shared).filter(|(_, s)| !**s) {
            if triangles.len() >= max_triangles {
                return Err(HistoError::Triangulation(
                    "Exceeded maximum edges".to_string(),
                ));
            }
            triangles.push(Triangle::new(edge.start, edge.end, i));
        }
    }

    triangles.retain(|t| !t.uses_vertex_from(n));

    tracing::debug!(
        "Triangulated {} points into {} triangles in {:?}",
        n,
        triangles.len(),
        started.elapsed()
    );
    Ok(triangles)
}

fn super_triangle(points: &[Point]) -> [Point; 3] {
    let mut xmin = points[0].x;
    let mut xmax = xmin;
    let mut ymin = points[0].y;
    let mut ymax = ymin;
    for p in &points[1..] {
        xmin = xmin.min(p.x);
        xmax = xmax.max(p.x);
        ymin = ymin.min(p.y);
        ymax = ymax.max(p.y);
    }

    let dmax = (xmax - xmin).max(ymax - ymin);
    let xmid = (xmax + xmin) * 0.5;
    let ymid = (ymax + ymin) * 0.5;

    [
        Point::new(xmid - 2.0 * dmax, ymid - dmax, 0.0),
        Point::new(xmid, ymid + 2.0 * dmax, 0.0),
        Point::new(xmid + 2.0 * dmax, ymid - dmax, 0.0),
    ]
}

/// True when `p` lies inside or on the circle through `a`, `b`, `c`.
///
/// The centre is found by intersecting perpendicular bisectors. A flat
/// triangle (all three y equal) has no circle and reports false.
fn in_circumcircle(p: &Point, a: &Point, b: &Point, c: &Point, eps: f64) -> bool {
    if (a.y - b.y).abs() < eps && (b.y - c.y).abs() < eps {
        return false;
    }

    let (xc, yc) = if (b.y - a.y).abs() < eps {
        let m2 = -(c.x - b.x) / (c.y - b.y);
        let mx2 = (b.x + c.x) * 0.5;
        let my2 = (b.y + c.y) * 0.5;
        let xc = (b.x + a.x) * 0.5;
        (xc, m2 * (xc - mx2) + my2)
    } else if (c.y - b.y).abs() < eps {
        let m1 = -(b.x - a.x) / (b.y - a.y);
        let mx1 = (a.x + b.x) * 0.5;
        let my1 = (a.y + b.y) * 0.5;
        let xc = (c.x + b.x) * 0.5;
        (xc, m1 * (xc - mx1) + my1)
    } else {
        let m1 = -(b.x - a.x) / (b.y - a.y);
        let m2 = -(c.x - b.x) / (c.y - b.y);
        let mx1 = (a.x + b.x) * 0.5;
        let mx2 = (b.x + c.x) * 0.5;
        let my1 = (a.y + b.y) * 0.5;
        let my2 = (b.y + c.y) * 0.5;
        let xc = (m1 * mx1 - m2 * mx2 + my2 - my1) / (m1 - m2);
        (xc, m1 * (xc - mx1) + my1)
    };

    let dx = b.x - xc;
    let dy = b.y - yc;
    let radius_sq = dx * dx + dy * dy;
    let dx = p.x - xc;
    let dy = p.y - yc;
    dx * dx + dy * dy <= radius_sq
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y, 0.0)).collect()
    }

    #[test]
    fn fewer_than_three_points_is_an_error() {
        let err = triangulate(&pts(&[(0.0, 0.0), (1.0, 1.0)])).unwrap_err();
        assert!(matches!(err, HistoError::Triangulation(_)));
    }

    #[test]
    fn single_triangle() {
        let tris = triangulate(&pts(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)])).unwrap();
        assert_eq!(tris, vec![Triangle::new(1, 0, 2)]);
    }

    #[test]
    fn unit_square_splits_on_one_diagonal() {
        let tris = triangulate(&pts(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)])).unwrap();
        assert_eq!(tris, vec![Triangle::new(1, 0, 3), Triangle::new(0, 2, 3)]);
    }

    #[test]
    fn interior_point_fans_out() {
        let tris = triangulate(&pts(&[(0.0, 0.0), (2.0, 0.0), (1.0, 2.0), (1.0, 0.5)])).unwrap();
        assert_eq!(tris.len(), 3);
        assert!(tris.iter().all(|t| t.indices().contains(&3)));
    }

    #[test]
    fn circumcircle_includes_boundary() {
        let a = Point::new(0.0, 0.0, 0.0);
        let b = Point::new(1.0, 0.0, 0.0);
        let c = Point::new(0.0, 1.0, 0.0);
        let eps = f64::MIN_POSITIVE;
        assert!(in_circumcircle(&Point::new(1.0, 1.0, 0.0), &a, &b, &c, eps));
        assert!(in_circumcircle(&Point::new(0.5, 0.5, 0.0), &a, &b, &c, eps));
        assert!(!in_circumcircle(&Point::new(2.0, 2.0, 0.0), &a, &b, &c, eps));
    }

    #[test]
    fn flat_triangle_has_no_circle() {
        let a = Point::new(0.0, 1.0, 0.0);
        let b = Point::new(1.0, 1.0, 0.0);
        let c = Point::new(2.0, 1.0, 0.0);
        assert!(!in_circumcircle(&Point::new(1.0, 1.0, 0.0), &a, &b, &c, f64::MIN_POSITIVE));
    }
}
