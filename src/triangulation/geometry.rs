/// A triangulation input point. Identity is the `(x, y)` position only;
/// `value` is carried along as payload.
#[derive(Debug, Clone, Copy)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, value: f64) -> Self {
        Self { x, y, value }
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

/// An undirected edge between two point indices.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub start: usize,
    pub end: usize,
}

impl Edge {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        (self.start == other.start && self.end == other.end)
            || (self.start == other.end && self.end == other.start)
    }
}

impl Eq for Edge {}

/// Three indices into the point list the triangle was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    pub a: usize,
    pub b: usize,
    pub c: usize,
}

impl Triangle {
    pub fn new(a: usize, b: usize, c: usize) -> Self {
        Self { a, b, c }
    }

    pub fn indices(&self) -> [usize; 3] {
        [self.a, self.b, self.c]
    }

    pub fn edges(&self) -> [Edge; 3] {
        [
            Edge::new(self.a, self.b),
            Edge::new(self.b, self.c),
            Edge::new(self.c, self.a),
        ]
    }

    /// True when any corner index is `first` or above.
    pub fn uses_vertex_from(&self, first: usize) -> bool {
        self.a >= first || self.b >= first || self.c >= first
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_equality_ignores_direction() {
        assert_eq!(Edge::new(3, 7), Edge::new(7, 3));
        assert_eq!(Edge::new(3, 7), Edge::new(3, 7));
        assert_ne!(Edge::new(3, 7), Edge::new(3, 8));
    }

    #[test]
    fn point_equality_ignores_value() {
        assert_eq!(Point::new(1.0, 2.0, 5.0), Point::new(1.0, 2.0, -3.0));
        assert_ne!(Point::new(1.0, 2.0, 5.0), Point::new(1.0, 2.5, 5.0));
    }

    #[test]
    fn triangle_edges_close_the_loop() {
        let t = Triangle::new(0, 1, 2);
        let edges = t.edges();
        assert_eq!(edges[0], Edge::new(1, 0));
        assert_eq!(edges[2], Edge::new(0, 2));
        assert!(!t.uses_vertex_from(3));
        assert!(Triangle::new(0, 1, 4).uses_vertex_from(3));
    }
}
