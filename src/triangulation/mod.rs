pub mod delaunay;
pub mod geometry;

pub use delaunay::{triangulate, triangulate_with, TriangulationOptions};
pub use geometry::{Edge, Point, Triangle};
