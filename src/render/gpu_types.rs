use std::collections::BTreeSet;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::processing::range::round_to;
use crate::processing::surface::{SurfaceData, RENDER_EXTENT};
use crate::triangulation::Triangle;

/// One vertex of the surface mesh. Layout matches the vertex shader input
/// (32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    /// Render-space position: (rpm, value, y-axis), each in [-50, 50].
    pub position: [f32; 3],
    /// Colour ramp lookup; `v` runs from 1 at the lowest value to 0 at the highest.
    pub tex_coord: [f32; 2],
    pub normal: [f32; 3],
}

/// Index buffers and vertices ready for upload.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    pub vertices: Vec<SurfaceVertex>,
    /// Three indices per triangle, wound so every face points up.
    pub triangle_indices: Vec<u32>,
    /// Two indices per unique edge, for the wireframe pass.
    pub line_indices: Vec<u32>,
    pub legend: Legend,
}

/// Colour legend texts for the lowest, middle and highest values.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub low: String,
    pub mid: String,
    pub high: String,
}

impl Legend {
    pub fn new(lowest: f64, highest: f64, unit: &str) -> Self {
        let text = |v: f64| {
            if unit.is_empty() {
                format!("{v}")
            } else {
                format!("{v} {unit}")
            }
        };
        Self {
            low: text(lowest),
            mid: text(round_to((highest + lowest) / 2.0, 3)),
            high: text(highest),
        }
    }
}

impl SurfaceMesh {
    /// Build the mesh from the rescaled surface points and the triangles
    /// produced over them. Normals are area-weighted averages of the
    /// adjacent face normals.
    pub fn build(data: &SurfaceData, triangles: &[Triangle]) -> Self {
        let positions: Vec<Vec3> = data
            .points
            .iter()
            .map(|p| Vec3::new(p.x as f32, p.value as f32, p.y as f32))
            .collect();

        let mut normals = vec![Vec3::ZERO; positions.len()];
        let mut triangle_indices = Vec::with_capacity(triangles.len() * 3);
        let mut edges = BTreeSet::new();

        for t in triangles {
            let [a, b, c] = t.indices();
            let (Some(&pa), Some(&pb), Some(&pc)) = (positions.get(a), positions.get(b), positions.get(c)) else {
                tracing::warn!("Skipping triangle {t:?} outside the vertex range");
                continue;
            };

            let face = (pb - pa).cross(pc - pa);
            let (face, order) = if face.y < 0.0 { (-face, [a, c, b]) } else { (face, [a, b, c]) };
            for idx in order {
                normals[idx] += face;
            }
            triangle_indices.extend(order.map(|i| i as u32));

            for (s, e) in [(a, b), (b, c), (c, a)] {
                edges.insert((s.min(e) as u32, s.max(e) as u32));
            }
        }

        let extent = 2.0 * RENDER_EXTENT as f32;
        let vertices = positions
            .iter()
            .zip(&normals)
            .map(|(pos, n)| SurfaceVertex {
                position: pos.to_array(),
                tex_coord: [0.0, 1.0 - (pos.y + RENDER_EXTENT as f32) / extent],
                normal: n.try_normalize().unwrap_or(Vec3::Y).to_array(),
            })
            .collect();

        Self {
            vertices,
            triangle_indices,
            line_indices: edges.into_iter().flat_map(|(s, e)| [s, e]).collect(),
            legend: Legend::new(data.lowest_value, data.highest_value, &data.value_unit),
        }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangle_indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulation::{triangulate, Point};

    fn square() -> SurfaceData {
        let points = vec![
            Point::new(-50.0, -50.0, -50.0),
            Point::new(50.0, -50.0, 0.0),
            Point::new(-50.0, 50.0, 0.0),
            Point::new(50.0, 50.0, 50.0),
        ];
        SurfaceData {
            samples: points.clone(),
            points,
            lowest_x: 500.0,
            highest_x: 6000.0,
            lowest_z: 0.2,
            highest_z: 1.8,
            lowest_value: 10.0,
            highest_value: 14.5,
            x_label: "RPM".to_string(),
            y_label: "Knock (deg)".to_string(),
            z_label: "PRatio".to_string(),
            value_unit: "deg".to_string(),
        }
    }

    #[test]
    fn vertices_follow_the_render_axes() {
        let data = square();
        let triangles = triangulate(&data.points).unwrap();
        let mesh = SurfaceMesh::build(&data, &triangles);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.vertices[1].position, [50.0, 0.0, -50.0]);
        assert_eq!(mesh.vertices[0].tex_coord, [0.0, 1.0]);
        assert_eq!(mesh.vertices[1].tex_coord, [0.0, 0.5]);
        assert_eq!(mesh.vertices[3].tex_coord, [0.0, 0.0]);
        assert_eq!(mesh.vertex_bytes().len(), 4 * 32);
    }

    #[test]
    fn faces_point_up_and_edges_are_unique() {
        let data = square();
        let triangles = triangulate(&data.points).unwrap();
        let mesh = SurfaceMesh::build(&data, &triangles);
        assert_eq!(mesh.triangle_indices.len(), 6);
        assert_eq!(mesh.line_indices.len(), 10);

        for tri in mesh.triangle_indices.chunks(3) {
            let p = |i: u32| Vec3::from_array(mesh.vertices[i as usize].position);
            let face = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            assert!(face.y > 0.0);
        }
        for v in &mesh.vertices {
            assert!(v.normal[1] > 0.0);
            assert!((Vec3::from_array(v.normal).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn legend_mid_is_rounded() {
        let legend = Legend::new(1.0, 2.0005, "V");
        assert_eq!(legend.low, "1 V");
        assert_eq!(legend.mid, "1.5 V");
        assert_eq!(legend.high, "2.0005 V");
        assert_eq!(Legend::new(0.0, 4.0, "").mid, "2");
    }
}
