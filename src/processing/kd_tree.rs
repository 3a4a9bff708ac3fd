use kiddo::ImmutableKdTree;
use kiddo::SquaredEuclidean;

use crate::processing::surface::SurfaceData;
use crate::triangulation::Point;

/// Nearest aggregated sample under a render-space position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    /// RPM, Y-axis value and channel value in log units.
    pub sample: Point,
    /// Distance in render units.
    pub distance: f64,
}

/// 2D KD-tree over the rescaled (x, y) surface coordinates, used to read
/// back the raw values behind a point on the rendered surface.
///
/// Built once per surface. Points often share an axis value (idle RPM
/// logged against many pressure ratios), which the balanced immutable
/// tree handles without bucket overflow.
pub struct SurfaceProbe {
    tree: Option<ImmutableKdTree<f64, 2>>,
    /// Tree item -> index into `samples`.
    indices: Vec<usize>,
    samples: Vec<Point>,
}

impl SurfaceProbe {
    /// Only finite points are indexed.
    pub fn build(data: &SurfaceData) -> Self {
        let (indices, positions): (Vec<usize>, Vec<[f64; 2]>) = data
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.x.is_finite() && p.y.is_finite())
            .map(|(i, p)| (i, [p.x, p.y]))
            .unzip();
        let tree = (!positions.is_empty()).then(|| ImmutableKdTree::new_from_slice(&positions));
        Self {
            tree,
            indices,
            samples: data.samples.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_none()
    }

    pub fn nearest(&self, x: f64, y: f64) -> Option<ProbeHit> {
        let result = self.tree.as_ref()?.nearest_one::<SquaredEuclidean>(&[x, y]);
        let index = *self.indices.get(result.item as usize)?;
        let sample = *self.samples.get(index)?;
        Some(ProbeHit {
            sample,
            distance: result.distance.sqrt(),
        })
    }
}
