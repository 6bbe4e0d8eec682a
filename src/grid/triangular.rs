//! Unstructured triangular grid.
//!
//! Node data is shaped `[n_nodes]` and blended with barycentric weights of
//! the face containing each point. Face (center) data is shaped `[n_faces]`.

use lru::LruCache;
use ndarray::{Array1, Array2, ArrayView2, ArrayViewD, Ix1};
use parking_lot::Mutex;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::trace;

use super::common::check_points;
use super::{DataLocation, Grid, GridTopology, LOCATION_CACHE_ENTRIES};
use crate::error::{GridPropError, Result};

/// Barycentric tolerance so points on shared edges are found
const EDGE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
struct FacePosition {
    face: usize,
    weights: [f64; 3],
}

type Locations = Arc<Vec<Option<FacePosition>>>;

/// Axis-aligned bounds of one face, indexed by the R-tree
#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceEnvelope {
    face: usize,
    min: [f64; 2],
    max: [f64; 2],
}

impl FaceEnvelope {
    fn new(face: usize, corners: [[f64; 2]; 3]) -> Self {
        let mut min = [f64::INFINITY; 2];
        let mut max = [f64::NEG_INFINITY; 2];
        for corner in corners {
            for axis in 0..2 {
                min[axis] = min[axis].min(corner[axis]);
                max[axis] = max[axis].max(corner[axis]);
            }
        }
        Self { face, min, max }
    }
}

impl RTreeObject for FaceEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl PointDistance for FaceEnvelope {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = (self.min[0] - point[0]).max(point[0] - self.max[0]).max(0.0);
        let dy = (self.min[1] - point[1]).max(point[1] - self.max[1]).max(0.0);
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        (self.min[0]..=self.max[0]).contains(&point[0]) && (self.min[1]..=self.max[1]).contains(&point[1])
    }
}

/// Grid of triangles over irregular nodes
#[derive(Debug)]
pub struct TriangularGrid {
    nodes: Vec<[f64; 2]>,
    faces: Vec<[usize; 3]>,
    index: RTree<FaceEnvelope>,
    topology: Option<GridTopology>,
    locations: Mutex<LruCache<u64, Locations>>,
}

impl TriangularGrid {
    /// Create a grid from node coordinates and zero-based face connectivity
    pub fn new(nodes: Vec<[f64; 2]>, faces: Vec<[usize; 3]>) -> Result<Self> {
        if faces.is_empty() {
            return Err(GridPropError::construction("Triangular grid has no faces"));
        }
        if let Some(face) = faces.iter().find(|f| f.iter().any(|&n| n >= nodes.len())) {
            return Err(GridPropError::construction(format!(
                "Face {:?} references a node beyond the {} defined",
                face,
                nodes.len()
            )));
        }

        let envelopes = faces
            .iter()
            .enumerate()
            .map(|(face, corners)| FaceEnvelope::new(face, corners.map(|n| nodes[n])))
            .collect();
        let index = RTree::bulk_load(envelopes);

        Ok(Self {
            nodes,
            faces,
            index,
            topology: None,
            locations: Mutex::new(LruCache::new(
                NonZeroUsize::new(LOCATION_CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN),
            )),
        })
    }

    /// Record the dataset variables this grid was read from
    pub fn with_topology(mut self, topology: GridTopology) -> Self {
        self.topology = Some(topology);
        self
    }

    pub fn nodes(&self) -> &[[f64; 2]] {
        &self.nodes
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    fn barycentric(&self, face: &[usize; 3], x: f64, y: f64) -> Option<[f64; 3]> {
        let [a, b, c] = face.map(|n| self.nodes[n]);
        let det = (b[1] - c[1]) * (a[0] - c[0]) + (c[0] - b[0]) * (a[1] - c[1]);
        if det == 0.0 {
            return None;
        }
        let w0 = ((b[1] - c[1]) * (x - c[0]) + (c[0] - b[0]) * (y - c[1])) / det;
        let w1 = ((c[1] - a[1]) * (x - c[0]) + (a[0] - c[0]) * (y - c[1])) / det;
        let w2 = 1.0 - w0 - w1;
        let inside = [w0, w1, w2].iter().all(|&w| w >= -EDGE_TOLERANCE);
        inside.then_some([w0, w1, w2])
    }

    /// Face containing (`x`, `y`), lowest face index first on shared edges
    fn locate_point(&self, x: f64, y: f64) -> Option<FacePosition> {
        let mut candidates: Vec<usize> = self
            .index
            .locate_all_at_point(&[x, y])
            .map(|envelope| envelope.face)
            .collect();
        candidates.sort_unstable();
        candidates.into_iter().find_map(|face| {
            self.barycentric(&self.faces[face], x, y)
                .map(|weights| FacePosition { face, weights })
        })
    }

    fn locate(&self, points: &ArrayView2<f64>) -> Vec<Option<FacePosition>> {
        points
            .rows()
            .into_iter()
            .map(|p| self.locate_point(p[0], p[1]))
            .collect()
    }

    fn locations(&self, points: &ArrayView2<f64>, memo: Option<u64>) -> Locations {
        let Some(key) = memo else {
            return Arc::new(self.locate(points));
        };
        if let Some(found) = self.locations.lock().peek(&key) {
            if found.len() == points.nrows() {
                trace!(grid = self.name(), memo = key, "Reusing point locations");
                return Arc::clone(found);
            }
        }
        let located = Arc::new(self.locate(points));
        self.locations.lock().push(key, Arc::clone(&located));
        located
    }
}

impl Grid for TriangularGrid {
    fn name(&self) -> &str {
        "triangular"
    }

    fn spatial_ndim(&self) -> usize {
        1
    }

    fn node_shape(&self) -> Vec<usize> {
        vec![self.nodes.len()]
    }

    fn center_shape(&self) -> Vec<usize> {
        vec![self.faces.len()]
    }

    fn interpolate_located(
        &self,
        points: &ArrayView2<f64>,
        data: &ArrayViewD<f64>,
        location: DataLocation,
        memo: Option<u64>,
    ) -> Result<Array1<f64>> {
        check_points(points)?;
        if data.shape() != self.location_shape(location).as_slice() {
            return Err(GridPropError::shape_mismatch(format!(
                "Data slice shape {:?} does not fit {} nodes or {} faces as {:?} data",
                data.shape(),
                self.nodes.len(),
                self.faces.len(),
                location
            )));
        }
        let data = data.view().into_dimensionality::<Ix1>()?;
        let found = self.locations(points, memo);

        let values = found
            .iter()
            .map(|pos| match (pos, location) {
                (None, _) => f64::NAN,
                (Some(p), DataLocation::Center) => data[p.face],
                (Some(p), DataLocation::Node) => {
                    let nodes = self.faces[p.face];
                    nodes
                        .iter()
                        .zip(p.weights.iter())
                        .map(|(&n, &w)| w * data[n])
                        .sum()
                }
            })
            .collect::<Vec<f64>>();

        Ok(Array1::from(values))
    }

    fn center_points(&self) -> Array2<f64> {
        let mut centers = Array2::zeros((self.faces.len(), 2));
        for (row, face) in self.faces.iter().enumerate() {
            for &n in face {
                centers[[row, 0]] += self.nodes[n][0] / 3.0;
                centers[[row, 1]] += self.nodes[n][1] / 3.0;
            }
        }
        centers
    }

    fn topology(&self) -> Option<&GridTopology> {
        self.topology.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Unit square split into two triangles
    fn grid() -> TriangularGrid {
        TriangularGrid::new(
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_faces() {
        assert!(TriangularGrid::new(vec![[0.0, 0.0]], vec![[0, 1, 2]]).is_err());
        assert!(TriangularGrid::new(vec![[0.0, 0.0]], vec![]).is_err());
    }

    #[test]
    fn test_node_interpolation_is_linear() {
        let grid = grid();
        // value = x + 2y at each node
        let data = array![0.0, 1.0, 3.0, 2.0].into_dyn();
        let points = array![[0.25, 0.1], [0.2, 0.7], [1.0, 1.0]];
        let values = grid
            .interpolate_var_to_points(&points.view(), &data.view(), None)
            .unwrap();
        assert!((values[0] - 0.45).abs() < 1e-12);
        assert!((values[1] - 1.6).abs() < 1e-12);
        assert!((values[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_face_interpolation_and_mask() {
        let grid = grid();
        let data = array![5.0, 6.0].into_dyn();
        let points = array![[0.9, 0.1], [0.1, 0.9], [2.0, 2.0]];
        let values = grid
            .interpolate_var_to_points(&points.view(), &data.view(), Some(3))
            .unwrap();
        assert_eq!(values[0], 5.0);
        assert_eq!(values[1], 6.0);
        assert!(values[2].is_nan());
    }

    #[test]
    fn test_center_points() {
        let centers = grid().center_points();
        assert!((centers[[0, 0]] - 2.0 / 3.0).abs() < 1e-12);
        assert!((centers[[0, 1]] - 1.0 / 3.0).abs() < 1e-12);
        assert!((centers[[1, 0]] - 1.0 / 3.0).abs() < 1e-12);
    }

    /// `n`×`n` lattice of unit squares, each split along its diagonal
    fn lattice(n: usize) -> TriangularGrid {
        let side = n + 1;
        let nodes = (0..side * side)
            .map(|k| [(k % side) as f64, (k / side) as f64])
            .collect();
        let mut faces = Vec::with_capacity(2 * n * n);
        for j in 0..n {
            for i in 0..n {
                let a = j * side + i;
                faces.push([a, a + 1, a + side + 1]);
                faces.push([a, a + side + 1, a + side]);
            }
        }
        TriangularGrid::new(nodes, faces).unwrap()
    }

    #[test]
    fn test_lattice_location_uses_index() {
        let n = 60;
        let grid = lattice(n);
        assert_eq!(grid.index.size(), grid.faces().len());

        let data = Array1::from_iter(grid.nodes().iter().map(|p| p[0] + 2.0 * p[1])).into_dyn();
        let points = Array2::from_shape_fn((500, 2), |(i, c)| {
            (i as f64 * 0.618_034 + c as f64 * 0.414_214).fract() * n as f64
        });
        let values = grid
            .interpolate_var_to_points(&points.view(), &data.view(), None)
            .unwrap();
        for (p, v) in points.rows().into_iter().zip(values.iter()) {
            assert!((v - (p[0] + 2.0 * p[1])).abs() < 1e-9);
        }

        let outside = array![[-0.5, 3.0], [n as f64 + 0.5, 3.0]];
        let values = grid
            .interpolate_var_to_points(&outside.view(), &data.view(), None)
            .unwrap();
        assert!(values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_located_face_data_when_counts_match() {
        // Four overlapping faces over four nodes
        let grid = TriangularGrid::new(
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            vec![[0, 1, 2], [0, 2, 3], [1, 2, 3], [0, 1, 3]],
        )
        .unwrap();
        assert_eq!(grid.infer_location(&[4]), Some(DataLocation::Node));

        let data = array![5.0, 6.0, 7.0, 8.0].into_dyn();
        let points = array![[0.9, 0.1], [0.1, 0.9]];
        let faces = grid
            .interpolate_located(&points.view(), &data.view(), DataLocation::Center, None)
            .unwrap();
        assert_eq!(faces.to_vec(), vec![5.0, 6.0]);

        let nodes = grid
            .interpolate_var_to_points(&points.view(), &data.view(), None)
            .unwrap();
        assert!((nodes[0] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_infer_location() {
        let grid = grid();
        assert_eq!(grid.infer_location(&[4]), Some(DataLocation::Node));
        assert_eq!(grid.infer_location(&[3, 2]), Some(DataLocation::Center));
        assert_eq!(grid.infer_location(&[3]), None);
    }
}
