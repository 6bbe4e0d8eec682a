//! Vertical depth models.
//!
//! A [`DepthModel`] maps query points to depth-layer brackets. Depth is the
//! third point column, positive downward; points with two columns are at the
//! surface. When every point is at the surface the model answers
//! [`DepthBrackets::SurfaceOnly`] and callers skip vertical interpolation.

use ndarray::{ArrayD, ArrayView2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{GridPropError, Result};
use crate::grid::GridRef;

/// Absolute depth below which a point counts as being at the surface
pub const SURFACE_TOLERANCE: f64 = 1e-4;

/// Reference to a layer along the depth dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerRef {
    First,
    Last,
    Index(usize),
}

impl LayerRef {
    /// Resolve against a depth dimension of `n_layers`
    pub fn resolve(self, n_layers: usize) -> Result<usize> {
        if n_layers == 0 {
            return Err(GridPropError::dimension("Depth dimension is empty"));
        }
        match self {
            LayerRef::First => Ok(0),
            LayerRef::Last => Ok(n_layers - 1),
            LayerRef::Index(i) if i < n_layers => Ok(i),
            LayerRef::Index(i) => Err(GridPropError::dimension(format!(
                "Layer index {} is outside a depth dimension of {}",
                i, n_layers
            ))),
        }
    }
}

/// Where a single point falls along the depth layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerBracket {
    /// Exactly on, or shallower than, a single layer
    Layer(usize),
    /// Between two adjacent layers; `alpha` is 0 at `shallow` and 1 at `deep`
    Between { shallow: usize, deep: usize, alpha: f64 },
    /// Below the deepest layer
    Underground,
}

/// Depth resolution for a batch of points
#[derive(Debug, Clone, PartialEq)]
pub enum DepthBrackets {
    /// Every point is at the surface
    SurfaceOnly,
    /// One bracket per point
    Resolved(Vec<LayerBracket>),
}

/// Terrain-following sigma levels over a bathymetry field.
///
/// Layer depth at a point is `-sigma * H` with `sigma` in `[-1, 0]` and `H`
/// the water depth interpolated from the bathymetry.
#[derive(Debug, Clone)]
pub struct SigmaDepth {
    sigma: Vec<f64>,
    bathymetry: ArrayD<f64>,
    grid: GridRef,
}

impl SigmaDepth {
    pub fn new(sigma: Vec<f64>, bathymetry: ArrayD<f64>, grid: GridRef) -> Result<Self> {
        if sigma.is_empty() {
            return Err(GridPropError::construction("Sigma levels cannot be empty"));
        }
        if let Some(s) = sigma.iter().find(|s| !(-1.0..=0.0).contains(*s)) {
            return Err(GridPropError::construction(format!(
                "Sigma level {} is outside [-1, 0]",
                s
            )));
        }
        if grid.infer_location(bathymetry.shape()).is_none() || bathymetry.ndim() != grid.spatial_ndim() {
            return Err(GridPropError::shape_mismatch(format!(
                "Bathymetry shape {:?} does not fit the {} grid",
                bathymetry.shape(),
                grid.name()
            )));
        }
        Ok(Self {
            sigma,
            bathymetry,
            grid,
        })
    }

    pub fn sigma(&self) -> &[f64] {
        &self.sigma
    }
}

/// Vertical model of a gridded property
#[derive(Debug, Clone)]
pub enum DepthModel {
    /// Only the given surface layer is ever sampled
    Surface { surface_index: LayerRef },
    /// Fixed layer depths, positive downward, one per layer index
    Levels { depths: Vec<f64> },
    /// Terrain-following sigma coordinates
    Sigma(SigmaDepth),
}

impl DepthModel {
    /// Surface-only model sampling `surface_index`
    pub fn surface(surface_index: LayerRef) -> Self {
        DepthModel::Surface { surface_index }
    }

    /// Fixed-level model; depths must be strictly monotonic
    pub fn levels(depths: Vec<f64>) -> Result<Self> {
        if depths.is_empty() {
            return Err(GridPropError::construction("Depth levels cannot be empty"));
        }
        if !crate::grid::common::is_strictly_monotonic(&depths) {
            return Err(GridPropError::construction(
                "Depth levels must be strictly monotonic",
            ));
        }
        Ok(DepthModel::Levels { depths })
    }

    pub fn sigma(sigma: SigmaDepth) -> Self {
        DepthModel::Sigma(sigma)
    }

    /// Whether both models define the same layers over the same grid
    pub fn same_layers(&self, other: &DepthModel) -> bool {
        match (self, other) {
            (DepthModel::Surface { surface_index: a }, DepthModel::Surface { surface_index: b }) => a == b,
            (DepthModel::Levels { depths: a }, DepthModel::Levels { depths: b }) => a == b,
            (DepthModel::Sigma(a), DepthModel::Sigma(b)) => {
                a.sigma == b.sigma
                    && a.bathymetry == b.bathymetry
                    && Arc::as_ptr(&a.grid) as *const () == Arc::as_ptr(&b.grid) as *const ()
            }
            _ => false,
        }
    }

    /// Name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            DepthModel::Surface { .. } => "surface",
            DepthModel::Levels { .. } => "levels",
            DepthModel::Sigma(_) => "sigma",
        }
    }

    /// Index of the shallowest layer
    pub fn surface_index(&self, n_layers: usize) -> Result<usize> {
        match self {
            DepthModel::Surface { surface_index } => surface_index.resolve(n_layers),
            DepthModel::Levels { depths } => {
                self.check_layers(depths.len(), n_layers)?;
                Ok(arg_extreme(depths, |a, b| a < b))
            }
            DepthModel::Sigma(s) => {
                self.check_layers(s.sigma.len(), n_layers)?;
                Ok(arg_extreme(&s.sigma, |a, b| a > b))
            }
        }
    }

    /// Index of the deepest layer
    pub fn bottom_index(&self, n_layers: usize) -> Result<usize> {
        match self {
            DepthModel::Surface { surface_index } => {
                let surface = surface_index.resolve(n_layers)?;
                Ok(if surface == 0 { n_layers - 1 } else { 0 })
            }
            DepthModel::Levels { depths } => {
                self.check_layers(depths.len(), n_layers)?;
                Ok(arg_extreme(depths, |a, b| a > b))
            }
            DepthModel::Sigma(s) => {
                self.check_layers(s.sigma.len(), n_layers)?;
                Ok(arg_extreme(&s.sigma, |a, b| a < b))
            }
        }
    }

    /// Resolve per-point layer brackets for a depth dimension of `n_layers`.
    ///
    /// `memo` is forwarded to the grid when sigma levels need the bathymetry
    /// at the query points.
    pub fn interpolation_alphas(
        &self,
        points: &ArrayView2<f64>,
        n_layers: usize,
        memo: Option<u64>,
    ) -> Result<DepthBrackets> {
        if is_surface_only(points) {
            return Ok(DepthBrackets::SurfaceOnly);
        }
        let depths = points.column(2);

        let brackets = match self {
            DepthModel::Surface { .. } => return Ok(DepthBrackets::SurfaceOnly),
            DepthModel::Levels { depths: levels } => {
                self.check_layers(levels.len(), n_layers)?;
                let order = shallow_to_deep(levels);
                depths
                    .iter()
                    .map(|&d| bracket(d, levels, &order))
                    .collect()
            }
            DepthModel::Sigma(s) => {
                self.check_layers(s.sigma.len(), n_layers)?;
                let water_depth =
                    s.grid
                        .interpolate_var_to_points(points, &s.bathymetry.view(), memo)?;
                let layer_depths_of = |h: f64| s.sigma.iter().map(|sg| -sg * h).collect::<Vec<_>>();
                let order = shallow_to_deep(&layer_depths_of(1.0));
                depths
                    .iter()
                    .zip(water_depth.iter())
                    .map(|(&d, &h)| {
                        if h.is_nan() {
                            LayerBracket::Underground
                        } else {
                            bracket(d, &layer_depths_of(h), &order)
                        }
                    })
                    .collect()
            }
        };
        Ok(DepthBrackets::Resolved(brackets))
    }

    fn check_layers(&self, model_layers: usize, data_layers: usize) -> Result<()> {
        if model_layers != data_layers {
            return Err(GridPropError::shape_mismatch(format!(
                "{} depth model has {} layers but data has {}",
                self.kind(),
                model_layers,
                data_layers
            )));
        }
        Ok(())
    }
}

/// Whether every point lies within [`SURFACE_TOLERANCE`] of the surface
pub fn is_surface_only(points: &ArrayView2<f64>) -> bool {
    points.ncols() < 3 || points.column(2).iter().all(|d| d.abs() <= SURFACE_TOLERANCE)
}

fn arg_extreme(values: &[f64], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if better(v, values[best]) {
            best = i;
        }
    }
    best
}

/// Layer indices ordered from the shallowest to the deepest
fn shallow_to_deep(layer_depths: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..layer_depths.len()).collect();
    order.sort_by(|&a, &b| layer_depths[a].total_cmp(&layer_depths[b]));
    order
}

fn bracket(depth: f64, layer_depths: &[f64], order: &[usize]) -> LayerBracket {
    let shallowest = order[0];
    let deepest = order[order.len() - 1];
    if depth <= layer_depths[shallowest] {
        return LayerBracket::Layer(shallowest);
    }
    if depth > layer_depths[deepest] {
        return LayerBracket::Underground;
    }
    for pair in order.windows(2) {
        let (shallow, deep) = (pair[0], pair[1]);
        let (d0, d1) = (layer_depths[shallow], layer_depths[deep]);
        if depth <= d1 {
            if depth == d1 {
                return LayerBracket::Layer(deep);
            }
            let alpha = (depth - d0) / (d1 - d0);
            return LayerBracket::Between {
                shallow,
                deep,
                alpha,
            };
        }
    }
    LayerBracket::Layer(deepest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RectilinearGrid;
    use ndarray::{array, Array2};
    use std::sync::Arc;

    #[test]
    fn test_layer_ref_resolve() {
        assert_eq!(LayerRef::First.resolve(5).unwrap(), 0);
        assert_eq!(LayerRef::Last.resolve(5).unwrap(), 4);
        assert_eq!(LayerRef::Index(2).resolve(5).unwrap(), 2);
        assert!(LayerRef::Index(5).resolve(5).is_err());
        assert!(LayerRef::Last.resolve(0).is_err());
    }

    #[test]
    fn test_same_layers() {
        let levels = DepthModel::levels(vec![0.0, 10.0]).unwrap();
        assert!(levels.same_layers(&DepthModel::levels(vec![0.0, 10.0]).unwrap()));
        assert!(!levels.same_layers(&DepthModel::levels(vec![0.0, 20.0]).unwrap()));
        assert!(!levels.same_layers(&DepthModel::surface(LayerRef::Last)));
        assert!(DepthModel::surface(LayerRef::Last).same_layers(&DepthModel::surface(LayerRef::Last)));
        assert!(!DepthModel::surface(LayerRef::Last).same_layers(&DepthModel::surface(LayerRef::First)));
    }

    #[test]
    fn test_surface_fast_path() {
        let model = DepthModel::levels(vec![0.0, 10.0, 20.0]).unwrap();
        let points = array![[0.0, 0.0, 0.0], [1.0, 1.0, 0.00005]];
        assert_eq!(
            model.interpolation_alphas(&points.view(), 3, None).unwrap(),
            DepthBrackets::SurfaceOnly
        );
        let flat = array![[0.0, 0.0]];
        assert_eq!(
            model.interpolation_alphas(&flat.view(), 3, None).unwrap(),
            DepthBrackets::SurfaceOnly
        );
    }

    #[test]
    fn test_level_brackets() {
        let model = DepthModel::levels(vec![0.0, 10.0, 20.0]).unwrap();
        let points = array![[0.0, 0.0, 5.0], [0.0, 0.0, 10.0], [0.0, 0.0, 15.0], [0.0, 0.0, 25.0]];
        let DepthBrackets::Resolved(brackets) =
            model.interpolation_alphas(&points.view(), 3, None).unwrap()
        else {
            panic!("Expected resolved brackets");
        };
        assert_eq!(
            brackets,
            vec![
                LayerBracket::Between {
                    shallow: 0,
                    deep: 1,
                    alpha: 0.5
                },
                LayerBracket::Layer(1),
                LayerBracket::Between {
                    shallow: 1,
                    deep: 2,
                    alpha: 0.5
                },
                LayerBracket::Underground,
            ]
        );
    }

    #[test]
    fn test_reversed_levels() {
        // Layer 0 is the bottom, as in many ocean models
        let model = DepthModel::levels(vec![30.0, 10.0]).unwrap();
        assert_eq!(model.surface_index(2).unwrap(), 1);
        assert_eq!(model.bottom_index(2).unwrap(), 0);

        let points = array![[0.0, 0.0, 5.0], [0.0, 0.0, 20.0]];
        let DepthBrackets::Resolved(brackets) =
            model.interpolation_alphas(&points.view(), 2, None).unwrap()
        else {
            panic!("Expected resolved brackets");
        };
        assert_eq!(brackets[0], LayerBracket::Layer(1));
        assert_eq!(
            brackets[1],
            LayerBracket::Between {
                shallow: 1,
                deep: 0,
                alpha: 0.5
            }
        );
    }

    #[test]
    fn test_layer_count_mismatch() {
        let model = DepthModel::levels(vec![0.0, 10.0]).unwrap();
        let points = array![[0.0, 0.0, 5.0]];
        assert!(matches!(
            model.interpolation_alphas(&points.view(), 3, None),
            Err(GridPropError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_surface_model_never_resolves() {
        let model = DepthModel::surface(LayerRef::Last);
        let points = array![[0.0, 0.0, 50.0]];
        assert_eq!(
            model.interpolation_alphas(&points.view(), 4, None).unwrap(),
            DepthBrackets::SurfaceOnly
        );
        assert_eq!(model.surface_index(4).unwrap(), 3);
        assert_eq!(model.bottom_index(4).unwrap(), 0);
    }

    #[test]
    fn test_sigma_brackets() {
        let grid = Arc::new(RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap());
        // 100 m deep everywhere
        let bathymetry = Array2::from_elem((2, 2), 100.0).into_dyn();
        let sigma = SigmaDepth::new(vec![-1.0, -0.5, 0.0], bathymetry, grid).unwrap();
        let model = DepthModel::sigma(sigma);

        assert_eq!(model.surface_index(3).unwrap(), 2);
        assert_eq!(model.bottom_index(3).unwrap(), 0);

        let points = array![[0.5, 0.5, 25.0], [0.5, 0.5, 100.0], [0.5, 0.5, 120.0], [5.0, 5.0, 10.0]];
        let DepthBrackets::Resolved(brackets) =
            model.interpolation_alphas(&points.view(), 3, None).unwrap()
        else {
            panic!("Expected resolved brackets");
        };
        assert_eq!(
            brackets[0],
            LayerBracket::Between {
                shallow: 2,
                deep: 1,
                alpha: 0.5
            }
        );
        assert_eq!(brackets[1], LayerBracket::Layer(0));
        assert_eq!(brackets[2], LayerBracket::Underground);
        assert_eq!(brackets[3], LayerBracket::Underground);
    }

    #[test]
    fn test_sigma_rejects_bad_input() {
        let grid: GridRef = Arc::new(RectilinearGrid::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap());
        let bathymetry = Array2::from_elem((2, 2), 10.0).into_dyn();
        assert!(SigmaDepth::new(vec![-1.5], bathymetry.clone(), grid.clone()).is_err());
        let wrong = Array2::from_elem((3, 3), 10.0).into_dyn();
        assert!(SigmaDepth::new(vec![-1.0, 0.0], wrong, grid).is_err());
    }
}
