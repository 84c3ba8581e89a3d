//! Discretized domain collaborator.
//!
//! The inversion core only needs a few capabilities from a mesh: the volumes
//! of the cells and interpolation operators from grid locations to arbitrary
//! points. These are captured by the [`Mesh`] trait. [`TensorMesh`] is a
//! simple regular tensor-product mesh in one or two dimensions that implements
//! it, together with the cell-difference operators used by
//! [`Tikhonov`](crate::regularization::Tikhonov) regularization.

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use thiserror::Error;

use crate::core::ConfigurationError;

/// Identity of a mesh, used as a cache key.
///
/// Assigned from a monotonic counter when the mesh is constructed, so two
/// meshes never share an identity even if they are structurally equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(u64);

impl MeshId {
    /// Allocates a new unique identity.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        MeshId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Location on the grid where field values live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridLocation {
    /// Cell centers.
    CellCenter,
    /// Cell faces.
    Face,
    /// Cell edges.
    Edge,
    /// Cell nodes (corners).
    Node,
}

/// Error of the mesh operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// The mesh does not support interpolation from given grid location.
    #[error("interpolation from {0:?} is not supported by this mesh")]
    UnsupportedLocation(GridLocation),
    /// The locations have a different number of columns than the mesh has
    /// dimensions.
    #[error("locations have {actual} columns, mesh has {expected} dimensions")]
    InvalidLocations {
        /// Mesh dimension.
        expected: usize,
        /// Number of columns of the locations.
        actual: usize,
    },
}

/// Interface of a discretized domain.
pub trait Mesh {
    /// Identity of the mesh.
    fn id(&self) -> MeshId;

    /// Number of spatial dimensions.
    fn dim(&self) -> usize;

    /// Number of cells.
    fn n_cells(&self) -> usize;

    /// Volumes of the cells (areas in 2-D, lengths in 1-D).
    fn cell_volumes(&self) -> &DVector<f64>;

    /// Builds the sparse operator that maps values at `location` to values at
    /// given points (one point per row of `locations`).
    fn interpolation_matrix(
        &self,
        locations: &DMatrix<f64>,
        location: GridLocation,
    ) -> Result<CsrMatrix<f64>, MeshError>;
}

/// Regular tensor-product mesh in one or two dimensions.
///
/// Cells are ordered with the x index running fastest.
#[derive(Debug, Clone)]
pub struct TensorMesh {
    id: MeshId,
    widths: Vec<DVector<f64>>,
    origin: Vec<f64>,
    volumes: DVector<f64>,
}

impl TensorMesh {
    /// Creates a mesh from cell widths along each axis and the origin (the
    /// lowest node).
    pub fn new(widths: Vec<Vec<f64>>, origin: Vec<f64>) -> Result<Self, ConfigurationError> {
        if widths.is_empty() || widths.len() > 2 {
            return Err(ConfigurationError::DimensionMismatch {
                what: "tensor mesh dimension (1 or 2)",
                expected: 2,
                actual: widths.len(),
            });
        }

        ConfigurationError::check_dim("mesh origin", widths.len(), origin.len())?;

        for axis in &widths {
            if axis.is_empty() {
                return Err(ConfigurationError::Missing("cell widths"));
            }

            for &h in axis {
                if !(h > 0.0) {
                    return Err(ConfigurationError::Negative {
                        name: "cell width",
                        value: h,
                    });
                }
            }
        }

        let widths: Vec<_> = widths.into_iter().map(DVector::from_vec).collect();
        let volumes = match widths.as_slice() {
            [hx] => hx.clone(),
            [hx, hy] => DVector::from_iterator(
                hx.len() * hy.len(),
                hy.iter().flat_map(|&y| hx.iter().map(move |&x| x * y)),
            ),
            _ => unreachable!(),
        };

        Ok(Self {
            id: MeshId::next(),
            widths,
            origin,
            volumes,
        })
    }

    /// Creates a mesh of `n` cells of the same width along every axis, covering
    /// `[0, extent]`.
    pub fn uniform(n: &[usize], extent: &[f64]) -> Result<Self, ConfigurationError> {
        ConfigurationError::check_dim("mesh extent", n.len(), extent.len())?;

        let widths = n
            .iter()
            .zip(extent.iter())
            .map(|(&ni, &ei)| vec![ei / ni as f64; ni])
            .collect();

        Self::new(widths, vec![0.0; n.len()])
    }

    /// Number of cells along each axis.
    pub fn shape_cells(&self) -> Vec<usize> {
        self.widths.iter().map(|h| h.len()).collect()
    }

    /// Cell widths along given axis.
    pub fn widths(&self, axis: usize) -> &DVector<f64> {
        &self.widths[axis]
    }

    /// Node coordinates along given axis.
    pub fn nodes_along(&self, axis: usize) -> Vec<f64> {
        let mut nodes = Vec::with_capacity(self.widths[axis].len() + 1);
        let mut x = self.origin[axis];
        nodes.push(x);

        for h in self.widths[axis].iter() {
            x += h;
            nodes.push(x);
        }

        nodes
    }

    /// Cell center coordinates along given axis.
    pub fn centers_along(&self, axis: usize) -> Vec<f64> {
        self.nodes_along(axis)
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect()
    }

    /// Cell centers, one row per cell.
    pub fn cell_centers(&self) -> DMatrix<f64> {
        let centers: Vec<_> = (0..self.dim()).map(|axis| self.centers_along(axis)).collect();
        let mut grid = DMatrix::zeros(self.n_cells(), self.dim());

        for cell in 0..self.n_cells() {
            for (axis, index) in self.unravel(cell).into_iter().enumerate() {
                grid[(cell, axis)] = centers[axis][index];
            }
        }

        grid
    }

    /// Difference operator between neighboring cell centers along given axis,
    /// divided by the distance of the centers.
    ///
    /// Has one row per pair of neighbors, so its shape is `(n_pairs,
    /// n_cells)`.
    pub fn cell_difference(&self, axis: usize) -> CsrMatrix<f64> {
        let centers = self.centers_along(axis);
        let pairs = self.neighbor_pairs(axis);
        let mut coo = CooMatrix::new(pairs.len(), self.n_cells());

        for (row, &(a, b)) in pairs.iter().enumerate() {
            let ia = self.unravel(a)[axis];
            let dist = centers[ia + 1] - centers[ia];
            coo.push(row, a, -1.0 / dist);
            coo.push(row, b, 1.0 / dist);
        }

        CsrMatrix::from(&coo)
    }

    /// Average volume of the two cells in each neighbor pair along given axis,
    /// in the same order as the rows of
    /// [`cell_difference`](TensorMesh::cell_difference).
    pub fn pair_volumes(&self, axis: usize) -> DVector<f64> {
        let pairs = self.neighbor_pairs(axis);
        DVector::from_iterator(
            pairs.len(),
            pairs
                .iter()
                .map(|&(a, b)| 0.5 * (self.volumes[a] + self.volumes[b])),
        )
    }

    fn neighbor_pairs(&self, axis: usize) -> Vec<(usize, usize)> {
        let shape = self.shape_cells();
        let stride = if axis == 0 { 1 } else { shape[0] };

        (0..self.n_cells())
            .filter(|&cell| self.unravel(cell)[axis] + 1 < shape[axis])
            .map(|cell| (cell, cell + stride))
            .collect()
    }

    fn unravel(&self, cell: usize) -> Vec<usize> {
        let nx = self.widths[0].len();
        match self.widths.len() {
            1 => vec![cell],
            _ => vec![cell % nx, cell / nx],
        }
    }
}

impl Mesh for TensorMesh {
    fn id(&self) -> MeshId {
        self.id
    }

    fn dim(&self) -> usize {
        self.widths.len()
    }

    fn n_cells(&self) -> usize {
        self.volumes.len()
    }

    fn cell_volumes(&self) -> &DVector<f64> {
        &self.volumes
    }

    fn interpolation_matrix(
        &self,
        locations: &DMatrix<f64>,
        location: GridLocation,
    ) -> Result<CsrMatrix<f64>, MeshError> {
        if locations.ncols() != self.dim() {
            return Err(MeshError::InvalidLocations {
                expected: self.dim(),
                actual: locations.ncols(),
            });
        }

        let grids: Vec<Vec<f64>> = match location {
            GridLocation::CellCenter => (0..self.dim()).map(|a| self.centers_along(a)).collect(),
            GridLocation::Node => (0..self.dim()).map(|a| self.nodes_along(a)).collect(),
            other => return Err(MeshError::UnsupportedLocation(other)),
        };

        let n_points: usize = grids.iter().map(Vec::len).product();
        let mut coo = CooMatrix::new(locations.nrows(), n_points);

        for (row, point) in locations.row_iter().enumerate() {
            let wx = axis_weights(&grids[0], point[0]);

            if grids.len() == 1 {
                for (i, w) in wx {
                    if w != 0.0 {
                        coo.push(row, i, w);
                    }
                }
            } else {
                let nx = grids[0].len();
                let wy = axis_weights(&grids[1], point[1]);

                for (j, vy) in wy {
                    for &(i, vx) in &wx {
                        let w = vx * vy;
                        if w != 0.0 {
                            coo.push(row, i + nx * j, w);
                        }
                    }
                }
            }
        }

        Ok(CsrMatrix::from(&coo))
    }
}

// Linear interpolation weights of x on a sorted grid. Points outside the grid
// take the value of the closest grid point.
fn axis_weights(grid: &[f64], x: f64) -> [(usize, f64); 2] {
    let n = grid.len();

    if n == 1 || x <= grid[0] {
        return [(0, 1.0), (0, 0.0)];
    }

    if x >= grid[n - 1] {
        return [(n - 1, 1.0), (n - 1, 0.0)];
    }

    let i = grid.partition_point(|&g| g <= x) - 1;
    let t = (x - grid[i]) / (grid[i + 1] - grid[i]);

    [(i, 1.0 - t), (i + 1, t)]
}
