//! Radial basis expansion of edge distances.
//!
//! Each scalar distance becomes a fixed-length vector of Gaussian responses
//! centered on an even grid over `[cutoff_lower, cutoff_upper]`. Centers and
//! width are fixed at construction and shared across all graphs, so the same
//! distance always produces the same feature vector.

use ndarray::{Array1, Array2};

use super::builder::NeighborGraph;
use super::error::Error;

/// Fixed Gaussian radial basis.
#[derive(Debug, Clone)]
pub struct RadialBasis {
    centers: Array1<f64>,
    gamma: f64,
}

impl RadialBasis {
    /// Places `rbf_dim` centers evenly over `[cutoff_lower, cutoff_upper]`.
    ///
    /// The Gaussian width follows the center spacing so adjacent basis
    /// functions overlap at roughly half height.
    pub fn new(rbf_dim: usize, cutoff_lower: f64, cutoff_upper: f64) -> Result<Self, Error> {
        if rbf_dim == 0 {
            return Err(Error::InvalidBasisSize);
        }
        if !(cutoff_lower >= 0.0 && cutoff_lower < cutoff_upper) {
            return Err(Error::InvalidCutoffs {
                lower: cutoff_lower,
                upper: cutoff_upper,
            });
        }

        let spacing = if rbf_dim > 1 {
            (cutoff_upper - cutoff_lower) / (rbf_dim - 1) as f64
        } else {
            cutoff_upper - cutoff_lower
        };
        let centers = Array1::from_iter(
            (0..rbf_dim).map(|k| cutoff_lower + spacing * k as f64),
        );
        let gamma = 1.0 / (2.0 * spacing * spacing);

        Ok(Self { centers, gamma })
    }

    /// Number of basis functions.
    pub fn dim(&self) -> usize {
        self.centers.len()
    }

    /// Expands one distance into its basis responses.
    pub fn expand(&self, distance: f64) -> Array1<f64> {
        self.centers
            .mapv(|center| (-self.gamma * (distance - center).powi(2)).exp())
    }

    /// Expands every edge of a graph: `[edge_count, rbf_dim]`, rows in the
    /// graph's edge order.
    pub fn expand_edges(&self, graph: &NeighborGraph) -> Array2<f64> {
        let mut features = Array2::zeros((graph.edge_count(), self.dim()));
        for (row, edge) in graph.edges().iter().enumerate() {
            features.row_mut(row).assign(&self.expand(edge.distance));
        }
        features
    }
}
