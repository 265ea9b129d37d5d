mod builder;
mod error;
mod rbf;
mod spatial;

pub use builder::{Edge, GraphBuilder, GraphConfig, NeighborGraph};
pub use error::Error;
pub use rbf::RadialBasis;
pub use spatial::SpatialGrid;
