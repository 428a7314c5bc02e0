//! # Layers
//!
//! Stock layers for the visualization view:
//!
//! - [`GridLayer`]: ground grid in the XY plane
//! - [`AxisLayer`]: selectable RGB axis triad
//! - [`OrbitControlLayer`]: invisible gesture handler driving the orbit camera

mod axis;
mod grid;
mod orbit_control;

pub use axis::AxisLayer;
pub use grid::GridLayer;
pub use orbit_control::OrbitControlLayer;
