//! Geological modelling: borehole resolution, seam grids, and the fitted
//! seam plane (strike, dip direction, dip angle).

pub mod borehole;
pub mod model;

pub use borehole::{
    default_coal_markers, resolve_borehole, Borehole, BoreholeAttributes, BoreholeInput, Layer,
    SeamSelection,
};
pub use model::{build_geology, FieldStats, GeologyModel};
