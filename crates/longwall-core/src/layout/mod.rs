//! Mine-panel layout: derived design parameters, orientation-aware strip
//! packing, boundary gateroads, and per-panel cut-throughs.

pub mod packing;
pub mod params;
pub mod roadways;

pub use packing::{pack_panels, Frame, PackResult, Panel, Pillar};
pub use params::{
    derive_params, DesignParams, LayoutDirection, LockedRect, Orientation, PlanRequest, UserEdits,
};
pub use roadways::{cut_throughs, main_roadways, Roadway, RoadwayKind};
