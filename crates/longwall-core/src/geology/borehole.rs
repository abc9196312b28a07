//! Borehole horizon processing: layer walks, coal-seam selection, and the
//! derived attributes the scoring and layout stages consume.

use serde::{Deserialize, Serialize};

use crate::error::Error;

// Attribute defaults for boreholes that carry no measured value.
pub const DEFAULT_ROCK_HARDNESS: f64 = 5.0;
pub const DEFAULT_GAS_CONTENT: f64 = 0.0;
pub const DEFAULT_COAL_THICKNESS: f64 = 3.0;
pub const DEFAULT_GROUND_WATER: f64 = 0.0;
pub const DEFAULT_CALORIFIC_VALUE: f64 = 25.0;

/// Hardness when a layered borehole has no non-coal horizon: the optimum of
/// the safety formula, so an all-coal column carries no hardness penalty.
const HARDNESS_NO_ROCK: f64 = 7.0;

/// Fixed lithology → Protodyakonov-style hardness table, first match wins.
/// Longer markers precede their substrings (粉砂岩 before 砂岩).
const LITHOLOGY_HARDNESS: &[(&str, f64)] = &[
    ("粉砂岩", 5.0),
    ("siltstone", 5.0),
    ("砂岩", 6.0),
    ("sandstone", 6.0),
    ("石灰岩", 8.0),
    ("灰岩", 8.0),
    ("limestone", 8.0),
    ("泥岩", 3.0),
    ("mudstone", 3.0),
    ("页岩", 4.0),
    ("shale", 4.0),
    ("砾岩", 7.0),
    ("conglomerate", 7.0),
    ("花岗岩", 9.0),
    ("granite", 9.0),
    ("黏土", 2.0),
    ("clay", 2.0),
    ("土", 2.0),
    ("soil", 2.0),
];

fn lithology_hardness(name: &str) -> f64 {
    LITHOLOGY_HARDNESS
        .iter()
        .find(|(marker, _)| name.contains(marker))
        .map(|&(_, h)| h)
        .unwrap_or(DEFAULT_ROCK_HARDNESS)
}

/// Markers whose presence in a layer name marks it as coal. The source
/// domain uses the literal `"煤"`; the list is configurable at ingest.
pub fn default_coal_markers() -> Vec<String> {
    vec!["煤".to_string(), "coal".to_string()]
}

/// One stratigraphic layer of a borehole, top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub thickness: f64,
}

impl Layer {
    pub fn new(name: &str, thickness: f64) -> Self {
        Self {
            name: name.to_string(),
            thickness,
        }
    }
}

/// Pre-computed attributes supplied in place of (or alongside) a layer
/// sequence. Explicit values win over layer-derived ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoreholeAttributes {
    pub coal_thickness: Option<f64>,
    pub top_elevation: Option<f64>,
    pub bottom_elevation: Option<f64>,
    pub depth: Option<f64>,
    pub rock_hardness: Option<f64>,
    pub gas_content: Option<f64>,
    pub ground_water: Option<f64>,
    pub calorific_value: Option<f64>,
}

/// Raw borehole as handed over by the ingest collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoreholeInput {
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub surface_elevation: Option<f64>,
    #[serde(default)]
    pub total_depth: Option<f64>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub attributes: Option<BoreholeAttributes>,
}

/// How the target coal seam is chosen within each borehole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum SeamSelection {
    /// The thickest coal layer in the borehole.
    #[default]
    Auto,
    /// The first coal layer whose name contains the given substring.
    Named(String),
}

/// A horizon produced by the top-to-bottom layer walk.
#[derive(Debug, Clone, PartialEq)]
pub struct Horizon {
    pub name: String,
    pub thickness: f64,
    pub top_depth: f64,
    pub bottom_depth: f64,
    pub top_elevation: f64,
    pub bottom_elevation: f64,
    pub is_coal: bool,
}

/// A borehole with all derived fields populated, ready for modelling and
/// scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borehole {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub coal_thickness: f64,
    pub top_elevation: Option<f64>,
    pub bottom_elevation: Option<f64>,
    pub depth: Option<f64>,
    pub rock_hardness: f64,
    pub gas_content: f64,
    pub ground_water: f64,
    pub calorific_value: f64,
}

/// Walk the layer list accumulating depth. Layers with an empty name or a
/// non-positive thickness are dropped. Elevations are surface-relative:
/// `elevation = surface − depth`, with surface defaulting to 0.
pub fn walk_layers(layers: &[Layer], surface: f64, coal_markers: &[String]) -> Vec<Horizon> {
    let mut current = 0.0;
    let mut horizons = Vec::new();
    for layer in layers {
        if layer.name.is_empty() || layer.thickness <= 0.0 {
            continue;
        }
        let top = current;
        let bottom = current + layer.thickness;
        current = bottom;
        horizons.push(Horizon {
            name: layer.name.clone(),
            thickness: layer.thickness,
            top_depth: top,
            bottom_depth: bottom,
            top_elevation: surface - top,
            bottom_elevation: surface - bottom,
            is_coal: coal_markers.iter().any(|m| layer.name.contains(m.as_str())),
        });
    }
    horizons
}

fn select_seam<'a>(
    horizons: &'a [Horizon],
    selection: &SeamSelection,
    borehole_id: &str,
) -> Result<&'a Horizon, Error> {
    let coal: Vec<&Horizon> = horizons.iter().filter(|h| h.is_coal).collect();
    if coal.is_empty() {
        return Err(Error::NoCoalFound {
            borehole: borehole_id.to_string(),
        });
    }
    match selection {
        SeamSelection::Named(name) => coal
            .iter()
            .find(|h| h.name.contains(name.as_str()))
            .copied()
            .ok_or_else(|| Error::CoalSeamNotFound {
                borehole: borehole_id.to_string(),
                requested: name.clone(),
                available: coal.iter().map(|h| h.name.clone()).collect(),
            }),
        SeamSelection::Auto => Ok(coal
            .iter()
            .copied()
            .max_by(|a, b| {
                a.thickness
                    .partial_cmp(&b.thickness)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap()),
    }
}

/// Thickness-weighted mean hardness over the non-coal horizons.
fn rock_hardness(horizons: &[Horizon]) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for h in horizons.iter().filter(|h| !h.is_coal) {
        weighted += lithology_hardness(&h.name) * h.thickness;
        total += h.thickness;
    }
    if total > 0.0 {
        weighted / total
    } else {
        HARDNESS_NO_ROCK
    }
}

/// Populate every derived field of one borehole. Fails only on seam
/// selection over a layered borehole; attribute-only boreholes always
/// resolve via defaults.
pub fn resolve_borehole(
    input: &BoreholeInput,
    selection: &SeamSelection,
    coal_markers: &[String],
) -> Result<Borehole, Error> {
    let attrs = input.attributes.clone().unwrap_or_default();
    let surface = input.surface_elevation.unwrap_or(0.0);
    let horizons = walk_layers(&input.layers, surface, coal_markers);

    let (coal_thickness, top_elevation, bottom_elevation, depth, hardness) = if horizons.is_empty()
    {
        (
            attrs.coal_thickness.unwrap_or(DEFAULT_COAL_THICKNESS),
            attrs.top_elevation,
            attrs.bottom_elevation,
            attrs.depth.or(input.total_depth),
            attrs.rock_hardness.unwrap_or(DEFAULT_ROCK_HARDNESS),
        )
    } else {
        let seam = select_seam(&horizons, selection, &input.id)?;
        (
            attrs.coal_thickness.unwrap_or(seam.thickness),
            attrs.top_elevation.or(Some(seam.top_elevation)),
            attrs.bottom_elevation.or(Some(seam.bottom_elevation)),
            attrs.depth.or(Some(seam.top_depth)),
            attrs.rock_hardness.unwrap_or_else(|| rock_hardness(&horizons)),
        )
    };

    Ok(Borehole {
        id: input.id.clone(),
        x: input.x,
        y: input.y,
        coal_thickness,
        top_elevation,
        bottom_elevation,
        depth,
        rock_hardness: hardness,
        gas_content: attrs.gas_content.unwrap_or(DEFAULT_GAS_CONTENT),
        ground_water: attrs.ground_water.unwrap_or(DEFAULT_GROUND_WATER),
        calorific_value: attrs.calorific_value.unwrap_or(DEFAULT_CALORIFIC_VALUE),
    })
}
