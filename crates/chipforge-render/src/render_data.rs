use chipforge_core::{ComponentPort, LogicalLayer};
use serde::{Deserialize, Serialize};

/// One logical layer of a feature, flattened for a canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderLayer {
    pub layer: LogicalLayer,
    pub color: [f32; 4], // RGBA
    pub polygons: Vec<RenderPolygon>,
}

/// A closed ring (or open path) of straight segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderPolygon {
    /// Flat array of vertices: [x0, y0, x1, y1, ...]
    pub vertices: Vec<f64>,
    /// Holes are cut out of the outlines of the same shape.
    pub hole: bool,
    pub closed: bool,
}

impl RenderPolygon {
    pub fn point_count(&self) -> usize {
        self.vertices.len() / 2
    }
}

/// Everything a host needs to draw one placed feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedFeature {
    pub name: String,
    pub template: String,
    pub preview: bool,
    pub layers: Vec<RenderLayer>,
    /// Ports already moved into the canvas frame.
    pub ports: Vec<ComponentPort>,
    pub bounds: Option<[f64; 4]>, // [min_x, min_y, max_x, max_y]
}

/// Render output for a whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderFrame {
    pub features: Vec<RenderedFeature>,
    pub bounds: Option<[f64; 4]>,
}
