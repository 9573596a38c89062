use std::collections::BTreeMap;

use chipforge_core::schema::ParameterSchema;
use chipforge_core::{FillColor, LogicalLayer, TemplateResult};
use serde::{Deserialize, Serialize};

/// Document-wide drawing and stacking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    /// Largest chord deviation allowed when arcs are flattened, in μm.
    pub arc_tolerance: f64,
    /// Fill used for a layer when a feature carries no `color`.
    pub layer_colors: BTreeMap<LogicalLayer, FillColor>,
    /// Substrate that offset "0" refers to.
    pub base_substrate: i32,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            arc_tolerance: 5.0,
            layer_colors: LogicalLayer::ALL
                .iter()
                .map(|l| (*l, l.default_color()))
                .collect(),
            base_substrate: 0,
        }
    }
}

impl DocumentSettings {
    pub fn layer_color(&self, layer: LogicalLayer) -> FillColor {
        self.layer_colors
            .get(&layer)
            .copied()
            .unwrap_or_else(|| layer.default_color())
    }

    /// Absolute substrate index that `schema` places `layer` on.
    pub fn substrate_index(
        &self,
        schema: &ParameterSchema,
        layer: LogicalLayer,
    ) -> TemplateResult<i32> {
        Ok(self.base_substrate + schema.substrate_offset(layer)?)
    }
}
