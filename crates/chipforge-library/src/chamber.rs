use chipforge_core::error::TemplateResult;
use chipforge_core::geometry::{rectangle, Point, Shape};
use chipforge_core::schema::{ParameterField, ParameterSchema, PlacementTool};
use chipforge_core::{ComponentPort, LogicalLayer, ParamMap};

use crate::template::{unsupported, Template};

/// A rounded rectangular reaction chamber.
pub struct Chamber {
    schema: ParameterSchema,
}

impl Chamber {
    pub fn new() -> Self {
        let schema = ParameterSchema::builder("REACTION CHAMBER")
            .unique(ParameterField::point("position"))
            .heritable(ParameterField::float("componentSpacing", 1000.0, "μm").bounds(0.0, 10000.0))
            .heritable(ParameterField::float("width", 5000.0, "μm").bounds(5.0, 50000.0))
            .heritable(ParameterField::float("length", 5000.0, "μm").bounds(5.0, 50000.0))
            .heritable(ParameterField::float("height", 250.0, "μm").bounds(1.0, 50000.0))
            .heritable(ParameterField::float("cornerRadius", 200.0, "μm").bounds(1.0, 1000.0))
            .heritable(ParameterField::float("rotation", 0.0, "°").bounds(0.0, 360.0))
            .feature_params(&[
                "componentSpacing",
                "position",
                "width",
                "length",
                "height",
                "cornerRadius",
                "rotation",
            ])
            .target_params(&[
                "componentSpacing",
                "position",
                "width",
                "length",
                "height",
                "cornerRadius",
                "rotation",
            ])
            .placement(PlacementTool::ComponentPosition)
            .layer(LogicalLayer::Flow, "height", "0")
            .build();
        Self { schema }
    }
}

impl Default for Chamber {
    fn default() -> Self {
        Self::new()
    }
}

impl Template for Chamber {
    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn draw(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        if layer != LogicalLayer::Flow {
            return Err(unsupported(layer));
        }
        let position = params.point("position")?;
        let w = params.float("width")?;
        let l = params.float("length")?;
        let radius = params.float("cornerRadius")?;
        let rotation = params.float("rotation")?;

        let body = rectangle(
            Point::new(position.x - w / 2.0, position.y - l / 2.0),
            (w, l),
            radius,
        );
        Ok(vec![body.rotate(rotation, position)])
    }

    fn derive_ports(&self, params: &ParamMap) -> TemplateResult<Vec<ComponentPort>> {
        let l = params.float("length")?;
        let w = params.float("width")?;
        Ok(vec![
            ComponentPort::new(0.0, -l / 2.0, "1", LogicalLayer::Flow),
            ComponentPort::new(w / 2.0, 0.0, "2", LogicalLayer::Flow),
            ComponentPort::new(0.0, l / 2.0, "3", LogicalLayer::Flow),
            ComponentPort::new(-w / 2.0, 0.0, "4", LogicalLayer::Flow),
        ])
    }
}
