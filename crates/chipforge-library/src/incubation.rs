use chipforge_core::error::TemplateResult;
use chipforge_core::geometry::{polygon, Point, Shape};
use chipforge_core::schema::{ParameterField, ParameterSchema, PlacementTool};
use chipforge_core::{ComponentPort, LogicalLayer, ParamMap};

use crate::template::{unsupported, Template};

/// A hexagonal incubation channel: two mirrored chevrons joined at the tips.
pub struct Incubation {
    schema: ParameterSchema,
}

impl Incubation {
    pub fn new() -> Self {
        let schema = ParameterSchema::builder("INCUBATION")
            .unique(ParameterField::point("position"))
            .heritable(ParameterField::float("componentSpacing", 1000.0, "μm").bounds(0.0, 10000.0))
            .heritable(ParameterField::float("rotation", 0.0, "°").bounds(0.0, 360.0))
            .heritable(ParameterField::float("channelWidth", 800.0, "μm").bounds(10.0, 2000.0))
            .heritable(ParameterField::float("width", 1230.0, "μm").bounds(30.0, 6000.0))
            .heritable(ParameterField::float("length", 4920.0, "μm").bounds(120.0, 24000.0))
            .heritable(ParameterField::float("height", 250.0, "μm").bounds(10.0, 1200.0))
            .feature_params(&[
                "componentSpacing",
                "position",
                "rotation",
                "channelWidth",
                "length",
                "width",
            ])
            .target_params(&["componentSpacing", "channelWidth", "length", "width", "rotation"])
            .placement(PlacementTool::ComponentPosition)
            .layer(LogicalLayer::Flow, "height", "0")
            .build();
        Self { schema }
    }
}

impl Default for Incubation {
    fn default() -> Self {
        Self::new()
    }
}

impl Template for Incubation {
    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn draw(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        if layer != LogicalLayer::Flow {
            return Err(unsupported(layer));
        }
        let position = params.point("position")?;
        let cw = params.float("channelWidth")?;
        let l = params.float("length")?;
        let w = params.float("width")?;
        let rotation = params.float("rotation")?;
        let Point { x: px, y: py } = position;

        let hexagon = polygon(
            &[
                Point::new(px - cw / 2.0, py - l / 2.0),
                Point::new(px + cw / 2.0, py - l / 2.0),
                Point::new(px + w + cw / 2.0, py),
                Point::new(px + cw / 2.0, py + l / 2.0),
                Point::new(px - cw / 2.0, py + l / 2.0),
                Point::new(px - cw / 2.0 - w, py),
            ],
            true,
        );
        Ok(vec![hexagon.rotate(rotation, position)])
    }

    fn derive_ports(&self, params: &ParamMap) -> TemplateResult<Vec<ComponentPort>> {
        let l = params.float("length")?;
        Ok(vec![
            ComponentPort::new(0.0, -l / 2.0, "1", LogicalLayer::Flow),
            ComponentPort::new(0.0, l / 2.0, "2", LogicalLayer::Flow),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hexagon_area_and_extent() {
        let incubation = Incubation::new();
        let params = incubation.schema().instantiate(Point::origin());
        let compound = incubation.geometry(LogicalLayer::Flow, &params).unwrap();
        assert_eq!(compound.len(), 1);
        assert_eq!(compound.children[0].outlines[0].vertex_count(), 6);

        // Central strip plus two triangles.
        let expected = 800.0 * 4920.0 + 1230.0 * 4920.0;
        assert!((compound.area() - expected).abs() < 1e-6);
        let bb = compound.bbox().unwrap();
        assert!((bb.width() - (800.0 + 2.0 * 1230.0)).abs() < 1e-9);
    }

    #[test]
    fn test_ports_at_tips() {
        let incubation = Incubation::new();
        let params = incubation.schema().instantiate(Point::origin());
        let ports = incubation.ports(&params).unwrap();
        assert_eq!(ports.len(), 2);
        assert!((ports[0].y + 2460.0).abs() < 1e-9);
        assert!((ports[1].y - 2460.0).abs() < 1e-9);
    }
}
