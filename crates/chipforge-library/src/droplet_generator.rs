use chipforge_core::error::TemplateResult;
use chipforge_core::geometry::{circle, rectangle_between, Point, Shape};
use chipforge_core::schema::{ParameterField, ParameterSchema, PlacementTool};
use chipforge_core::{ComponentPort, LogicalLayer, ParamMap};

use crate::template::{unsupported, Template};

/// Flow-focusing droplet generator.
///
/// A central water channel meets two oil channels tilted by `±angle` at a
/// shared junction a third of `length` upstream of `position`. Every
/// channel mouth ends in a circular terminal. Children are composed as is,
/// without boolean merging.
pub struct DropletGeneratorFlowFocus {
    schema: ParameterSchema,
}

impl DropletGeneratorFlowFocus {
    pub fn new() -> Self {
        let schema = ParameterSchema::builder("DROPLET GENERATOR FLOW FOCUS")
            .unique(ParameterField::point("position"))
            .heritable(ParameterField::float("componentSpacing", 1000.0, "μm").bounds(0.0, 10000.0))
            .heritable(ParameterField::float("oilChannelWidth", 400.0, "μm").bounds(1.0, 2000.0))
            .heritable(ParameterField::float("waterChannelWidth", 200.0, "μm").bounds(1.0, 2000.0))
            .heritable(ParameterField::float("length", 3000.0, "μm").bounds(1.0, 20000.0))
            .heritable(ParameterField::float("radius", 500.0, "μm").bounds(1.0, 2000.0))
            .heritable(ParameterField::float("angle", 45.0, "°").bounds(1.0, 360.0))
            .heritable(ParameterField::float("height", 250.0, "μm").bounds(10.0, 1200.0))
            .heritable(ParameterField::float("rotation", 0.0, "°").bounds(0.0, 360.0))
            .feature_params(&[
                "componentSpacing",
                "position",
                "oilChannelWidth",
                "waterChannelWidth",
                "length",
                "angle",
                "height",
                "rotation",
                "radius",
            ])
            .target_params(&[
                "componentSpacing",
                "oilChannelWidth",
                "waterChannelWidth",
                "length",
                "angle",
                "height",
                "rotation",
                "radius",
            ])
            .placement(PlacementTool::ComponentPosition)
            .layer(LogicalLayer::Flow, "height", "0")
            .build();
        Self { schema }
    }
}

impl Default for DropletGeneratorFlowFocus {
    fn default() -> Self {
        Self::new()
    }
}

impl Template for DropletGeneratorFlowFocus {
    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn draw(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        if layer != LogicalLayer::Flow {
            return Err(unsupported(layer));
        }
        let position = params.point("position")?;
        let oil = params.float("oilChannelWidth")?;
        let water = params.float("waterChannelWidth")?;
        let length = params.float("length")?;
        let angle = params.float("angle")?;
        let radius = params.float("radius")?;
        let rotation = params.float("rotation")?;
        let Point { x, y } = position;

        let junction = Point::new(x - length / 3.0, y);
        let inlet_x = junction.x - 2.0 * length;
        let mut children = Vec::with_capacity(9);

        // Water channel and its terminal.
        children.push(rectangle_between(
            Point::new(inlet_x, y - water / 2.0),
            Point::new(x, y + water / 2.0),
        ));
        children.push(circle(Point::new(inlet_x, y), radius));

        // Tilted oil channels meeting at the junction.
        let tilted_length = length / angle.to_radians().cos();
        let tilt = rectangle_between(
            Point::new(junction.x - tilted_length, y - oil / 2.0),
            Point::new(junction.x, y + oil / 2.0),
        );
        children.push(tilt.rotate(angle, junction));
        children.push(tilt.rotate(-angle, junction));

        // Oil feeds above (sign -1) and below (sign +1) the centre line.
        let rise = tilted_length * angle.to_radians().sin();
        let seam_cover = (oil / 2.0) * (90.0 - angle).to_radians().tan();
        let riser_x = junction.x - length;
        for sign in [-1.0, 1.0] {
            let near = y + sign * (rise - seam_cover);
            let far = y + sign * (rise + 2.0 * length / 3.0 - seam_cover);
            children.push(rectangle_between(
                Point::new(riser_x - oil / 2.0, far),
                Point::new(riser_x + oil / 2.0, near),
            ));
            children.push(rectangle_between(
                Point::new(inlet_x, far),
                Point::new(riser_x - oil / 2.0, far - sign * oil),
            ));
            children.push(circle(Point::new(inlet_x, far - sign * oil / 2.0), radius));
        }

        Ok(children
            .into_iter()
            .map(|c| c.rotate(-rotation, position))
            .collect())
    }

    fn derive_ports(&self, _params: &ParamMap) -> TemplateResult<Vec<ComponentPort>> {
        Ok(vec![ComponentPort::new(0.0, 0.0, "1", LogicalLayer::Flow)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_children() {
        let generator = DropletGeneratorFlowFocus::new();
        let params = generator.schema().instantiate(Point::origin());
        let compound = generator.geometry(LogicalLayer::Flow, &params).unwrap();
        assert_eq!(compound.len(), 10);
    }

    #[test]
    fn test_generator_is_mirror_symmetric() {
        let generator = DropletGeneratorFlowFocus::new();
        let params = generator.schema().instantiate(Point::origin());
        let bb = generator
            .geometry(LogicalLayer::Flow, &params)
            .unwrap()
            .bbox()
            .unwrap();
        assert!((bb.min.y + bb.max.y).abs() < 1e-6);
        assert!(bb.max.x.abs() < 1e-6);
        // Inlet terminals sit 7/3 length upstream.
        assert!((bb.min.x - (-7000.0 - 500.0)).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_is_clockwise_about_position() {
        let generator = DropletGeneratorFlowFocus::new();
        let params = generator
            .schema()
            .instantiate(Point::origin())
            .with("rotation", 90.0);
        let bb = generator
            .geometry(LogicalLayer::Flow, &params)
            .unwrap()
            .bbox()
            .unwrap();
        // -90° sends the upstream (-x) side towards +y.
        assert!((bb.max.y - 7500.0).abs() < 1e-6);
        assert!(bb.min.y.abs() < 1e-6);
    }

    #[test]
    fn test_single_outlet_port() {
        let generator = DropletGeneratorFlowFocus::new();
        let params = generator.schema().instantiate(Point::origin());
        let ports = generator.ports(&params).unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!((ports[0].x, ports[0].y), (0.0, 0.0));
    }
}
