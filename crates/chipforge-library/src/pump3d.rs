use chipforge_core::boolean::subtract;
use chipforge_core::error::TemplateResult;
use chipforge_core::geometry::{circle, rectangle_between, Point, Shape};
use chipforge_core::schema::{ParameterField, ParameterSchema, PlacementTool};
use chipforge_core::{ComponentPort, LogicalLayer, ParamMap};

use crate::template::{unsupported, Template};

/// A three-valve peristaltic pump spanning flow, control and inverse layers.
pub struct Pump3D {
    schema: ParameterSchema,
}

impl Pump3D {
    pub fn new() -> Self {
        let schema = ParameterSchema::builder("PUMP3D")
            .unique(ParameterField::point("position"))
            .heritable(ParameterField::float("componentSpacing", 1000.0, "μm").bounds(0.0, 10000.0))
            .heritable(ParameterField::float("valveRadius", 1200.0, "μm").bounds(10.0, 2000.0))
            .heritable(ParameterField::float("height", 250.0, "μm").bounds(10.0, 1200.0))
            .heritable(ParameterField::float("gap", 600.0, "μm").bounds(5.0, 1000.0))
            .heritable(ParameterField::float("width", 2400.0, "μm"))
            .heritable(ParameterField::float("length", 2400.0, "μm"))
            .heritable(ParameterField::float("rotation", 90.0, "°").bounds(0.0, 360.0))
            .heritable(ParameterField::float("spacing", 5000.0, "μm").bounds(10.0, 10000.0))
            .heritable(ParameterField::float("flowChannelWidth", 300.0, "μm").bounds(1.0, 10000.0))
            .feature_params(&[
                "componentSpacing",
                "position",
                "rotation",
                "valveRadius",
                "flowChannelWidth",
                "spacing",
                "gap",
            ])
            .target_params(&[
                "componentSpacing",
                "rotation",
                "valveRadius",
                "flowChannelWidth",
                "spacing",
                "gap",
            ])
            .placement(PlacementTool::MultilayerPosition)
            .layer(LogicalLayer::Flow, "height", "0")
            .layer(LogicalLayer::Control, "height", "+1")
            .layer(LogicalLayer::Inverse, "height", "0")
            .build();
        Self { schema }
    }
}

impl Default for Pump3D {
    fn default() -> Self {
        Self::new()
    }
}

struct PumpLayout {
    center: Point,
    radius: f64,
    gap: f64,
    spacing: f64,
    channel_width: f64,
    rotation: f64,
}

impl PumpLayout {
    fn from_params(params: &ParamMap) -> TemplateResult<Self> {
        Ok(Self {
            center: params.point("position")?,
            radius: params.float("valveRadius")?,
            gap: params.float("gap")?,
            spacing: params.float("spacing")?,
            channel_width: params.float("flowChannelWidth")?,
            rotation: params.float("rotation")?,
        })
    }

    /// Top, middle and bottom valve centres.
    fn valve_centers(&self) -> [Point; 3] {
        let Point { x, y } = self.center;
        [
            Point::new(x, y - self.spacing),
            self.center,
            Point::new(x, y + self.spacing),
        ]
    }

    /// Valve body split by a horizontal gap. The slab overshoots the body so
    /// it never grazes the circle.
    fn split_valve(&self, c: Point) -> Shape {
        let reach = self.radius + self.gap;
        let slab = rectangle_between(
            Point::new(c.x - reach, c.y - self.gap / 2.0),
            Point::new(c.x + reach, c.y + self.gap / 2.0),
        );
        subtract(&circle(c, self.radius), &slab)
    }

    fn flow(&self) -> Vec<Shape> {
        let [top, middle, bottom] = self.valve_centers();
        let half_cw = self.channel_width / 2.0;
        let half_gap = self.gap / 2.0;

        let mut children = vec![
            self.split_valve(middle),
            self.split_valve(bottom),
            self.split_valve(top),
        ];
        children.push(rectangle_between(
            Point::new(bottom.x - half_cw, bottom.y - half_gap),
            Point::new(middle.x + half_cw, middle.y + half_gap),
        ));
        children.push(rectangle_between(
            Point::new(top.x - half_cw, top.y + half_gap),
            Point::new(middle.x + half_cw, middle.y - half_gap),
        ));
        self.rotated(children)
    }

    fn valve_bodies(&self) -> Vec<Shape> {
        let [top, middle, bottom] = self.valve_centers();
        self.rotated(vec![
            circle(middle, self.radius),
            circle(top, self.radius),
            circle(bottom, self.radius),
        ])
    }

    fn rotated(&self, children: Vec<Shape>) -> Vec<Shape> {
        children
            .into_iter()
            .map(|c| c.rotate(self.rotation, self.center))
            .collect()
    }
}

impl Template for Pump3D {
    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn draw(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        let pump = PumpLayout::from_params(params)?;
        match layer {
            LogicalLayer::Flow => Ok(pump.flow()),
            LogicalLayer::Control | LogicalLayer::Inverse => Ok(pump.valve_bodies()),
            other => Err(unsupported(other)),
        }
    }

    fn draw_preview(&self, _layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        let pump = PumpLayout::from_params(params)?;
        let mut children = pump.valve_bodies();
        children.extend(pump.flow());
        Ok(children)
    }

    fn derive_ports(&self, params: &ParamMap) -> TemplateResult<Vec<ComponentPort>> {
        let radius = params.float("valveRadius")?;
        let spacing = params.float("spacing")?;
        Ok(vec![
            ComponentPort::new(0.0, -spacing - radius, "1", LogicalLayer::Flow),
            ComponentPort::new(0.0, spacing + radius, "2", LogicalLayer::Flow),
            ComponentPort::new(0.0, -spacing, "3", LogicalLayer::Control),
            ComponentPort::new(0.0, 0.0, "4", LogicalLayer::Control),
            ComponentPort::new(0.0, spacing, "5", LogicalLayer::Control),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn params() -> ParamMap {
        Pump3D::new()
            .schema()
            .instantiate(Point::origin())
            .with("rotation", 0.0)
    }

    #[test]
    fn test_flow_valves_are_split() {
        let pump = Pump3D::new();
        let flow = pump.geometry(LogicalLayer::Flow, &params()).unwrap();
        assert_eq!(flow.len(), 5);
        for valve in &flow.children[..3] {
            assert_eq!(valve.outlines.len(), 2);
            assert!(valve.area() < PI * 1200.0 * 1200.0);
        }
    }

    #[test]
    fn test_control_and_inverse_match() {
        let pump = Pump3D::new();
        let control = pump.geometry(LogicalLayer::Control, &params()).unwrap();
        let inverse = pump.geometry(LogicalLayer::Inverse, &params()).unwrap();
        assert_eq!(control.children, inverse.children);
        assert_eq!(control.len(), 3);
    }

    #[test]
    fn test_default_rotation_lays_pump_sideways() {
        let pump = Pump3D::new();
        let p = pump.schema().instantiate(Point::origin());
        let bb = pump.geometry(LogicalLayer::Control, &p).unwrap().bbox().unwrap();
        assert!((bb.width() - (2.0 * 5000.0 + 2.0 * 1200.0)).abs() < 1e-6);
        assert!((bb.height() - 2400.0).abs() < 1e-6);
    }

    #[test]
    fn test_pump_ports() {
        let ports = Pump3D::new().ports(&params()).unwrap();
        let ys: Vec<f64> = ports.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![-6200.0, 6200.0, -5000.0, 0.0, 5000.0]);
        assert_eq!(ports[0].layer, LogicalLayer::Flow);
        assert_eq!(ports[4].layer, LogicalLayer::Control);
    }

    #[test]
    fn test_preview_composites_layers() {
        let pump = Pump3D::new();
        let preview = pump.preview_geometry(LogicalLayer::Flow, &params()).unwrap();
        assert_eq!(preview.len(), 8);
        assert_eq!(preview.fill.alpha, 0.5);
    }
}
