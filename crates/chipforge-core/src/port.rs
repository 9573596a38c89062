use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::layer::LogicalLayer;

/// A named connection point in a component's untransformed local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPort {
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub layer: LogicalLayer,
}

impl ComponentPort {
    pub fn new(x: f64, y: f64, label: impl Into<String>, layer: LogicalLayer) -> Self {
        Self {
            x,
            y,
            label: label.into(),
            layer,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// The port moved into a placed frame.
    pub fn placed(&self, placement: &Placement) -> Self {
        let p = placement.apply(&self.position());
        Self {
            x: p.x,
            y: p.y,
            label: self.label.clone(),
            layer: self.layer,
        }
    }
}

/// Where a component sits on the canvas: rotate about the local origin, then translate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub offset: Point,
    /// Rotation in degrees.
    pub rotation: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            offset: Point::origin(),
            rotation: 0.0,
        }
    }
}

impl Placement {
    pub fn new(offset: Point, rotation: f64) -> Self {
        Self { offset, rotation }
    }

    pub fn apply(&self, point: &Point) -> Point {
        let (sin_r, cos_r) = self.rotation.to_radians().sin_cos();
        let rx = point.x * cos_r - point.y * sin_r;
        let ry = point.x * sin_r + point.y * cos_r;
        Point::new(rx + self.offset.x, ry + self.offset.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_translate_only() {
        let t = Placement::new(Point::new(10.0, 20.0), 0.0);
        let p = t.apply(&Point::new(5.0, 5.0));
        assert!((p.x - 15.0).abs() < 1e-9);
        assert!((p.y - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_placed_port_rotates_then_translates() {
        let port = ComponentPort::new(2500.0, 0.0, "2", LogicalLayer::Flow);
        let placed = port.placed(&Placement::new(Point::new(100.0, 0.0), 90.0));
        assert!((placed.x - 100.0).abs() < 1e-9);
        assert!((placed.y - 2500.0).abs() < 1e-9);
        assert_eq!(placed.label, "2");
    }

    #[test]
    fn test_port_json_shape() {
        let port = ComponentPort::new(0.0, -2500.0, "1", LogicalLayer::Control);
        let json = serde_json::to_value(&port).unwrap();
        assert_eq!(json["layer"], "CONTROL");
        assert_eq!(json["y"], -2500.0);
    }
}
