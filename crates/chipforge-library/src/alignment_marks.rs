use chipforge_core::error::TemplateResult;
use chipforge_core::geometry::{rectangle_between, Point, Shape};
use chipforge_core::schema::{ParameterField, ParameterSchema, PlacementTool};
use chipforge_core::{LogicalLayer, ParamMap};

use crate::template::{unsupported, Template};

/// A four-quadrant cross target split across the flow and control layers.
///
/// FLOW carries the top-left and bottom-right quadrants, CONTROL the other
/// two, so the marks only line up when both layers are registered.
pub struct AlignmentMarks {
    schema: ParameterSchema,
}

impl AlignmentMarks {
    pub fn new() -> Self {
        let schema = ParameterSchema::builder("ALIGNMENT MARKS")
            .unique(ParameterField::point("position"))
            .heritable(ParameterField::float("componentSpacing", 1000.0, "μm").bounds(0.0, 10000.0))
            .heritable(ParameterField::float("width", 4000.0, "μm").bounds(10.0, 200000.0))
            .heritable(ParameterField::float("length", 4000.0, "μm").bounds(10.0, 200000.0))
            .heritable(ParameterField::float("height", 250.0, "μm").bounds(10.0, 1200.0))
            .feature_params(&["position", "width", "length"])
            .target_params(&["width", "length"])
            .placement(PlacementTool::MultilayerPosition)
            .layer(LogicalLayer::Flow, "height", "0")
            .layer(LogicalLayer::Control, "height", "+1")
            .build();
        Self { schema }
    }
}

impl Default for AlignmentMarks {
    fn default() -> Self {
        Self::new()
    }
}

struct Quadrants {
    center: Point,
    w: f64,
    l: f64,
}

impl Quadrants {
    fn from_params(params: &ParamMap) -> TemplateResult<Self> {
        Ok(Self {
            center: params.point("position")?,
            w: params.float("width")?,
            l: params.float("length")?,
        })
    }

    fn flow(&self) -> Vec<Shape> {
        let Point { x, y } = self.center;
        vec![
            rectangle_between(Point::new(x - self.w, y - self.l), self.center),
            rectangle_between(self.center, Point::new(x + self.w, y + self.l)),
        ]
    }

    fn control(&self) -> Vec<Shape> {
        let Point { x, y } = self.center;
        vec![
            rectangle_between(Point::new(x, y - self.l), Point::new(x + self.w, y)),
            rectangle_between(Point::new(x - self.w, y), Point::new(x, y + self.l)),
        ]
    }
}

impl Template for AlignmentMarks {
    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn draw(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        let quadrants = Quadrants::from_params(params)?;
        match layer {
            LogicalLayer::Flow => Ok(quadrants.flow()),
            LogicalLayer::Control => Ok(quadrants.control()),
            other => Err(unsupported(other)),
        }
    }

    fn draw_preview(&self, _layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        let quadrants = Quadrants::from_params(params)?;
        let mut children = quadrants.flow();
        children.extend(quadrants.control());
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_cover_opposite_quadrants() {
        let marks = AlignmentMarks::new();
        let params = marks.schema().instantiate(Point::new(0.0, 0.0));
        let flow = marks.geometry(LogicalLayer::Flow, &params).unwrap();
        let control = marks.geometry(LogicalLayer::Control, &params).unwrap();
        assert_eq!(flow.len(), 2);
        assert_eq!(control.len(), 2);
        assert!((flow.area() - 2.0 * 4000.0 * 4000.0).abs() < 1e-3);

        let top_left = flow.children[0].bbox().unwrap();
        assert!((top_left.min.x + 4000.0).abs() < 1e-9);
        assert!(top_left.max.y.abs() < 1e-9);
        let top_right = control.children[0].bbox().unwrap();
        assert!((top_right.max.x - 4000.0).abs() < 1e-9);
        assert!((top_right.min.y + 4000.0).abs() < 1e-9);
    }

    #[test]
    fn test_preview_draws_full_cross() {
        let marks = AlignmentMarks::new();
        let params = marks.schema().instantiate(Point::new(10.0, 10.0));
        let preview = marks.preview_geometry(LogicalLayer::Control, &params).unwrap();
        assert_eq!(preview.len(), 4);
        assert_eq!(preview.fill.alpha, 0.5);
        let bb = preview.bbox().unwrap();
        assert!((bb.width() - 8000.0).abs() < 1e-9);
        assert!((bb.height() - 8000.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_ports() {
        let marks = AlignmentMarks::new();
        let params = marks.schema().instantiate(Point::origin());
        assert!(marks.ports(&params).unwrap().is_empty());
    }
}
