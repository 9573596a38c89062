use serde::{Deserialize, Serialize};

use crate::geometry::{BBox, Point, Shape};
use crate::layer::FillColor;

/// An ordered set of shapes filled as one drawable unit. Child order only
/// affects drawing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundShape {
    pub children: Vec<Shape>,
    pub fill: FillColor,
}

impl CompoundShape {
    pub fn new(children: Vec<Shape>, fill: FillColor) -> Self {
        let children = children.into_iter().filter(|s| !s.is_empty()).collect();
        Self { children, fill }
    }

    /// Same geometry with the fill opacity replaced.
    pub fn with_opacity(mut self, alpha: f32) -> Self {
        self.fill = self.fill.with_alpha(alpha);
        self
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.children
            .iter()
            .fold(None, |acc, s| BBox::merge(acc, s.bbox()))
    }

    pub fn area(&self) -> f64 {
        self.children.iter().map(Shape::area).sum()
    }

    pub fn rotate(&self, degrees: f64, pivot: Point) -> Self {
        Self {
            children: self.children.iter().map(|s| s.rotate(degrees, pivot)).collect(),
            fill: self.fill,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{circle, rectangle};

    #[test]
    fn test_compound_skips_empty_children() {
        let compound = CompoundShape::new(
            vec![
                rectangle(Point::new(0.0, 0.0), (2.0, 2.0), 0.0),
                circle(Point::new(0.0, 0.0), 0.0),
            ],
            FillColor::default(),
        );
        assert_eq!(compound.len(), 1);
    }

    #[test]
    fn test_compound_bbox_spans_children() {
        let compound = CompoundShape::new(
            vec![
                rectangle(Point::new(0.0, 0.0), (2.0, 2.0), 0.0),
                circle(Point::new(10.0, 10.0), 1.0),
            ],
            FillColor::default(),
        );
        let bb = compound.bbox().unwrap();
        assert!((bb.max.x - 11.0).abs() < 1e-9);
        assert!((bb.min.y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_opacity_override() {
        let compound = CompoundShape::new(vec![], FillColor::rgb(1, 2, 3)).with_opacity(0.5);
        assert_eq!(compound.fill.alpha, 0.5);
        assert_eq!(compound.fill.r, 1);
    }
}
