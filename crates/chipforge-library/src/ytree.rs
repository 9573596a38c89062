//! Binary Y-branching distribution tree.
//!
//! The trunk twig sits at `position`; every twig draws two rounded arms
//! splayed symmetrically about the vertical and, below the last level,
//! spawns two child twigs at the arm ends with half the spacing. The tree
//! always branches fully, so it ends in `2^levels` channel ends.

use chipforge_core::error::{TemplateError, TemplateResult};
use chipforge_core::geometry::{rectangle, Point, Shape};
use chipforge_core::schema::{ParameterField, ParameterSchema, PlacementTool};
use chipforge_core::{ComponentPort, LogicalLayer, ParamMap};

use crate::template::{unsupported, Template};

/// Deepest tree the generator will build.
pub const MAX_LEVELS: u32 = 12;

pub struct YTree {
    schema: ParameterSchema,
}

impl YTree {
    pub fn new() -> Self {
        let schema = ParameterSchema::builder("YTREE")
            .unique(ParameterField::point("position"))
            .heritable(ParameterField::float("componentSpacing", 1000.0, "μm").bounds(0.0, 10000.0))
            .heritable(ParameterField::float("flowChannelWidth", 800.0, "μm").bounds(10.0, 2000.0))
            .heritable(ParameterField::float("rotation", 0.0, "°").bounds(0.0, 360.0))
            .heritable(ParameterField::float("spacing", 4000.0, "μm").bounds(30.0, 12000.0))
            .heritable(ParameterField::integer("in", 1, "").bounds(1.0, 128.0))
            .heritable(ParameterField::integer("out", 8, "").bounds(2.0, 128.0))
            .heritable(ParameterField::float("width", 2460.0, "μm").bounds(60.0, 12000.0))
            .heritable(ParameterField::float("height", 250.0, "μm").bounds(10.0, 1200.0))
            .heritable(ParameterField::float("stageLength", 4000.0, "μm").bounds(100.0, 6000.0))
            .feature_params(&[
                "componentSpacing",
                "position",
                "flowChannelWidth",
                "rotation",
                "spacing",
                "width",
                "in",
                "out",
                "stageLength",
            ])
            .target_params(&[
                "componentSpacing",
                "flowChannelWidth",
                "rotation",
                "spacing",
                "in",
                "out",
                "stageLength",
            ])
            .placement(PlacementTool::ComponentPosition)
            .layer(LogicalLayer::Flow, "height", "0")
            .build();
        Self { schema }
    }
}

impl Default for YTree {
    fn default() -> Self {
        Self::new()
    }
}

// ── Layout ──────────────────────────────────────────────────────────

/// One Y junction, in the tree's local frame (trunk at the origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Twig {
    pub pivot: Point,
    /// Horizontal distance between the two arm ends.
    pub spacing: f64,
    /// 1 for the trunk.
    pub level: u32,
}

impl Twig {
    pub fn is_leaf(&self, levels: u32) -> bool {
        self.level >= levels
    }

    /// The two arm ends, left first.
    pub fn arm_ends(&self, stage_length: f64) -> [Point; 2] {
        let y = self.pivot.y + stage_length;
        [
            Point::new(self.pivot.x - self.spacing / 2.0, y),
            Point::new(self.pivot.x + self.spacing / 2.0, y),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeLayout {
    pub leafs: usize,
    pub levels: u32,
    /// Fan-in trees are drawn rotated by an extra half turn.
    pub mirrored: bool,
    pub spacing: f64,
    pub stage_length: f64,
}

impl TreeLayout {
    pub fn from_params(params: &ParamMap) -> TemplateResult<Self> {
        let ins = params.integer("in")?;
        let outs = params.integer("out")?;
        let mirrored = ins >= outs;
        let leafs = ins.max(outs);
        if leafs < 2 {
            return Err(TemplateError::InvalidTopology(format!(
                "a Y tree needs at least two leaves, got {leafs}"
            )));
        }
        let leafs = leafs as usize;
        let levels = usize::BITS - (leafs - 1).leading_zeros();
        if levels > MAX_LEVELS {
            return Err(TemplateError::InvalidTopology(format!(
                "{leafs} leaves need {levels} levels, more than {MAX_LEVELS}"
            )));
        }
        Ok(Self {
            leafs,
            levels,
            mirrored,
            spacing: params.float("spacing")?,
            stage_length: params.float("stageLength")?,
        })
    }

    /// Arm spread of the trunk twig.
    pub fn root_spacing(&self) -> f64 {
        self.spacing * (self.leafs as f64 / 2.0 + 1.0)
    }

    /// Distance between neighbouring leaf ports.
    pub fn leaf_pitch(&self) -> f64 {
        2.0 * self.root_spacing() * 0.5f64.powi(self.levels as i32)
    }

    /// Depth of the leaf row below the trunk.
    pub fn depth(&self) -> f64 {
        self.levels as f64 * self.stage_length
    }

    /// x of leaf port `i`; port 0 is at the +x end.
    pub fn port_x(&self, i: usize) -> f64 {
        (self.leafs as f64 - 1.0) * self.leaf_pitch() / 2.0 - i as f64 * self.leaf_pitch()
    }

    /// Every twig in drawing order: a twig, then its left subtree, then its right.
    pub fn twigs(&self) -> Vec<Twig> {
        let mut out = Vec::with_capacity((1usize << self.levels) - 1);
        let mut stack = vec![Twig {
            pivot: Point::origin(),
            spacing: self.root_spacing(),
            level: 1,
        }];
        while let Some(twig) = stack.pop() {
            log::trace!(
                "twig level {} at ({:.1}, {:.1})",
                twig.level,
                twig.pivot.x,
                twig.pivot.y
            );
            if !twig.is_leaf(self.levels) {
                let [left, right] = twig.arm_ends(self.stage_length);
                let child = |pivot| Twig {
                    pivot,
                    spacing: twig.spacing / 2.0,
                    level: twig.level + 1,
                };
                stack.push(child(right));
                stack.push(child(left));
            }
            out.push(twig);
        }
        out
    }

    /// Channel ends of the leaf twigs, ordered like the leaf ports (+x first).
    pub fn leaf_points(&self) -> Vec<Point> {
        let mut points: Vec<Point> = self
            .twigs()
            .iter()
            .filter(|t| t.is_leaf(self.levels))
            .flat_map(|t| t.arm_ends(self.stage_length))
            .collect();
        points.reverse();
        points
    }

    pub fn effective_rotation(&self, rotation: f64) -> f64 {
        if self.mirrored {
            rotation + 180.0
        } else {
            rotation
        }
    }
}

/// The two arms of a twig pivoting at `pivot`.
fn twig_arms(pivot: Point, spacing: f64, stage_length: f64, cw: f64) -> [Shape; 2] {
    let angle = (spacing / 2.0 / stage_length).atan();
    let h = spacing / 2.0 / angle.sin() + cw;
    let arm = rectangle(
        Point::new(pivot.x - cw / 2.0, pivot.y - cw / 2.0),
        (cw, h),
        cw / 2.0,
    );
    let degrees = angle.to_degrees();
    [arm.rotate(degrees, pivot), arm.rotate(-degrees, pivot)]
}

impl Template for YTree {
    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn draw(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        if layer != LogicalLayer::Flow {
            return Err(unsupported(layer));
        }
        let layout = TreeLayout::from_params(params)?;
        let position = params.point("position")?;
        let cw = params.float("flowChannelWidth")?;
        let rotation = layout.effective_rotation(params.float("rotation")?);

        let children = layout
            .twigs()
            .iter()
            .flat_map(|t| {
                let pivot = t.pivot.translate(position.x, position.y);
                twig_arms(pivot, t.spacing, layout.stage_length, cw)
            })
            .map(|arm| arm.rotate(rotation, position))
            .collect();
        Ok(children)
    }

    /// Trunk inlet, then one port per leaf from the +x end.
    ///
    /// Leaf ports follow the closed-form pitch. When `leafs` is not a power
    /// of two the tree still draws `2^levels` ends, and the ports do not sit
    /// on them.
    fn derive_ports(&self, params: &ParamMap) -> TemplateResult<Vec<ComponentPort>> {
        let layout = TreeLayout::from_params(params)?;
        let cw = params.float("flowChannelWidth")?;

        let mut ports = Vec::with_capacity(layout.leafs + 1);
        ports.push(ComponentPort::new(0.0, -cw / 2.0, "1", LogicalLayer::Flow));
        for i in 0..layout.leafs {
            ports.push(ComponentPort::new(
                layout.port_x(i),
                layout.depth(),
                (2 + i).to_string(),
                LogicalLayer::Flow,
            ));
        }
        if layout.mirrored {
            for port in &mut ports {
                port.x = -port.x;
                port.y = -port.y;
            }
        }
        Ok(ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(ins: i64, outs: i64) -> ParamMap {
        YTree::new()
            .schema()
            .instantiate(Point::origin())
            .with("in", ins)
            .with("out", outs)
    }

    #[test]
    fn test_levels_round_up() {
        for (leafs, levels) in [(2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4), (128, 7)] {
            let layout = TreeLayout::from_params(&params(1, leafs)).unwrap();
            assert_eq!(layout.levels, levels, "leafs = {leafs}");
        }
    }

    #[test]
    fn test_eight_leaf_tree() {
        let layout = TreeLayout::from_params(&params(1, 8)).unwrap();
        let twigs = layout.twigs();
        assert_eq!(twigs.len(), 7);
        assert_eq!(twigs.iter().filter(|t| t.is_leaf(3)).count(), 4);

        let leaves = layout.leaf_points();
        assert_eq!(leaves.len(), 8);
        for (i, leaf) in leaves.iter().enumerate() {
            assert!((leaf.y - 12000.0).abs() < 1e-9);
            assert!((leaf.x - layout.port_x(i)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_twigs_are_preorder() {
        let layout = TreeLayout::from_params(&params(1, 4)).unwrap();
        let levels: Vec<u32> = layout.twigs().iter().map(|t| t.level).collect();
        assert_eq!(levels, vec![1, 2, 2]);
        let twigs = layout.twigs();
        assert!(twigs[1].pivot.x < twigs[2].pivot.x);
    }

    #[test]
    fn test_ports_for_eight_leaves() {
        let ports = YTree::new().ports(&params(1, 8)).unwrap();
        assert_eq!(ports.len(), 9);
        assert!((ports[0].y + 400.0).abs() < 1e-9);
        for port in &ports[1..] {
            assert!((port.y - 12000.0).abs() < 1e-9);
        }
        assert!(ports[1].x > ports[8].x);
    }

    #[test]
    fn test_geometry_draws_two_arms_per_twig() {
        let tree = YTree::new();
        let flow = tree.geometry(LogicalLayer::Flow, &params(1, 8)).unwrap();
        assert_eq!(flow.len(), 14);
        let bb = flow.bbox().unwrap();
        let layout = TreeLayout::from_params(&params(1, 8)).unwrap();
        assert!(bb.max.y > layout.depth());
        assert!((bb.center().x).abs() < 1e-6);
    }

    #[test]
    fn test_non_power_of_two_keeps_full_tree() {
        let layout = TreeLayout::from_params(&params(1, 5)).unwrap();
        assert_eq!(layout.leaf_points().len(), 8);
        let ports = YTree::new().ports(&params(1, 5)).unwrap();
        assert_eq!(ports.len(), 6);
        let ends = layout.leaf_points();
        let on_end = |x: f64| ends.iter().any(|p| (p.x - x).abs() < 1e-6);
        assert!(ports[1..].iter().any(|p| !on_end(p.x)));
    }

    #[test]
    fn test_single_leaf_is_invalid() {
        assert!(matches!(
            YTree::new().ports(&params(1, 1)),
            Err(TemplateError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_fan_in_rotates_half_turn() {
        let tree = YTree::new();
        let bb = tree
            .geometry(LogicalLayer::Flow, &params(8, 1))
            .unwrap()
            .bbox()
            .unwrap();
        assert!(bb.min.y < -12000.0);
        let ports = tree.ports(&params(8, 1)).unwrap();
        assert!((ports[1].y + 12000.0).abs() < 1e-9);
    }
}
