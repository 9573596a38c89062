//! Three-layer binary multiplexer.
//!
//! `N` vertical branch channels hang off a horizontal bus. A selector tree
//! of depth `log2(N)` is realised by rows of valves: each depth contributes
//! a left-anchored row and a right-anchored row, and every row closes half
//! of the branches in each active group. Group size halves with depth.

use chipforge_core::boolean::{subtract, union};
use chipforge_core::error::{TemplateError, TemplateResult};
use chipforge_core::geometry::{circle, rectangle, rectangle_between, Point, Shape};
use chipforge_core::schema::{ParameterField, ParameterSchema, PlacementTool};
use chipforge_core::{ComponentPort, LogicalLayer, ParamMap};

use crate::template::{unsupported, Template};

/// Largest branch count the generator accepts.
pub const MAX_BRANCHES: usize = 1024;

const FEATURE_FIELDS: [&str; 12] = [
    "componentSpacing",
    "in",
    "out",
    "position",
    "rotation",
    "valveRadius",
    "gap",
    "width",
    "length",
    "valveSpacing",
    "channelWidth",
    "controlChannelWidth",
];

pub struct ThreeDMux {
    schema: ParameterSchema,
}

impl ThreeDMux {
    pub fn new() -> Self {
        let schema = ParameterSchema::builder("MUX3D")
            .unique(ParameterField::point("position"))
            .heritable(ParameterField::float("componentSpacing", 1000.0, "μm").bounds(0.0, 10000.0))
            .heritable(ParameterField::integer("in", 1, "").bounds(1.0, 128.0))
            .heritable(ParameterField::integer("out", 8, "").bounds(2.0, 128.0))
            .heritable(ParameterField::float("rotation", 0.0, "°").bounds(0.0, 360.0))
            .heritable(ParameterField::float("valveRadius", 1200.0, "μm").bounds(10.0, 2000.0))
            .heritable(ParameterField::float("height", 800.0, "μm").bounds(10.0, 1200.0))
            .heritable(ParameterField::float("gap", 600.0, "μm").bounds(5.0, 1000.0))
            .heritable(ParameterField::float("width", 100.0, "μm").bounds(100.0, 100.0))
            .heritable(ParameterField::float("length", 100.0, "μm").bounds(100.0, 100.0))
            .heritable(ParameterField::float("valveSpacing", 600.0, "μm").bounds(100.0, 1000.0))
            .heritable(ParameterField::float("channelWidth", 500.0, "μm").bounds(25.0, 25000.0))
            .heritable(ParameterField::float("controlChannelWidth", 600.0, "μm").bounds(10.0, 1000.0))
            .feature_params(&FEATURE_FIELDS)
            .feature_alias("radius1", "valveRadius")
            .feature_alias("radius2", "valveRadius")
            .target_params(&FEATURE_FIELDS)
            .target_alias("radius1", "valveRadius")
            .target_alias("radius2", "valveRadius")
            .placement(PlacementTool::MultilayerPosition)
            .layer(LogicalLayer::Flow, "height", "0")
            .layer(LogicalLayer::Control, "height", "+1")
            .layer(LogicalLayer::Inverse, "height", "0")
            .build();
        Self { schema }
    }
}

impl Default for ThreeDMux {
    fn default() -> Self {
        Self::new()
    }
}

// ── Layout ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailSide {
    Left,
    Right,
}

/// One row of valves and the control line feeding it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValveRow {
    pub side: RailSide,
    /// Offset of the row below the top of the branches.
    pub y: f64,
    /// Branch indices closed by this row, in placement order.
    pub branches: Vec<usize>,
    /// Branch index whose x the control line reaches from its rail.
    pub reach: usize,
}

/// Branch count and valve rows derived from `in` and `out`.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxLayout {
    pub branches: usize,
    pub valve_count: usize,
    /// Fan-in devices are drawn rotated by an extra half turn.
    pub mirrored: bool,
}

impl MuxLayout {
    pub fn from_params(params: &ParamMap) -> TemplateResult<Self> {
        let ins = params.integer("in")?;
        let outs = params.integer("out")?;
        let mirrored = ins >= outs;
        let n = ins.max(outs);
        if n < 2 || n as usize > MAX_BRANCHES {
            return Err(TemplateError::InvalidTopology(format!(
                "multiplexer needs between 2 and {MAX_BRANCHES} branches, got {n}"
            )));
        }
        let n = n as usize;
        if !n.is_power_of_two() {
            return Err(TemplateError::InvalidTopology(format!(
                "multiplexer branch count {n} is not a power of two"
            )));
        }
        Ok(Self {
            branches: n,
            valve_count: n.trailing_zeros() as usize,
            mirrored,
        })
    }

    /// Length of the horizontal bus.
    pub fn bus_length(&self) -> f64 {
        4000.0 * self.branches as f64
    }

    /// Length of each vertical branch.
    pub fn branch_length(&self) -> f64 {
        3000.0 * self.branches as f64
    }

    /// Distance of the control rails and outlet beyond the device body.
    pub fn rail_margin(&self) -> f64 {
        1000.0 * self.branches as f64
    }

    pub fn branch_x(&self, i: usize) -> f64 {
        i as f64 * self.bus_length() / (self.branches - 1) as f64
    }

    pub fn row_count(&self) -> usize {
        2 * self.valve_count
    }

    pub fn row_y(&self, row: usize) -> f64 {
        let v = self.branch_length();
        let vc = self.valve_count as f64;
        v / (2.0 * vc) + row as f64 * v / (2.0 * vc + 2.0)
    }

    pub fn rows(&self) -> Vec<ValveRow> {
        let n = self.branches;
        let mut rows = Vec::with_capacity(self.row_count());
        for depth in 0..self.valve_count {
            let group = n >> depth;
            let half = group / 2;

            let left: Vec<usize> = (0..n)
                .step_by(group)
                .flat_map(|start| (0..half).map(move |w| start + w))
                .collect();
            rows.push(ValveRow {
                side: RailSide::Left,
                y: self.row_y(2 * depth),
                branches: left,
                reach: n - n / (2 << depth) - 1,
            });

            let right: Vec<usize> = (0..n)
                .step_by(group)
                .flat_map(|start| (0..half).map(move |w| n - 1 - w - start))
                .collect();
            rows.push(ValveRow {
                side: RailSide::Right,
                y: self.row_y(2 * depth + 1),
                branches: right,
                reach: n / (2 << depth),
            });
            log::trace!("mux depth {depth}: group size {group}");
        }
        rows
    }

    /// x of the left (negative) or right control rail.
    pub fn rail_x(&self, side: RailSide) -> f64 {
        match side {
            RailSide::Left => -self.rail_margin(),
            RailSide::Right => self.bus_length() + self.rail_margin(),
        }
    }

    pub fn effective_rotation(&self, rotation: f64) -> f64 {
        if self.mirrored {
            rotation + 180.0
        } else {
            rotation
        }
    }
}

// ── Drawing ─────────────────────────────────────────────────────────

struct MuxDrawing {
    layout: MuxLayout,
    origin: Point,
    rotation: f64,
    radius: f64,
    gap: f64,
    channel_width: f64,
    control_width: f64,
}

impl MuxDrawing {
    fn from_params(params: &ParamMap) -> TemplateResult<Self> {
        let layout = MuxLayout::from_params(params)?;
        let rotation = layout.effective_rotation(params.float("rotation")?);
        Ok(Self {
            layout,
            origin: params.point("position")?,
            rotation,
            radius: params.float("valveRadius")?,
            gap: params.float("gap")?,
            channel_width: params.float("channelWidth")?,
            control_width: params.float("controlChannelWidth")?,
        })
    }

    fn at(&self, x: f64, y: f64) -> Point {
        Point::new(self.origin.x + x, self.origin.y + y)
    }

    /// Valve body with two channel stubs, split by the gap.
    fn flow_valve(&self, c: Point) -> Shape {
        let cw = self.channel_width;
        let body = circle(c, self.radius);
        let upper = rectangle(Point::new(c.x - cw / 2.0, c.y - self.radius), (cw, self.radius), 0.0);
        let lower = rectangle(Point::new(c.x - cw / 2.0, c.y), (cw, self.radius), 0.0);
        let reach = self.radius + cw;
        let slab = rectangle_between(
            Point::new(c.x - reach, c.y - self.gap / 2.0),
            Point::new(c.x + reach, c.y + self.gap / 2.0),
        );
        subtract(&union(&union(&body, &upper), &lower), &slab)
    }

    fn flow(&self) -> Vec<Shape> {
        let l = &self.layout;
        let cw = self.channel_width;
        let bus_y = l.branch_length();

        let mut children = vec![
            rectangle_between(
                self.at(0.0, bus_y - cw / 2.0),
                self.at(l.bus_length(), bus_y + cw / 2.0),
            ),
            rectangle_between(
                self.at(l.bus_length() / 2.0 - cw / 2.0, bus_y),
                self.at(l.bus_length() / 2.0 + cw / 2.0, bus_y + l.rail_margin()),
            ),
        ];

        let mut branches: Vec<Shape> = (0..l.branches)
            .map(|i| {
                let x = l.branch_x(i);
                rectangle_between(self.at(x - cw / 2.0, bus_y), self.at(x + cw / 2.0, 0.0))
            })
            .collect();

        for row in l.rows() {
            for &i in &row.branches {
                let c = self.at(l.branch_x(i), row.y);
                let cut = rectangle_between(
                    Point::new(c.x - cw, c.y - self.gap / 2.0),
                    Point::new(c.x + cw, c.y + self.gap / 2.0),
                );
                children.push(self.flow_valve(c));
                branches[i] = subtract(&branches[i], &cut);
            }
            log::trace!("mux row {:?} at {:.1}: {} valves", row.side, row.y, row.branches.len());
        }
        children.extend(branches);
        self.rotated(children)
    }

    fn valve_circles(&self) -> Vec<Shape> {
        let l = &self.layout;
        l.rows()
            .iter()
            .flat_map(|row| {
                row.branches
                    .iter()
                    .map(move |&i| circle(self.at(l.branch_x(i), row.y), self.radius))
            })
            .collect()
    }

    fn control(&self) -> Vec<Shape> {
        let l = &self.layout;
        let half = self.control_width / 2.0;
        let mut children: Vec<Shape> = l
            .rows()
            .iter()
            .map(|row| {
                let rail = l.rail_x(row.side);
                let valve = l.branch_x(row.reach);
                rectangle_between(self.at(rail, row.y - half), self.at(valve, row.y + half))
            })
            .collect();
        children.extend(self.valve_circles());
        self.rotated(children)
    }

    fn inverse(&self) -> Vec<Shape> {
        self.rotated(self.valve_circles())
    }

    fn rotated(&self, children: Vec<Shape>) -> Vec<Shape> {
        children
            .into_iter()
            .map(|c| c.rotate(self.rotation, self.origin))
            .collect()
    }
}

impl Template for ThreeDMux {
    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn draw(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        let mux = MuxDrawing::from_params(params)?;
        match layer {
            LogicalLayer::Flow => Ok(mux.flow()),
            LogicalLayer::Control => Ok(mux.control()),
            LogicalLayer::Inverse => Ok(mux.inverse()),
            other => Err(unsupported(other)),
        }
    }

    fn draw_preview(&self, _layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        let mux = MuxDrawing::from_params(params)?;
        let mut children = mux.control();
        children.extend(mux.flow());
        Ok(children)
    }

    /// Bus inlets, the combined outlet, then one control port per valve
    /// row alternating left and right rails.
    fn derive_ports(&self, params: &ParamMap) -> TemplateResult<Vec<ComponentPort>> {
        let l = MuxLayout::from_params(params)?;
        let n = l.branches;
        let mut ports = Vec::with_capacity(n + 1 + l.row_count());

        for i in 0..n {
            ports.push(ComponentPort::new(l.branch_x(i), 0.0, (i + 1).to_string(), LogicalLayer::Flow));
        }
        ports.push(ComponentPort::new(
            l.bus_length() / 2.0,
            l.branch_length() + l.rail_margin(),
            (n + 1).to_string(),
            LogicalLayer::Flow,
        ));
        for (k, row) in l.rows().iter().enumerate() {
            ports.push(ComponentPort::new(
                l.rail_x(row.side),
                row.y,
                (n + 2 + k).to_string(),
                LogicalLayer::Control,
            ));
        }

        if l.mirrored {
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
        ThreeDMux::new()
            .schema()
            .instantiate(Point::origin())
            .with("in", ins)
            .with("out", outs)
    }

    #[test]
    fn test_layout_rows_halve_groups() {
        let layout = MuxLayout::from_params(&params(1, 8)).unwrap();
        assert_eq!(layout.valve_count, 3);
        let rows = layout.rows();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].branches, vec![0, 1, 2, 3]);
        assert_eq!(rows[1].branches, vec![7, 6, 5, 4]);
        assert_eq!(rows[2].branches, vec![0, 1, 4, 5]);
        assert_eq!(rows[3].branches, vec![7, 6, 3, 2]);
        assert_eq!(rows[4].branches, vec![0, 2, 4, 6]);
        assert_eq!(rows[5].branches, vec![7, 5, 3, 1]);
        let reaches: Vec<usize> = rows.iter().map(|r| r.reach).collect();
        assert_eq!(reaches, vec![3, 4, 5, 2, 6, 1]);
    }

    #[test]
    fn test_every_branch_cut_once_per_depth() {
        let layout = MuxLayout::from_params(&params(1, 16)).unwrap();
        let rows = layout.rows();
        for depth in 0..layout.valve_count {
            let mut seen: Vec<usize> = rows[2 * depth]
                .branches
                .iter()
                .chain(rows[2 * depth + 1].branches.iter())
                .copied()
                .collect();
            seen.sort();
            assert_eq!(seen, (0..16).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_row_spacing() {
        let layout = MuxLayout::from_params(&params(1, 8)).unwrap();
        assert!((layout.row_y(0) - 4000.0).abs() < 1e-9);
        assert!((layout.row_y(1) - 4000.0 - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_power_of_two_is_invalid() {
        let mux = ThreeDMux::new();
        assert!(matches!(mux.ports(&params(1, 6)), Err(TemplateError::InvalidTopology(_))));
        assert!(matches!(
            mux.geometry(LogicalLayer::Flow, &params(1, 1)),
            Err(TemplateError::InvalidTopology(_))
        ));
    }

    #[test]
    fn test_flow_children_and_cuts() {
        let mux = ThreeDMux::new();
        let flow = mux.geometry(LogicalLayer::Flow, &params(1, 4)).unwrap();
        // bus, outlet, 2 rows per depth of 2 valves each, 4 branches.
        assert_eq!(flow.len(), 2 + 2 * 4 + 4);
        for valve in &flow.children[2..10] {
            assert_eq!(valve.outlines.len(), 2);
        }
        for branch in &flow.children[10..] {
            assert_eq!(branch.outlines.len(), 3);
        }
    }

    #[test]
    fn test_control_and_inverse_counts() {
        let mux = ThreeDMux::new();
        let p = params(1, 8);
        assert_eq!(mux.geometry(LogicalLayer::Control, &p).unwrap().len(), 6 + 24);
        assert_eq!(mux.geometry(LogicalLayer::Inverse, &p).unwrap().len(), 24);
    }

    #[test]
    fn test_control_ports_alternate_rails() {
        let ports = ThreeDMux::new().ports(&params(1, 8)).unwrap();
        assert_eq!(ports.len(), 15);
        assert_eq!(ports[8].label, "9");
        assert!((ports[8].y - (24000.0 + 8000.0)).abs() < 1e-9);
        for (k, port) in ports[9..].iter().enumerate() {
            assert_eq!(port.layer, LogicalLayer::Control);
            let expected = if k % 2 == 0 { -8000.0 } else { 40000.0 };
            assert!((port.x - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fan_in_mirrors_ports() {
        let mux = ThreeDMux::new();
        let out = mux.ports(&params(1, 4)).unwrap();
        let fan_in = mux.ports(&params(4, 1)).unwrap();
        for (a, b) in out.iter().zip(fan_in.iter()) {
            assert!((a.x + b.x).abs() < 1e-9);
            assert!((a.y + b.y).abs() < 1e-9);
        }
    }
}
