use chipforge_core::error::{TemplateError, TemplateResult};
use chipforge_core::geometry::{rectangle_between, Point, Shape};
use chipforge_core::schema::{ParameterField, ParameterSchema, PlacementTool};
use chipforge_core::{ComponentPort, LogicalLayer, ParamMap};

use crate::template::{unsupported, Template};

/// Most distributor pairs the generator will build.
pub const MAX_DISTRIBUTORS: usize = 1024;

/// Electrode-actuated droplet sorter.
///
/// The flow layer fans pressure distributor pairs out along two outlets
/// splayed by `±angle/2`, ending in waste and keep channels. The
/// integration layer carries three electrodes below the junction.
pub struct Sorter {
    schema: ParameterSchema,
}

const FEATURE_FIELDS: [&str; 18] = [
    "componentSpacing",
    "rotation",
    "inletWidth",
    "inletLength",
    "electrodeDistance",
    "electrodeWidth",
    "electrodeLength",
    "outletWidth",
    "angle",
    "wasteWidth",
    "outputLength",
    "keepWidth",
    "pressureWidth",
    "pressureSpacing",
    "numberOfDistributors",
    "channelDepth",
    "electrodeDepth",
    "pressureDepth",
];

impl Sorter {
    pub fn new() -> Self {
        let mm = |name: &str, default: f64, min: f64, max: f64| {
            ParameterField::float(name, default, "μm").bounds(min, max)
        };
        let schema = ParameterSchema::builder("DROPLET SORTER")
            .unique(ParameterField::point("position"))
            .heritable(mm("componentSpacing", 1000.0, 0.0, 10000.0))
            .heritable(ParameterField::float("rotation", 0.0, "°").bounds(0.0, 360.0))
            .heritable(mm("height", 250.0, 10.0, 1200.0))
            .heritable(mm("inletWidth", 800.0, 500.0, 2000.0))
            .heritable(mm("inletLength", 4000.0, 2000.0, 6000.0))
            .heritable(mm("electrodeDistance", 1000.0, 500.0, 1500.0))
            .heritable(mm("electrodeWidth", 700.0, 500.0, 1500.0))
            .heritable(mm("electrodeLength", 5000.0, 2500.0, 7500.0))
            .heritable(mm("outletWidth", 800.0, 500.0, 2000.0))
            .heritable(ParameterField::float("angle", 45.0, "°").bounds(0.0, 180.0))
            .heritable(mm("wasteWidth", 1200.0, 500.0, 1500.0))
            .heritable(mm("outputLength", 4000.0, 2000.0, 6000.0))
            .heritable(mm("keepWidth", 2000.0, 2000.0, 3500.0))
            .heritable(mm("pressureWidth", 400.0, 200.0, 1000.0))
            .heritable(mm("pressureSpacing", 1500.0, 500.0, 2000.0))
            .heritable(ParameterField::integer("numberOfDistributors", 5, "").bounds(1.0, 10.0))
            .heritable(mm("channelDepth", 1000.0, 1000.0, 1000.0))
            .heritable(mm("electrodeDepth", 1000.0, 1000.0, 1000.0))
            .heritable(mm("pressureDepth", 1000.0, 1000.0, 1000.0))
            .feature_params(&FEATURE_FIELDS)
            .feature_params(&["position"])
            .target_params(&FEATURE_FIELDS)
            .placement(PlacementTool::MultilayerPosition)
            .layer(LogicalLayer::Flow, "height", "0")
            .layer(LogicalLayer::Integration, "electrodeDepth", "0")
            .build();
        Self { schema }
    }
}

impl Default for Sorter {
    fn default() -> Self {
        Self::new()
    }
}

/// Fan geometry shared by the flow drawing and the port derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SorterLayout {
    pub distributors: usize,
    pub pressure_width: f64,
    pub pressure_spacing: f64,
    /// Half of the fan angle, in radians.
    pub half_angle: f64,
}

impl SorterLayout {
    pub fn from_params(params: &ParamMap) -> TemplateResult<Self> {
        let n = params.integer("numberOfDistributors")?;
        if n < 1 || n as u64 > MAX_DISTRIBUTORS as u64 {
            return Err(TemplateError::InvalidTopology(format!(
                "sorter needs between 1 and {MAX_DISTRIBUTORS} distributors, got {n}"
            )));
        }
        let angle = params.float("angle")?;
        let half_angle = (angle / 2.0).to_radians();
        if half_angle.cos().abs() < 1e-9 {
            return Err(TemplateError::InvalidTopology(format!(
                "outlets at {angle}° never reach the waste and keep channels"
            )));
        }
        Ok(Self {
            distributors: n as usize,
            pressure_width: params.float("pressureWidth")?,
            pressure_spacing: params.float("pressureSpacing")?,
            half_angle,
        })
    }

    fn pitch(&self) -> f64 {
        self.pressure_spacing + self.pressure_width
    }

    /// Horizontal reach of the fan: `(n + 0.5)·(spacing + width)`.
    pub fn fan_reach(&self) -> f64 {
        (self.distributors as f64 + 0.5) * self.pitch()
    }

    /// Length of each splayed outlet channel.
    pub fn outlet_length(&self) -> f64 {
        self.fan_reach() / self.half_angle.cos()
    }

    /// x where the waste and keep channels begin.
    pub fn outlet_x(&self) -> f64 {
        self.outlet_length() * self.half_angle.cos()
    }

    /// Distance of the waste and keep centre lines from the axis.
    pub fn outlet_offset(&self) -> f64 {
        (self.fan_reach() - self.pressure_width / 2.0) * self.half_angle.tan()
    }

    /// `(left x, right x, height)` of distributor `i`, relative to the junction.
    pub fn distributor(&self, i: usize) -> (f64, f64, f64) {
        let right = (i as f64 + 1.5) * self.pitch();
        let left = right - self.pressure_width;
        let height = (right - self.pressure_width / 2.0) * self.half_angle.tan();
        (left, right, height)
    }
}

fn flow(params: &ParamMap) -> TemplateResult<Vec<Shape>> {
    let layout = SorterLayout::from_params(params)?;
    let position = params.point("position")?;
    let rotation = params.float("rotation")?;
    let inlet_width = params.float("inletWidth")?;
    let inlet_length = params.float("inletLength")?;
    let outlet_width = params.float("outletWidth")?;
    let waste_width = params.float("wasteWidth")?;
    let keep_width = params.float("keepWidth")?;
    let output_length = params.float("outputLength")?;
    let Point { x, y } = position;

    let mut children = Vec::with_capacity(2 * layout.distributors + 5);
    for i in 0..layout.distributors {
        let (left, right, height) = layout.distributor(i);
        children.push(rectangle_between(
            Point::new(x + left, y - height),
            Point::new(x + right, y),
        ));
        children.push(rectangle_between(
            Point::new(x + left, y + height),
            Point::new(x + right, y),
        ));
    }

    let half_angle = layout.half_angle.to_degrees();
    let outlet = rectangle_between(
        Point::new(x, y - outlet_width / 2.0),
        Point::new(x + layout.outlet_length(), y + outlet_width / 2.0),
    );
    children.push(outlet.rotate(-half_angle, position));
    children.push(outlet.rotate(half_angle, position));

    children.push(rectangle_between(
        Point::new(x - inlet_length, y - inlet_width / 2.0),
        Point::new(x, y + inlet_width / 2.0),
    ));

    let start = x + layout.outlet_x();
    let offset = layout.outlet_offset();
    for (sign, width) in [(-1.0, waste_width), (1.0, keep_width)] {
        let mid = y + sign * offset;
        children.push(rectangle_between(
            Point::new(start, mid - width / 2.0),
            Point::new(start + output_length, mid + width / 2.0),
        ));
    }

    Ok(children
        .into_iter()
        .map(|c| c.rotate(rotation, position))
        .collect())
}

fn electrodes(params: &ParamMap) -> TemplateResult<Vec<Shape>> {
    let position = params.point("position")?;
    let rotation = params.float("rotation")?;
    let distance = params.float("electrodeDistance")?;
    let ew = params.float("electrodeWidth")?;
    let el = params.float("electrodeLength")?;
    let angle = params.float("angle")?;
    let Point { x, y } = position;

    let drop = 2.0 * ew * (angle / 2.0).to_radians().tan();
    let children = [(0.0, 0.0), (-2.0 * ew, 0.0), (2.0 * ew, drop)]
        .into_iter()
        .map(|(dx, dy)| {
            rectangle_between(
                Point::new(x + dx - ew / 2.0, y + distance + dy),
                Point::new(x + dx + ew / 2.0, y + distance + dy + el),
            )
            .rotate(rotation, position)
        })
        .collect();
    Ok(children)
}

impl Template for Sorter {
    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn draw(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        match layer {
            LogicalLayer::Flow => flow(params),
            LogicalLayer::Integration => electrodes(params),
            other => Err(unsupported(other)),
        }
    }

    fn draw_preview(&self, _layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        let mut children = electrodes(params)?;
        children.extend(flow(params)?);
        Ok(children)
    }

    fn derive_ports(&self, params: &ParamMap) -> TemplateResult<Vec<ComponentPort>> {
        let layout = SorterLayout::from_params(params)?;
        let inlet_length = params.float("inletLength")?;
        let output_length = params.float("outputLength")?;
        let end = layout.outlet_x() + output_length;
        let offset = layout.outlet_offset();
        Ok(vec![
            ComponentPort::new(-inlet_length, 0.0, "1", LogicalLayer::Flow),
            ComponentPort::new(end, -offset, "2", LogicalLayer::Flow),
            ComponentPort::new(end, offset, "3", LogicalLayer::Flow),
        ])
    }
}
