use chipforge_core::error::{TemplateError, TemplateResult};
use chipforge_core::geometry::{rectangle, Point, Shape};
use chipforge_core::schema::{ParameterField, ParameterSchema, PlacementTool};
use chipforge_core::{ComponentPort, LogicalLayer, ParamMap};

use crate::template::{unsupported, Template};

/// Longest serpentine the generator will build.
pub const MAX_BENDS: usize = 1024;

/// A serpentine merging channel.
///
/// Each bend is a vertical connector, a horizontal run and a second
/// connector; bends repeat downwards at a fixed pitch and the last run is
/// cut to half length so the serpentine ends on the centre line.
pub struct DropletMerger {
    schema: ParameterSchema,
}

impl DropletMerger {
    pub fn new() -> Self {
        let schema = ParameterSchema::builder("DROPLET MERGER")
            .unique(ParameterField::point("position"))
            .heritable(ParameterField::float("componentSpacing", 1000.0, "μm").bounds(0.0, 10000.0))
            .heritable(ParameterField::float("channelWidth", 800.0, "μm").bounds(1.0, 10000.0))
            .heritable(ParameterField::float("bendSpacing", 1230.0, "μm").bounds(1.0, 10000.0))
            .heritable(ParameterField::integer("numberOfBends", 1, "").bounds(1.0, 20.0))
            .heritable(ParameterField::float("bendLength", 2460.0, "μm").bounds(10.0, 50000.0))
            .heritable(ParameterField::float("rotation", 0.0, "°").bounds(0.0, 360.0))
            .heritable(ParameterField::float("height", 250.0, "μm").bounds(10.0, 10000.0))
            .feature_params(&[
                "componentSpacing",
                "position",
                "channelWidth",
                "bendSpacing",
                "numberOfBends",
                "bendLength",
                "rotation",
                "height",
            ])
            .target_params(&[
                "componentSpacing",
                "channelWidth",
                "bendSpacing",
                "numberOfBends",
                "bendLength",
                "rotation",
            ])
            .placement(PlacementTool::ComponentPosition)
            .layer(LogicalLayer::Flow, "height", "0")
            .build();
        Self { schema }
    }
}

impl Default for DropletMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn bends(params: &ParamMap) -> TemplateResult<i64> {
    let n = params.integer("numberOfBends")?;
    if n < 1 || n as u64 > MAX_BENDS as u64 {
        return Err(TemplateError::InvalidTopology(format!(
            "a serpentine needs between 1 and {MAX_BENDS} bends, got {n}"
        )));
    }
    Ok(n)
}

impl Template for DropletMerger {
    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn draw(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        if layer != LogicalLayer::Flow {
            return Err(unsupported(layer));
        }
        let position = params.point("position")?;
        let cw = params.float("channelWidth")?;
        let bend_length = params.float("bendLength")?;
        let bend_spacing = params.float("bendSpacing")?;
        let rotation = params.float("rotation")?;
        let n = bends(params)?;
        let Point { x, y } = position;

        let seg_half = bend_length / 2.0 + cw;
        let seg_length = bend_length + 2.0 * cw;
        let seg_bend = bend_spacing + 2.0 * cw;
        let v_repeat = 2.0 * bend_spacing + 2.0 * cw;
        let v_offset = bend_spacing + cw;
        let h_offset = bend_length / 2.0 + cw / 2.0;

        let mut children = vec![rectangle(Point::new(x, y), (seg_half + cw / 2.0, cw), 0.0)];
        for i in 0..n {
            let top = y + v_repeat * i as f64;
            let bottom = y + v_repeat * (i + 1) as f64;
            children.push(rectangle(Point::new(x, top), (cw, seg_bend), 0.0));
            children.push(rectangle(Point::new(x, top + v_offset), (seg_length, cw), 0.0));
            children.push(rectangle(
                Point::new(x + cw + bend_length, top + v_offset),
                (cw, seg_bend),
                0.0,
            ));
            if i == n - 1 {
                children.push(rectangle(Point::new(x + h_offset, bottom), (seg_half, cw), 0.0));
            } else {
                children.push(rectangle(Point::new(x, bottom), (seg_length, cw), 0.0));
            }
        }

        Ok(children
            .into_iter()
            .map(|c| c.rotate(rotation, position))
            .collect())
    }

    fn derive_ports(&self, params: &ParamMap) -> TemplateResult<Vec<ComponentPort>> {
        let cw = params.float("channelWidth")?;
        let bend_length = params.float("bendLength")?;
        let bend_spacing = params.float("bendSpacing")?;
        let n = bends(params)? as f64;
        let x = bend_length / 2.0 + cw;
        Ok(vec![
            ComponentPort::new(x, 0.0, "1", LogicalLayer::Flow),
            ComponentPort::new(
                x,
                (2.0 * n + 1.0) * cw + 2.0 * n * bend_spacing,
                "2",
                LogicalLayer::Flow,
            ),
        ])
    }
}
