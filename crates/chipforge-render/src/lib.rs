//! # ChipForge Renderer
//!
//! Turns template geometry into JSON-serialisable render data: arcs are
//! flattened under the document's chord tolerance, contours become flat
//! vertex arrays, and ports are moved onto the canvas.

pub mod render_data;

pub use render_data::{RenderFrame, RenderLayer, RenderPolygon, RenderedFeature};

use chipforge_core::geometry::BBox;
use chipforge_core::{CompoundShape, LogicalLayer, TemplateResult};
use chipforge_io::{DocumentSettings, FeatureDocument, FeatureInstance, IoError, IoResult};
use chipforge_library::{Template, TemplateRegistry};

fn bounds_array(bbox: &BBox) -> [f64; 4] {
    [bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y]
}

/// Flatten every child of `compound` into polygons.
pub fn render_layer(compound: &CompoundShape, layer: LogicalLayer, tolerance: f64) -> RenderLayer {
    let mut polygons = Vec::new();
    for shape in &compound.children {
        let rings = shape
            .outlines
            .iter()
            .map(|c| (c, false))
            .chain(shape.holes.iter().map(|c| (c, true)));
        for (contour, hole) in rings {
            let vertices: Vec<f64> = contour
                .flatten(tolerance)
                .iter()
                .flat_map(|p| [p.x, p.y])
                .collect();
            if vertices.is_empty() {
                continue;
            }
            polygons.push(RenderPolygon {
                vertices,
                hole,
                closed: contour.closed,
            });
        }
    }
    RenderLayer {
        layer,
        color: compound.fill.to_f32_array(),
        polygons,
    }
}

/// Render `instance` through `template`: every render layer, or the
/// placement preview of each when `preview` is set.
pub fn render_feature(
    template: &dyn Template,
    instance: &FeatureInstance,
    settings: &DocumentSettings,
    preview: bool,
) -> TemplateResult<RenderedFeature> {
    let mut layers = Vec::new();
    let mut bounds = None;
    for layer in template.schema().render_layers() {
        let params = instance.effective_params(*layer, settings);
        let compound = if preview {
            template.preview_geometry(*layer, &params)?
        } else {
            template.geometry(*layer, &params)?
        };
        bounds = BBox::merge(bounds, compound.bbox());
        layers.push(render_layer(&compound, *layer, settings.arc_tolerance));
    }

    let placement = template.placement(&instance.params)?;
    let ports = template
        .ports(&instance.params)?
        .iter()
        .map(|p| p.placed(&placement))
        .collect();

    log::debug!(
        "rendered '{}' ({}): {} layers",
        instance.name,
        template.canonical_name(),
        layers.len()
    );
    Ok(RenderedFeature {
        name: instance.name.clone(),
        template: template.canonical_name().to_string(),
        preview,
        layers,
        ports,
        bounds: bounds.as_ref().map(bounds_array),
    })
}

/// Render every feature of `document`.
pub fn render_document(
    document: &FeatureDocument,
    registry: &TemplateRegistry,
    preview: bool,
) -> IoResult<RenderFrame> {
    let mut frame = RenderFrame::default();
    let mut bounds: Option<BBox> = None;
    for instance in &document.features {
        let template = instance.resolve(registry)?;
        let rendered = render_feature(template, instance, &document.settings, preview).map_err(
            |source| IoError::Feature {
                feature: instance.name.clone(),
                source,
            },
        )?;
        if let Some([x0, y0, x1, y1]) = rendered.bounds {
            let bbox = BBox::new(
                chipforge_core::Point::new(x0, y0),
                chipforge_core::Point::new(x1, y1),
            );
            bounds = BBox::merge(bounds, Some(bbox));
        }
        frame.features.push(rendered);
    }
    frame.bounds = bounds.as_ref().map(bounds_array);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipforge_core::{circle, Point};

    fn registry() -> TemplateRegistry {
        TemplateRegistry::standard().unwrap()
    }

    #[test]
    fn test_circle_flattens_within_tolerance() {
        let compound = CompoundShape::new(
            vec![circle(Point::new(0.0, 0.0), 1000.0)],
            LogicalLayer::Flow.default_color(),
        );
        let layer = render_layer(&compound, LogicalLayer::Flow, 1.0);
        assert_eq!(layer.polygons.len(), 1);
        let ring = &layer.polygons[0];
        assert!(ring.point_count() > 16);
        assert!(ring.closed && !ring.hole);
        for xy in ring.vertices.chunks(2) {
            let r = (xy[0] * xy[0] + xy[1] * xy[1]).sqrt();
            assert!((r - 1000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_color_is_normalised() {
        let compound = CompoundShape::new(
            vec![circle(Point::origin(), 10.0)],
            chipforge_core::FillColor::rgb(255, 0, 0).with_alpha(0.5),
        );
        let layer = render_layer(&compound, LogicalLayer::Control, 0.1);
        assert_eq!(layer.color, [1.0, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_layer_json_shape() {
        let compound = CompoundShape::new(
            vec![chipforge_core::rectangle(Point::origin(), (10.0, 20.0), 0.0)],
            LogicalLayer::Flow.default_color(),
        );
        let json = serde_json::to_value(render_layer(&compound, LogicalLayer::Flow, 1.0)).unwrap();
        assert_eq!(json["layer"], "FLOW");
        assert_eq!(json["polygons"][0]["vertices"].as_array().unwrap().len(), 8);
        assert_eq!(json["polygons"][0]["hole"], false);
    }

    #[test]
    fn test_feature_ports_are_placed() {
        let registry = registry();
        let chamber = registry.resolve("REACTION CHAMBER").unwrap();
        let mut instance = FeatureInstance::place(chamber, "c", Point::new(100.0, 200.0));
        instance.params.insert("rotation", 90.0);

        let rendered =
            render_feature(chamber, &instance, &DocumentSettings::default(), false).unwrap();
        assert_eq!(rendered.layers.len(), 1);
        // Local (0, -2500) turns to (2500, 0) before the offset.
        assert!((rendered.ports[0].x - 2600.0).abs() < 1e-9);
        assert!((rendered.ports[0].y - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_preview_is_translucent() {
        let registry = registry();
        let pump = registry.resolve("PUMP3D").unwrap();
        let instance = FeatureInstance::place(pump, "p", Point::origin());
        let rendered =
            render_feature(pump, &instance, &DocumentSettings::default(), true).unwrap();
        assert!(rendered.preview);
        assert!(rendered.layers.iter().all(|l| l.color[3] == 0.5));
    }

    #[test]
    fn test_document_bounds_cover_features() {
        let registry = registry();
        let chamber = registry.resolve("REACTION CHAMBER").unwrap();
        let mut doc = FeatureDocument::new("chip");
        doc.add(FeatureInstance::place(chamber, "a", Point::new(0.0, 0.0)));
        doc.add(FeatureInstance::place(chamber, "b", Point::new(20000.0, 0.0)));

        let frame = render_document(&doc, &registry, false).unwrap();
        assert_eq!(frame.features.len(), 2);
        let [x0, _, x1, _] = frame.bounds.unwrap();
        assert!(x0 <= 0.0 && x1 >= 20000.0);
    }
}
