//! The capability every feature template implements.

use chipforge_core::error::{TemplateError, TemplateResult};
use chipforge_core::geometry::{BBox, Shape};
use chipforge_core::schema::{AliasSet, ParameterSchema, POSITION_FIELD};
use chipforge_core::{CompoundShape, ComponentPort, LogicalLayer, ParamMap, Placement};

/// Fill opacity of placement previews.
pub const PREVIEW_OPACITY: f32 = 0.5;

/// A parametric feature generator.
///
/// Implementors supply the schema plus the raw drawing and port routines,
/// which receive parameters already renamed through the schema's aliases.
/// The provided methods wrap them with layer checks, alias resolution and
/// fill handling.
pub trait Template: Send + Sync {
    fn schema(&self) -> &ParameterSchema;

    /// Children of `layer`'s compound shape, in drawing order.
    fn draw(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>>;

    /// Preview children. Multi-layer devices override this to composite
    /// their layers into one outline.
    fn draw_preview(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<Vec<Shape>> {
        self.draw(layer, params)
    }

    fn derive_ports(&self, _params: &ParamMap) -> TemplateResult<Vec<ComponentPort>> {
        Ok(Vec::new())
    }

    // ── Provided ────────────────────────────────────────────────────

    fn canonical_name(&self) -> &str {
        self.schema().canonical_name()
    }

    fn geometry(&self, layer: LogicalLayer, params: &ParamMap) -> TemplateResult<CompoundShape> {
        ensure_layer(self.schema(), layer)?;
        let resolved = self.schema().resolve(params, AliasSet::Feature)?;
        let children = self.draw(layer, &resolved)?;
        Ok(CompoundShape::new(children, fill_for(&resolved, layer)))
    }

    fn preview_geometry(
        &self,
        layer: LogicalLayer,
        params: &ParamMap,
    ) -> TemplateResult<CompoundShape> {
        ensure_layer(self.schema(), layer)?;
        let resolved = self.schema().resolve(params, AliasSet::Preview)?;
        let children = self.draw_preview(layer, &resolved)?;
        Ok(CompoundShape::new(children, fill_for(&resolved, layer)).with_opacity(PREVIEW_OPACITY))
    }

    /// Connection points in the untransformed local frame, in contract order.
    fn ports(&self, params: &ParamMap) -> TemplateResult<Vec<ComponentPort>> {
        let resolved = self.schema().resolve(params, AliasSet::Feature)?;
        self.derive_ports(&resolved)
    }

    /// The transform taking local ports onto the canvas: `position`, plus
    /// `rotation` when the template declares one.
    fn placement(&self, params: &ParamMap) -> TemplateResult<Placement> {
        let offset = params.point(POSITION_FIELD)?;
        let rotation = match self.schema().field("rotation") {
            Some(_) => params.float("rotation")?,
            None => 0.0,
        };
        Ok(Placement::new(offset, rotation))
    }

    /// [`Template::geometry`] for hosts that name layers with strings.
    fn geometry_named(&self, layer: &str, params: &ParamMap) -> TemplateResult<CompoundShape> {
        self.geometry(layer.parse()?, params)
    }

    /// Bounding box of every render layer's geometry.
    fn footprint(&self, params: &ParamMap) -> TemplateResult<Option<BBox>> {
        let mut bbox = None;
        for layer in self.schema().render_layers() {
            bbox = BBox::merge(bbox, self.geometry(*layer, params)?.bbox());
        }
        Ok(bbox)
    }
}

fn ensure_layer(schema: &ParameterSchema, layer: LogicalLayer) -> TemplateResult<()> {
    if schema.supports_layer(layer) {
        Ok(())
    } else {
        Err(TemplateError::UnsupportedLayer(layer.to_string()))
    }
}

fn fill_for(params: &ParamMap, layer: LogicalLayer) -> chipforge_core::FillColor {
    params.color().unwrap_or_else(|| layer.default_color())
}

/// Error for raw drawing routines asked for a layer they do not handle.
pub(crate) fn unsupported(layer: LogicalLayer) -> TemplateError {
    TemplateError::UnsupportedLayer(layer.to_string())
}
