//! Declarative parameter schemas.
//!
//! A schema lists the fields a template accepts, how they are renamed when
//! handed to the geometry builders, which interactive placement tool the
//! host should run, and which layers the template draws.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{TemplateError, TemplateResult};
use crate::geometry::Point;
use crate::layer::LogicalLayer;
use crate::params::{ParamMap, ParamValue, COLOR_PARAM};

/// Name of the unique field every schema carries.
pub const POSITION_FIELD: &str = "position";

// ── Fields ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Float,
    Integer,
    Point,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Float => "float",
            FieldKind::Integer => "integer",
            FieldKind::Point => "point",
        }
    }

    /// Whether `value` can stand in for this kind.
    pub fn accepts(&self, value: &ParamValue) -> bool {
        match self {
            FieldKind::Float => value.as_float().is_some(),
            FieldKind::Integer => value.as_integer().is_some(),
            FieldKind::Point => value.as_point().is_some(),
        }
    }
}

/// One declared input. Bounds are inclusive; points are never range-checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterField {
    pub name: String,
    pub kind: FieldKind,
    pub default: ParamValue,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ParameterField {
    pub fn float(name: &str, default: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Float,
            default: ParamValue::Float(default),
            unit: unit.to_string(),
            min: None,
            max: None,
        }
    }

    pub fn integer(name: &str, default: i64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Integer,
            default: ParamValue::Integer(default),
            unit: unit.to_string(),
            min: None,
            max: None,
        }
    }

    pub fn point(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Point,
            default: ParamValue::Point(Point::origin()),
            unit: String::new(),
            min: None,
            max: None,
        }
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn is_ranged(&self) -> bool {
        self.kind != FieldKind::Point && (self.min.is_some() || self.max.is_some())
    }
}

// ── Placement ───────────────────────────────────────────────────────

/// The interactive placement behaviour a host runs before committing a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlacementTool {
    /// One click places the feature on its base layer.
    #[serde(rename = "componentPositionTool")]
    ComponentPosition,
    /// One click places the feature across a stack of layers.
    #[serde(rename = "multilayerPositionTool")]
    MultilayerPosition,
}

impl PlacementTool {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementTool::ComponentPosition => "componentPositionTool",
            PlacementTool::MultilayerPosition => "multilayerPositionTool",
        }
    }
}

/// Which alias table [`ParameterSchema::resolve`] renames through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasSet {
    /// Committed geometry.
    Feature,
    /// Placement preview: target aliases plus the tool's outputs.
    Preview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub height_field: String,
    pub substrate_offset: String,
}

// ── Schema ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSchema {
    canonical_name: String,
    unique_fields: Vec<ParameterField>,
    heritable_fields: Vec<ParameterField>,
    feature_aliases: BTreeMap<String, String>,
    target_aliases: BTreeMap<String, String>,
    placement_tool: PlacementTool,
    tool_aliases: BTreeMap<String, String>,
    render_layers: Vec<LogicalLayer>,
    layers: BTreeMap<LogicalLayer, LayerSpec>,
}

impl ParameterSchema {
    pub fn builder(canonical_name: &str) -> SchemaBuilder {
        SchemaBuilder::new(canonical_name)
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn unique_fields(&self) -> &[ParameterField] {
        &self.unique_fields
    }

    pub fn heritable_fields(&self) -> &[ParameterField] {
        &self.heritable_fields
    }

    /// Unique fields first, then heritable ones, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &ParameterField> {
        self.unique_fields.iter().chain(self.heritable_fields.iter())
    }

    pub fn field(&self, name: &str) -> Option<&ParameterField> {
        self.fields().find(|f| f.name == name)
    }

    pub fn is_heritable(&self, name: &str) -> bool {
        self.heritable_fields.iter().any(|f| f.name == name)
    }

    pub fn feature_aliases(&self) -> &BTreeMap<String, String> {
        &self.feature_aliases
    }

    pub fn target_aliases(&self) -> &BTreeMap<String, String> {
        &self.target_aliases
    }

    pub fn tool_aliases(&self) -> &BTreeMap<String, String> {
        &self.tool_aliases
    }

    pub fn placement_tool(&self) -> PlacementTool {
        self.placement_tool
    }

    pub fn render_layers(&self) -> &[LogicalLayer] {
        &self.render_layers
    }

    pub fn supports_layer(&self, layer: LogicalLayer) -> bool {
        self.render_layers.contains(&layer)
    }

    /// The field supplying the extrusion height of `layer`.
    pub fn height_field(&self, layer: LogicalLayer) -> Option<&str> {
        self.layers.get(&layer).map(|s| s.height_field.as_str())
    }

    /// Signed offset of `layer` from the component's base substrate.
    pub fn substrate_offset(&self, layer: LogicalLayer) -> TemplateResult<i32> {
        let spec = self
            .layers
            .get(&layer)
            .ok_or_else(|| TemplateError::UnsupportedLayer(layer.to_string()))?;
        parse_offset(&spec.substrate_offset).ok_or_else(|| TemplateError::InvalidSchema {
            template: self.canonical_name.clone(),
            message: format!(
                "substrate offset '{}' of {} is not a signed integer",
                spec.substrate_offset, layer
            ),
        })
    }

    /// Defaults of every declared field.
    pub fn defaults(&self) -> ParamMap {
        self.fields()
            .map(|f| (f.name.clone(), f.default))
            .collect()
    }

    /// A complete parameter map for a new instance placed at `position`.
    pub fn instantiate(&self, position: Point) -> ParamMap {
        let mut params = self.defaults();
        params.insert(POSITION_FIELD, position);
        params
    }

    /// `child` with every heritable field the parent defines copied over.
    pub fn inherit(&self, child: &ParamMap, parent: &ParamMap) -> ParamMap {
        let mut merged = child.clone();
        for field in &self.heritable_fields {
            if let Some(value) = parent.get(&field.name) {
                merged.insert(field.name.clone(), *value);
            }
        }
        merged
    }

    /// Rename `params` into the names the geometry builders expect.
    ///
    /// Every aliased schema field must be present; the failure names the
    /// schema field, not the alias. The implicit `color` is forwarded as is.
    pub fn resolve(&self, params: &ParamMap, set: AliasSet) -> TemplateResult<ParamMap> {
        let mut resolved = ParamMap::new();
        let mut copy = |table: &BTreeMap<String, String>| -> TemplateResult<()> {
            for (alias, field) in table {
                let value = params
                    .get(field)
                    .ok_or_else(|| TemplateError::MissingParameter(field.clone()))?;
                resolved.insert(alias.clone(), *value);
            }
            Ok(())
        };

        match set {
            AliasSet::Feature => copy(&self.feature_aliases)?,
            AliasSet::Preview => {
                copy(&self.target_aliases)?;
                copy(&self.tool_aliases)?;
            }
        }

        if let Some(color) = params.get(COLOR_PARAM) {
            resolved.insert(COLOR_PARAM, *color);
        }
        log::debug!(
            "{}: resolved {} parameters ({:?})",
            self.canonical_name,
            resolved.len(),
            set
        );
        Ok(resolved)
    }

    /// Check the schema is internally consistent.
    pub fn validate(&self) -> TemplateResult<()> {
        let invalid = |message: String| TemplateError::InvalidSchema {
            template: self.canonical_name.clone(),
            message,
        };

        let mut names = BTreeSet::new();
        for field in self.fields() {
            if !names.insert(field.name.as_str()) {
                return Err(invalid(format!("field '{}' declared twice", field.name)));
            }
            if !field.kind.accepts(&field.default) {
                return Err(invalid(format!(
                    "default of '{}' is not a {}",
                    field.name,
                    field.kind.as_str()
                )));
            }
            if let (Some(min), Some(max)) = (field.min, field.max) {
                if min > max {
                    return Err(invalid(format!("bounds of '{}' are inverted", field.name)));
                }
            }
        }
        if !self.unique_fields.iter().any(|f| f.name == POSITION_FIELD) {
            return Err(invalid("'position' must be a unique field".into()));
        }

        let tables = [
            ("feature", &self.feature_aliases),
            ("target", &self.target_aliases),
            ("tool", &self.tool_aliases),
        ];
        for (table, aliases) in tables {
            for (alias, field) in aliases {
                if !names.contains(field.as_str()) {
                    return Err(invalid(format!(
                        "{table} alias '{alias}' refers to undeclared field '{field}'"
                    )));
                }
            }
        }
        for (alias, field) in &self.target_aliases {
            if self.feature_aliases.get(alias) != Some(field) {
                return Err(invalid(format!(
                    "target alias '{alias}' is not a feature alias"
                )));
            }
        }

        if self.render_layers.is_empty() {
            return Err(invalid("no render layers".into()));
        }
        for layer in &self.render_layers {
            let spec = self
                .layers
                .get(layer)
                .ok_or_else(|| invalid(format!("layer {layer} has no height field")))?;
            if !names.contains(spec.height_field.as_str()) {
                return Err(invalid(format!(
                    "height field '{}' of {layer} is undeclared",
                    spec.height_field
                )));
            }
            self.substrate_offset(*layer)?;
        }
        Ok(())
    }
}

fn parse_offset(expr: &str) -> Option<i32> {
    let expr = expr.trim();
    let digits = expr.strip_prefix('+').unwrap_or(expr);
    digits.parse().ok()
}

// ── Builder ─────────────────────────────────────────────────────────

/// Assembles a [`ParameterSchema`] once at template construction.
pub struct SchemaBuilder {
    schema: ParameterSchema,
}

impl SchemaBuilder {
    fn new(canonical_name: &str) -> Self {
        Self {
            schema: ParameterSchema {
                canonical_name: canonical_name.to_string(),
                unique_fields: Vec::new(),
                heritable_fields: Vec::new(),
                feature_aliases: BTreeMap::new(),
                target_aliases: BTreeMap::new(),
                placement_tool: PlacementTool::ComponentPosition,
                tool_aliases: BTreeMap::new(),
                render_layers: Vec::new(),
                layers: BTreeMap::new(),
            },
        }
    }

    pub fn unique(mut self, field: ParameterField) -> Self {
        self.schema.unique_fields.push(field);
        self
    }

    pub fn heritable(mut self, field: ParameterField) -> Self {
        self.schema.heritable_fields.push(field);
        self
    }

    /// Pass each named field to the geometry builders under its own name.
    pub fn feature_params(mut self, names: &[&str]) -> Self {
        for name in names {
            self.schema
                .feature_aliases
                .insert(name.to_string(), name.to_string());
        }
        self
    }

    pub fn feature_alias(mut self, alias: &str, field: &str) -> Self {
        self.schema
            .feature_aliases
            .insert(alias.to_string(), field.to_string());
        self
    }

    pub fn target_params(mut self, names: &[&str]) -> Self {
        for name in names {
            self.schema
                .target_aliases
                .insert(name.to_string(), name.to_string());
        }
        self
    }

    pub fn target_alias(mut self, alias: &str, field: &str) -> Self {
        self.schema
            .target_aliases
            .insert(alias.to_string(), field.to_string());
        self
    }

    /// Select the placement tool. Its cursor output feeds `position`.
    pub fn placement(mut self, tool: PlacementTool) -> Self {
        self.schema.placement_tool = tool;
        self.schema
            .tool_aliases
            .insert(POSITION_FIELD.to_string(), POSITION_FIELD.to_string());
        self
    }

    pub fn layer(mut self, layer: LogicalLayer, height_field: &str, substrate_offset: &str) -> Self {
        if !self.schema.render_layers.contains(&layer) {
            self.schema.render_layers.push(layer);
        }
        self.schema.layers.insert(
            layer,
            LayerSpec {
                height_field: height_field.to_string(),
                substrate_offset: substrate_offset.to_string(),
            },
        );
        self
    }

    pub fn build(self) -> ParameterSchema {
        self.schema
    }
}
