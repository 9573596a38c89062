//! # ChipForge Check
//!
//! The validation collaborator for feature templates. Templates publish
//! bounds but never enforce them; this crate reports and clamps parameter
//! maps against their schema, and checks that placed features keep their
//! declared component spacing.

pub mod violation;

pub use violation::{ParamViolation, Severity, SpacingViolation, ViolationType};

use chipforge_core::geometry::BBox;
use chipforge_core::schema::{FieldKind, ParameterField, ParameterSchema};
use chipforge_core::spatial::{FootprintEntry, FootprintIndex};
use chipforge_core::{ParamMap, ParamValue};

// ── Parameter checks ────────────────────────────────────────────────

fn param_violation(
    violation_type: ViolationType,
    field: &ParameterField,
    message: String,
) -> ParamViolation {
    ParamViolation {
        violation_type,
        severity: Severity::Error,
        field: field.name.clone(),
        message,
    }
}

/// Every way `params` departs from `schema`'s declared fields.
pub fn validate(schema: &ParameterSchema, params: &ParamMap) -> Vec<ParamViolation> {
    let mut violations = Vec::new();

    for field in schema.fields() {
        let Some(value) = params.get(&field.name) else {
            violations.push(param_violation(
                ViolationType::MissingField,
                field,
                format!("'{}' is not set", field.name),
            ));
            continue;
        };
        if !field.kind.accepts(value) {
            violations.push(param_violation(
                ViolationType::WrongKind,
                field,
                format!(
                    "'{}' must be a {}, got a {}",
                    field.name,
                    field.kind.as_str(),
                    value.kind_name()
                ),
            ));
            continue;
        }
        if field.kind == FieldKind::Point {
            continue;
        }
        let Some(v) = value.as_float() else {
            continue;
        };
        if let Some(min) = field.min {
            if v < min {
                violations.push(param_violation(
                    ViolationType::BelowMinimum,
                    field,
                    format!("'{}' = {} is below the minimum {} {}", field.name, v, min, field.unit),
                ));
            }
        }
        if let Some(max) = field.max {
            if v > max {
                violations.push(param_violation(
                    ViolationType::AboveMaximum,
                    field,
                    format!("'{}' = {} is above the maximum {} {}", field.name, v, max, field.unit),
                ));
            }
        }
    }

    log::debug!(
        "{}: {} parameter violations",
        schema.canonical_name(),
        violations.len()
    );
    violations
}

/// `params` with missing or mistyped fields replaced by their defaults and
/// numbers pulled into bounds. Undeclared entries such as `color` are kept.
pub fn clamp(schema: &ParameterSchema, params: &ParamMap) -> ParamMap {
    let mut out = params.clone();

    for field in schema.fields() {
        let value = match params.get(&field.name) {
            Some(v) if field.kind.accepts(v) => *v,
            _ => {
                log::warn!("{}: '{}' reset to its default", schema.canonical_name(), field.name);
                out.insert(field.name.clone(), field.default);
                continue;
            }
        };
        if !field.is_ranged() {
            continue;
        }
        let Some(v) = value.as_float() else {
            continue;
        };
        let clamped = v.max(field.min.unwrap_or(f64::NEG_INFINITY)).min(field.max.unwrap_or(f64::INFINITY));
        if clamped != v {
            log::warn!(
                "{}: '{}' clamped from {} to {}",
                schema.canonical_name(),
                field.name,
                v,
                clamped
            );
            let replacement = match field.kind {
                FieldKind::Integer => ParamValue::Integer(clamped.round() as i64),
                _ => ParamValue::Float(clamped),
            };
            out.insert(field.name.clone(), replacement);
        }
    }
    out
}

// ── Spacing checks ──────────────────────────────────────────────────

/// A placed feature's footprint and the clearance it asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedFootprint {
    pub bbox: BBox,
    pub spacing: f64,
}

/// Pairs of features whose footprints, each grown by its own spacing,
/// overlap. Each pair is reported once.
pub fn check_spacing(footprints: &[PlacedFootprint]) -> Vec<SpacingViolation> {
    let grown: Vec<BBox> = footprints
        .iter()
        .map(|f| f.bbox.expand(f.spacing.max(0.0)))
        .collect();
    let index = FootprintIndex::build(
        grown
            .iter()
            .enumerate()
            .map(|(index, bbox)| FootprintEntry { index, bbox: *bbox })
            .collect(),
    );

    let mut violations = Vec::new();
    for (i, bbox) in grown.iter().enumerate() {
        let mut hits: Vec<usize> = index
            .query_bbox(bbox)
            .into_iter()
            .map(|e| e.index)
            .filter(|&j| j > i)
            .collect();
        hits.sort_unstable();

        for j in hits {
            let other = &grown[j];
            let overlap = [
                bbox.min.x.max(other.min.x),
                bbox.min.y.max(other.min.y),
                bbox.max.x.min(other.max.x),
                bbox.max.y.min(other.max.y),
            ];
            // Grown boxes that only touch keep exactly the required clearance.
            if overlap[0] >= overlap[2] || overlap[1] >= overlap[3] {
                continue;
            }
            violations.push(SpacingViolation {
                violation_type: ViolationType::Spacing,
                severity: Severity::Warning,
                features: (i, j),
                message: format!("features {i} and {j} are closer than their component spacing"),
                bbox: overlap,
            });
        }
    }

    if !violations.is_empty() {
        log::warn!("{} spacing violations", violations.len());
    }
    violations
}
