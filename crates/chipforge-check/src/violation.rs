use serde::{Deserialize, Serialize};

/// Kind of rule a parameter map or placement broke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViolationType {
    MissingField,
    WrongKind,
    BelowMinimum,
    AboveMaximum,
    Spacing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A parameter that fails its schema declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamViolation {
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub field: String,
    pub message: String,
}

/// Two placed features closer than their component spacing allows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacingViolation {
    pub violation_type: ViolationType,
    pub severity: Severity,
    /// Indices of the two features, lower first.
    pub features: (usize, usize),
    pub message: String,
    /// Overlap of the grown footprints: [min_x, min_y, max_x, max_y]
    pub bbox: [f64; 4],
}
