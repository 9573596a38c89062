use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// A fabrication plane a feature can draw into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalLayer {
    Flow,
    Control,
    Integration,
    Inverse,
}

impl LogicalLayer {
    pub const ALL: [LogicalLayer; 4] = [
        LogicalLayer::Flow,
        LogicalLayer::Control,
        LogicalLayer::Integration,
        LogicalLayer::Inverse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalLayer::Flow => "FLOW",
            LogicalLayer::Control => "CONTROL",
            LogicalLayer::Integration => "INTEGRATION",
            LogicalLayer::Inverse => "INVERSE",
        }
    }

    /// Canvas color used when a parameter map carries no explicit `color`.
    pub fn default_color(&self) -> FillColor {
        match self {
            LogicalLayer::Flow => FillColor::rgb(63, 81, 181),
            LogicalLayer::Control => FillColor::rgb(229, 57, 53),
            LogicalLayer::Integration => FillColor::rgb(67, 160, 71),
            LogicalLayer::Inverse => FillColor::rgb(120, 144, 156),
        }
    }
}

impl fmt::Display for LogicalLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalLayer {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        LogicalLayer::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == upper)
            .ok_or_else(|| TemplateError::UnsupportedLayer(s.to_string()))
    }
}

/// RGBA fill for a drawable shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f32,
}

impl Default for FillColor {
    fn default() -> Self {
        Self {
            r: 128,
            g: 128,
            b: 128,
            alpha: 1.0,
        }
    }
}

impl FillColor {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 1.0 }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.alpha,
        ]
    }
}
