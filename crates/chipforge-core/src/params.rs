//! Parameter values and the name-keyed maps templates consume.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{TemplateError, TemplateResult};
use crate::geometry::Point;
use crate::layer::FillColor;

/// Name of the implicit fill color every render call may carry.
pub const COLOR_PARAM: &str = "color";

/// A single parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Point(Point),
    Color(FillColor),
}

impl ParamValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ParamValue::Integer(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::Point(_) => "point",
            ParamValue::Color(_) => "color",
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            ParamValue::Integer(i) => Some(i as f64),
            ParamValue::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Integral floats are accepted, since hosts often store counts as numbers.
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            ParamValue::Integer(i) => Some(i),
            ParamValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<Point> {
        match *self {
            ParamValue::Point(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<FillColor> {
        match *self {
            ParamValue::Color(c) => Some(c),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Integer(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Integer(v as i64)
    }
}

impl From<Point> for ParamValue {
    fn from(v: Point) -> Self {
        ParamValue::Point(v)
    }
}

impl From<FillColor> for ParamValue {
    fn from(v: FillColor) -> Self {
        ParamValue::Color(v)
    }
}

/// Parameters keyed by name. Ordered so serialised maps are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamMap {
    values: BTreeMap<String, ParamValue>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder form of [`ParamMap::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }

    fn require(&self, name: &str) -> TemplateResult<&ParamValue> {
        self.values
            .get(name)
            .ok_or_else(|| TemplateError::MissingParameter(name.to_string()))
    }

    pub fn float(&self, name: &str) -> TemplateResult<f64> {
        self.require(name)?
            .as_float()
            .ok_or_else(|| TemplateError::ParameterType {
                name: name.to_string(),
                expected: "number",
            })
    }

    pub fn integer(&self, name: &str) -> TemplateResult<i64> {
        self.require(name)?
            .as_integer()
            .ok_or_else(|| TemplateError::ParameterType {
                name: name.to_string(),
                expected: "integer",
            })
    }

    pub fn point(&self, name: &str) -> TemplateResult<Point> {
        self.require(name)?
            .as_point()
            .ok_or_else(|| TemplateError::ParameterType {
                name: name.to_string(),
                expected: "point",
            })
    }

    /// The implicit fill color, if the caller supplied one.
    pub fn color(&self) -> Option<FillColor> {
        self.values.get(COLOR_PARAM).and_then(ParamValue::as_color)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParamMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_values() {
        let json = r#"{
            "count": 3,
            "width": 800.5,
            "position": {"x": 10, "y": -2.5},
            "color": {"r": 1, "g": 2, "b": 3, "alpha": 0.5}
        }"#;
        let map: ParamMap = serde_json::from_str(json).unwrap();
        assert_eq!(map.get("count"), Some(&ParamValue::Integer(3)));
        assert_eq!(map.get("width"), Some(&ParamValue::Float(800.5)));
        assert_eq!(map.point("position").unwrap(), Point::new(10.0, -2.5));
        assert_eq!(map.color().unwrap().alpha, 0.5);
    }

    #[test]
    fn test_numeric_coercions() {
        let map = ParamMap::new().with("a", 4).with("b", 4.0).with("c", 4.5);
        assert_eq!(map.float("a").unwrap(), 4.0);
        assert_eq!(map.integer("b").unwrap(), 4);
        assert!(matches!(
            map.integer("c"),
            Err(TemplateError::ParameterType { expected: "integer", .. })
        ));
    }

    #[test]
    fn test_missing_and_wrong_kind() {
        let map = ParamMap::new().with("position", Point::new(0.0, 0.0));
        assert_eq!(
            map.float("width"),
            Err(TemplateError::MissingParameter("width".into()))
        );
        assert!(matches!(
            map.float("position"),
            Err(TemplateError::ParameterType { .. })
        ));
        assert!(map.color().is_none());
    }

    #[test]
    fn test_map_serializes_sorted() {
        let map = ParamMap::new().with("z", 1).with("a", 2);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"a":2,"z":1}"#);
    }
}
