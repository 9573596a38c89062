//! JSON feature documents: named, placed template instances.

use std::fs;
use std::path::Path;

use chipforge_core::params::COLOR_PARAM;
use chipforge_core::{LogicalLayer, ParamMap, Point};
use chipforge_library::{Template, TemplateRegistry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IoError, IoResult};
use crate::settings::DocumentSettings;

/// Format version written by this crate.
pub const DOCUMENT_VERSION: &str = "1";

/// One placed feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInstance {
    pub id: Uuid,
    pub name: String,
    /// Canonical template name, e.g. "YTREE".
    pub template: String,
    pub params: ParamMap,
}

impl FeatureInstance {
    /// A new instance of `template` at `position` with default parameters.
    pub fn place(template: &dyn Template, name: &str, position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            template: template.canonical_name().to_string(),
            params: template.schema().instantiate(position),
        }
    }

    /// The parameters to draw `layer` with, colored from `settings` when
    /// the instance carries no color of its own.
    pub fn effective_params(&self, layer: LogicalLayer, settings: &DocumentSettings) -> ParamMap {
        if self.params.contains(COLOR_PARAM) {
            return self.params.clone();
        }
        self.params
            .clone()
            .with(COLOR_PARAM, settings.layer_color(layer))
    }

    /// Look up this instance's template.
    pub fn resolve<'r>(&self, registry: &'r TemplateRegistry) -> IoResult<&'r dyn Template> {
        registry.resolve(&self.template).map_err(|source| {
            log::warn!("feature '{}' uses unknown template '{}'", self.name, self.template);
            IoError::Feature {
                feature: self.name.clone(),
                source,
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDocument {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub settings: DocumentSettings,
    #[serde(default)]
    pub features: Vec<FeatureInstance>,
}

impl FeatureDocument {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: DOCUMENT_VERSION.to_string(),
            settings: DocumentSettings::default(),
            features: Vec::new(),
        }
    }

    pub fn add(&mut self, feature: FeatureInstance) -> Uuid {
        let id = feature.id;
        self.features.push(feature);
        id
    }

    pub fn feature(&self, id: Uuid) -> Option<&FeatureInstance> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn to_json(&self) -> IoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> IoResult<Self> {
        let document: Self = serde_json::from_str(json)?;
        if document.version != DOCUMENT_VERSION {
            return Err(IoError::UnsupportedVersion(document.version));
        }
        Ok(document)
    }

    pub fn load(path: impl AsRef<Path>) -> IoResult<Self> {
        let path = path.as_ref();
        let document = Self::from_json(&fs::read_to_string(path)?)?;
        log::info!(
            "loaded '{}' ({} features) from {}",
            document.name,
            document.features.len(),
            path.display()
        );
        Ok(document)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> IoResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        log::info!(
            "saved '{}' ({} features) to {}",
            self.name,
            self.features.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipforge_core::{FillColor, ParamValue, TemplateError};

    fn registry() -> TemplateRegistry {
        TemplateRegistry::standard().unwrap()
    }

    #[test]
    fn test_place_uses_defaults() {
        let registry = registry();
        let ytree = registry.resolve("YTREE").unwrap();
        let feature = FeatureInstance::place(ytree, "tree 1", Point::new(10.0, 20.0));
        assert_eq!(feature.template, "YTREE");
        assert_eq!(feature.params.point("position").unwrap(), Point::new(10.0, 20.0));
        assert_eq!(feature.params.integer("out").unwrap(), 8);
    }

    #[test]
    fn test_document_json_keeps_param_kinds() {
        let registry = registry();
        let mut doc = FeatureDocument::new("chip");
        let id = doc.add(FeatureInstance::place(
            registry.resolve("MUX3D").unwrap(),
            "mux",
            Point::origin(),
        ));

        let back = FeatureDocument::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(back, doc);
        let params = &back.feature(id).unwrap().params;
        assert_eq!(params.get("out"), Some(&ParamValue::Integer(8)));
        assert_eq!(params.get("gap"), Some(&ParamValue::Float(600.0)));
    }

    #[test]
    fn test_rejects_other_versions() {
        let json = r#"{"name": "chip", "version": "7"}"#;
        assert!(matches!(
            FeatureDocument::from_json(json),
            Err(IoError::UnsupportedVersion(v)) if v == "7"
        ));
    }

    #[test]
    fn test_effective_params_color() {
        let registry = registry();
        let chamber = registry.resolve("REACTION CHAMBER").unwrap();
        let mut feature = FeatureInstance::place(chamber, "c", Point::origin());
        let settings = DocumentSettings::default();

        let params = feature.effective_params(LogicalLayer::Flow, &settings);
        assert_eq!(params.color(), Some(LogicalLayer::Flow.default_color()));

        let own = FillColor::rgb(9, 9, 9);
        feature.params.insert(COLOR_PARAM, own);
        let params = feature.effective_params(LogicalLayer::Flow, &settings);
        assert_eq!(params.color(), Some(own));
    }

    #[test]
    fn test_unknown_template_names_feature() {
        let feature = FeatureInstance {
            id: Uuid::new_v4(),
            name: "ghost".into(),
            template: "NOPE".into(),
            params: ParamMap::new(),
        };
        match feature.resolve(&registry()) {
            Err(IoError::Feature { feature, source }) => {
                assert_eq!(feature, "ghost");
                assert_eq!(source, TemplateError::UnknownTemplate("NOPE".into()));
            }
            other => panic!("unexpected {:?}", other.map(|t| t.canonical_name().to_string())),
        }
    }

    #[test]
    fn test_substrate_index_adds_offset() {
        let registry = registry();
        let pump = registry.resolve("PUMP3D").unwrap();
        let settings = DocumentSettings {
            base_substrate: 2,
            ..DocumentSettings::default()
        };
        assert_eq!(settings.substrate_index(pump.schema(), LogicalLayer::Flow).unwrap(), 2);
        assert_eq!(settings.substrate_index(pump.schema(), LogicalLayer::Control).unwrap(), 3);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("chipforge-{}.json", Uuid::new_v4()));
        let doc = FeatureDocument::new("disk");
        doc.save(&path).unwrap();
        let back = FeatureDocument::load(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(back.name, "disk");
    }
}
