use std::collections::BTreeMap;

use chipforge_core::error::{TemplateError, TemplateResult};

use crate::template::Template;
use crate::{
    AlignmentMarks, Chamber, DropletGeneratorFlowFocus, DropletMerger, Incubation, Pump3D, Sorter,
    ThreeDMux, YTree,
};

/// Templates keyed by canonical name. Built once at startup, read-only after.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, Box<dyn Template>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in template.
    pub fn standard() -> TemplateResult<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(AlignmentMarks::new()))?;
        registry.register(Box::new(Chamber::new()))?;
        registry.register(Box::new(DropletGeneratorFlowFocus::new()))?;
        registry.register(Box::new(DropletMerger::new()))?;
        registry.register(Box::new(Incubation::new()))?;
        registry.register(Box::new(Pump3D::new()))?;
        registry.register(Box::new(Sorter::new()))?;
        registry.register(Box::new(ThreeDMux::new()))?;
        registry.register(Box::new(YTree::new()))?;
        log::info!("Template registry ready with {} templates", registry.len());
        Ok(registry)
    }

    /// Add a template after checking its schema.
    pub fn register(&mut self, template: Box<dyn Template>) -> TemplateResult<()> {
        template.schema().validate()?;
        let name = template.canonical_name().to_string();
        if self.templates.contains_key(&name) {
            return Err(TemplateError::DuplicateTemplate(name));
        }
        log::debug!(
            "Registered template '{}' ({} layers)",
            name,
            template.schema().render_layers().len()
        );
        self.templates.insert(name, template);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> TemplateResult<&dyn Template> {
        self.templates
            .get(name)
            .map(|t| t.as_ref())
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Template> {
        self.templates.values().map(|t| t.as_ref())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
