//! # ChipForge I/O
//!
//! Persistence for placed features: a JSON document of template instances
//! with their parameter maps, plus the document-wide settings hosts use
//! when drawing them.

pub mod document;
pub mod error;
pub mod settings;

pub use document::{FeatureDocument, FeatureInstance, DOCUMENT_VERSION};
pub use error::{IoError, IoResult};
pub use settings::DocumentSettings;
