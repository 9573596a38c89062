//! # ChipForge Core
//!
//! Geometry kernel, logical layers, parameter values and schemas, and the
//! port model shared by every microfluidic feature template.
//!
//! Shapes are bulge-vertex contours; boolean composition runs through
//! `cavalier_contours`.

pub mod boolean;
pub mod compound;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod params;
pub mod port;
pub mod schema;
pub mod spatial;

pub use boolean::{subtract, union, union_all};
pub use compound::CompoundShape;
pub use error::{TemplateError, TemplateResult};
pub use geometry::{circle, polygon, rectangle, rectangle_between, rotate, BBox, Contour, Point, Shape, Vertex};
pub use layer::{FillColor, LogicalLayer};
pub use params::{ParamMap, ParamValue};
pub use port::{ComponentPort, Placement};
pub use schema::{AliasSet, FieldKind, ParameterField, ParameterSchema, PlacementTool};
pub use spatial::{FootprintEntry, FootprintIndex};
