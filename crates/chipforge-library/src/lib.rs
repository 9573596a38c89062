//! # ChipForge Library
//!
//! The built-in microfluidic feature templates and the registry that maps
//! canonical type names to them.
//!
//! Each template turns a parameter map into one compound shape per layer
//! and an ordered list of connection ports.

pub mod alignment_marks;
pub mod chamber;
pub mod droplet_generator;
pub mod droplet_merger;
pub mod incubation;
pub mod mux3d;
pub mod pump3d;
pub mod registry;
pub mod sorter;
pub mod template;
pub mod ytree;

pub use alignment_marks::AlignmentMarks;
pub use chamber::Chamber;
pub use droplet_generator::DropletGeneratorFlowFocus;
pub use droplet_merger::DropletMerger;
pub use incubation::Incubation;
pub use mux3d::{MuxLayout, ThreeDMux};
pub use pump3d::Pump3D;
pub use registry::TemplateRegistry;
pub use sorter::{Sorter, SorterLayout};
pub use template::{Template, PREVIEW_OPACITY};
pub use ytree::{TreeLayout, YTree};
