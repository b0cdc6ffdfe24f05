//! Class metadata for classweave.
//!
//! [`ClassRegistry`] is an ahead-of-time [`TypeUniverse`](classweave_core::TypeUniverse)
//! implementation. [`ClassOverlay`] layers classes under construction on
//! top of any universe.

mod overlay;
mod registry;

pub use overlay::ClassOverlay;
pub use registry::{ClassRegistry, HierarchyEdge};
