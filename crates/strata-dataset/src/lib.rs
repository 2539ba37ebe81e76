//! Weighted sample files and regional dataset hierarchies.
//!
//! Parses delimited reference files into weighted samples, and resolves a
//! logical dataset id against an injected hierarchy into the concrete files
//! that back it.

pub mod converter;
pub mod encoding;
pub mod hierarchy;
pub mod loader;
pub mod resolver;

pub use converter::{Converter, ValueType};
pub use encoding::Encoding;
pub use hierarchy::{DatasetHierarchy, HierarchyBuilder};
pub use loader::{DatasetRequest, SampleLoader};
pub use resolver::{DatasetResolver, FilenamePattern, LeafCandidates};
