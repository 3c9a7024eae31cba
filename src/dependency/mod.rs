//! Dependency tracking: turning change events into changed paths, and changed paths
//! into the set of nodes that must recompute.

pub mod converter;
pub mod detail;
pub mod detector;
pub mod extractor;
pub mod pattern;

pub use converter::{ConfiguredConverter, SourceMapping};
pub use detail::DependencyDetail;
pub use detector::{affected_nodes_in, get_affected_nodes, ChangeSnapshots};
pub use extractor::{
    changed_paths_for, extract_changed_paths, ChangeConverter, DependencyDescriptor,
    LocalEventValue,
};
pub use pattern::{matched_prefix, path_matches_pattern};
