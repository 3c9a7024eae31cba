//! Merge rules: defaults, override order, conflict handling.

mod defaults;

pub use defaults::builder_with_defaults;
