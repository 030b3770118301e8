//! Oxidock Affinity - merging externally predicted binding affinities.
//!
//! The affinity prediction tool runs separately, producing one small JSON
//! document per molecule. This crate generates the tool's per-molecule
//! input configs from the master molecule table, and later merges the
//! predicted values back into that table as a new column.

pub mod merge;
pub mod template;

pub use merge::{merge_affinity, MergeJob, MergeReport, MergeRowOutcome, MergeSkipReason};
pub use template::{generate_affinity_configs, TemplateJob, TemplateReport};
