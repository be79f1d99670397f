//! Data models for hardness-core

pub mod import_result;
pub mod penetrometer;
pub mod statistics;

pub use import_result::{FileError, ImportSummary};
pub use penetrometer::{DepthReading, ProbeFile, ProbeHeader};
pub use statistics::{
    AssociationSummary, BlockStats, FolderStats, LedgerDescriptor, LedgerStats, MemoryGroup,
    PlotPrecheck,
};
