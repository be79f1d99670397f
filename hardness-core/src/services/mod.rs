//! Services for the soil hardness pipeline
//!
//! Ingest (C1, C2), grouping (C3), association (C4), statistics (C5) and
//! surface rendering (C6), plus the operator helpers built on top of them.

pub mod association;
pub mod csv_generator;
pub mod csv_ingestor;
pub mod file_scanner;
pub mod import_orchestrator;
pub mod ledger_suggest;
pub mod memory_grouper;
pub mod plot_generator;
pub mod renderer;
pub mod statistics;
pub mod surface;

pub use association::{AnchorOutcome, AssociationEngine, IndividualOutcome};
pub use csv_generator::{generate_fields, CsvGeneratorOptions, GeneratedFiles};
pub use csv_ingestor::{parse_probe_csv, CsvIngestor};
pub use file_scanner::FileScanner;
pub use import_orchestrator::ImportOrchestrator;
pub use ledger_suggest::{LedgerSuggester, LedgerSuggestion};
pub use memory_grouper::MemoryGrouper;
pub use plot_generator::{PlotGenerator, PlotRunSummary};
pub use renderer::{PlottersRenderer, RenderError, SurfaceRenderer};
pub use statistics::{FolderStatsMode, StatisticsService};
pub use surface::{build_surface, SurfaceBundle, SurfaceReduction};
