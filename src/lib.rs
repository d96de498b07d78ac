//! cardsheet - Card deck importer for spreadsheet-authored party games
//!
//! This crate reads card texts out of Excel workbooks (XLSX) where each sheet
//! lays decks out in columns, normalizes the rich text of every card (style
//! markup, character replacements, blank collapsing), and merges the cards of
//! all sheets into per-deck sets of black (prompt) and white (response) cards.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cardsheet::{ImporterBuilder, ImporterConfig, LogSink, OutputFormat};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load sources, replacements and deck infos from a JSON file
//!     let config = ImporterConfig::from_path("importer.json")?;
//!     let importer = ImporterBuilder::from_config(config).build()?;
//!
//!     // Anomalies (unknown formatting, orphaned cards, ...) go to the log
//!     let mut sink = LogSink::new();
//!     let result = importer.run(&mut sink)?;
//!
//!     result.write_to(OutputFormat::Text, std::io::stdout())?;
//!     Ok(())
//! }
//! ```
//!
//! # Parsing rows directly
//!
//! The sheet parser works on plain row data, so it can be fed from any cell
//! source:
//!
//! ```rust
//! use cardsheet::{parse_sheet, ReplacementTable, SheetLayout, SheetRow, TextNormalizer};
//!
//! let rows = vec![
//!     SheetRow::from_texts(0, &["Base Set"]),
//!     SheetRow::from_texts(1, &["A windmill full of corpses."]),
//! ];
//! let layout = SheetLayout::new(1, 0).unwrap();
//! let mut normalizer = TextNormalizer::new(ReplacementTable::empty(), true);
//! let mut anomalies: Vec<cardsheet::Anomaly> = Vec::new();
//!
//! let cards = parse_sheet("Whites", &rows, layout, &mut normalizer, &mut anomalies);
//! assert!(cards.get("Base Set").unwrap().contains("A windmill full of corpses."));
//! ```

pub mod aggregate;
mod api;
mod builder;
mod config;
mod diagnostics;
mod error;
mod normalizer;
mod output;
mod parser;
pub mod prompt;
mod security;
mod sheet;
mod source;
mod types;

// 公開API
pub use aggregate::{DeckAliases, DeckInfo, DeckSummary, MergedCards};
pub use api::{OutputFormat, SheetRef};
pub use builder::{BlackCardMetrics, ImportResult, Importer, ImporterBuilder};
pub use config::{ImporterConfig, Replacement};
pub use diagnostics::{Anomaly, AnomalyKind, DiagnosticsSink, LogSink, Severity};
pub use error::ImportError;
pub use normalizer::{collapse_blanks, NormalizationMemo, ReplacementTable, TextNormalizer, BLANK_MARKER};
pub use parser::WorkbookReader;
pub use prompt::PromptMetrics;
pub use security::SecurityConfig;
pub use sheet::{parse_sheet, ColumnRegion, SheetLayout};
pub use source::{ExcelSource, ParsedSheet, SheetConfig, Source};
pub use types::{
    CardColor, CellContent, CellLocation, DeckCardMap, RunStyle, SheetCell, SheetRow, StyledRun,
};
