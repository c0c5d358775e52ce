//! Crawl engine
//!
//! Matches the SQL fragments Tableau reports against the models known to
//! the dbt manifest, merges the results of both retrieval paths and writes
//! one exposure per workbook back into the manifest.

pub mod aggregator;
pub mod crawler;

pub use aggregator::{merge_results, parse_tables_from_sql, WorkbookModelsMapping};
pub use crawler::{add_workbook_exposure, crawl, CrawlError, CrawlOptions, CrawlSummary, WorkbookOutcome};
