//! Tableau client and lineage retrieval
//!
//! This crate talks to Tableau and turns what it returns into the
//! workbook -> SQL fragment mappings the matcher consumes.
//!
//! ## Retrieval paths
//!
//! - Custom SQL: free-form queries embedded in data connections, traced
//!   downstream to the workbooks using them ([`retrieve_custom_sql`]).
//! - Native SQL: tables reported by the Metadata API lineage graph for each
//!   workbook, with their fully qualified names repaired when incomplete
//!   ([`retrieve_native_sql`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use exposurescrawler_tableau::{retrieve_custom_sql, RestClient, TableauClient};
//!
//! let client = RestClient::new(&config.tableau, credentials)?;
//! let custom = retrieve_custom_sql(&client, Some("snowflake"), 100).await?;
//! client.sign_out().await?;
//! ```

pub mod cache;
pub mod client;
pub mod graphql;
pub mod mock;
pub mod rest;

pub use cache::MetadataCache;
pub use client::{ClientError, TableauClient};
pub use graphql::{fix_fqn, retrieve_custom_sql, retrieve_native_sql, FqnError, WorkbookSqlMapping};
pub use mock::MockTableauClient;
pub use rest::RestClient;
