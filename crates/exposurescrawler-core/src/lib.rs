//! Exposures Crawler Core
//!
//! Platform-neutral domain model shared by the crawler crates:
//! workbook references and metadata, known dbt models, the SQL
//! normalizer and model matcher, and the configuration schema.

pub mod config;
pub mod model;
pub mod query;
pub mod workbook;

pub use config::{Config, ConfigError, Credentials, LoginMethod, TableauConfig};
pub use model::{KnownModel, KnownModels};
pub use query::{normalize, search_models_in_query};
pub use workbook::{UserDetails, WorkbookDetails, WorkbookReference};
