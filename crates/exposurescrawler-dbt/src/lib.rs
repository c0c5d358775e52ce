//! dbt artifact handling
//!
//! This crate handles:
//! - Loading and saving manifest.json while passing unknown content through
//! - Extracting the known models and sources with their warehouse relation names
//! - Building exposures from Tableau workbooks
//! - Writing exposures and their parent edges back into the manifest

pub mod exposure;
pub mod manifest;

pub use exposure::{unique_ids, DependsOn, Exposure, ExposureError, Owner, NAME_PREFIX, TAG_NAMESPACE};
pub use manifest::{Manifest, ManifestError, ManifestNode, ManifestSource};
