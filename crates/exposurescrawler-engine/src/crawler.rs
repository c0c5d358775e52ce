//! Crawl orchestration
//!
//! One crawl:
//! 1. Collect known models and sources from the manifest
//! 2. Retrieve custom SQL and native tables from Tableau, match each path
//! 3. Merge both paths per workbook
//! 4. For every workbook not in an ignored project, build its exposure
//!    and write it into the manifest
//!
//! Workbooks are processed one at a time in merge order, so the manifest
//! needs no locking.

use crate::aggregator::{merge_results, parse_tables_from_sql};
use exposurescrawler_core::{Config, ConfigError, KnownModel, UserDetails, WorkbookDetails};
use exposurescrawler_dbt::{Exposure, ExposureError, Manifest, ManifestError};
use exposurescrawler_tableau::{retrieve_custom_sql, retrieve_native_sql, ClientError, MetadataCache, TableauClient};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Settings for one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlOptions {
    /// dbt package the exposures are added to
    pub package_name: String,

    /// Tableau base URL used to rewrite workbook URLs
    pub base_url: String,

    /// Only tables and custom SQL from this connection type are matched
    pub connection_type: String,

    /// Projects (folders) whose workbooks are skipped
    pub ignore_projects: BTreeSet<String>,

    /// Metadata API page size
    pub page_size: u32,
}

impl CrawlOptions {
    /// Options from the loaded config; `package_name` wins over the config's
    pub fn from_config(config: &Config, package_name: Option<&str>) -> Result<Self, CrawlError> {
        let package_name = package_name
            .map(str::to_string)
            .or_else(|| config.dbt_package_name.clone())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ConfigError::MissingValue("dbt package name".to_string()))?;

        Ok(Self {
            package_name,
            base_url: config.tableau.base_url()?.to_string(),
            connection_type: config.tableau.connection_type.clone(),
            ignore_projects: config.ignore_projects.iter().cloned().collect(),
            page_size: config.tableau.page_size,
        })
    }

    pub fn is_ignored(&self, workbook: &WorkbookDetails) -> bool {
        self.ignore_projects.contains(&workbook.project_name)
    }
}

/// What happened to a single workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbookOutcome {
    /// Exposure written under this unique_id
    Added(String),

    /// Project is in the ignore list
    Ignored,
}

/// Counts and ids from one crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub known_models: usize,
    pub custom_sql_workbooks: usize,
    pub native_sql_workbooks: usize,
    pub merged_workbooks: usize,

    /// unique_ids of the exposures written, in processing order
    pub exposures: Vec<String>,

    /// Names of workbooks skipped because their project is ignored
    pub skipped: Vec<String>,
}

/// Crawl errors
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("Tableau request failed: {0}")]
    Client(#[from] ClientError),

    #[error("Failed to build exposure: {0}")]
    Exposure(#[from] ExposureError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Build and write the exposure for one workbook, unless its project is ignored
pub fn add_workbook_exposure(
    manifest: &mut Manifest,
    options: &CrawlOptions,
    workbook: &WorkbookDetails,
    owner: &UserDetails,
    found: &[KnownModel],
) -> Result<WorkbookOutcome, CrawlError> {
    if options.is_ignored(workbook) {
        debug!(
            workbook = %workbook.name,
            project = %workbook.project_name,
            "skipping workbook, project is ignored"
        );
        return Ok(WorkbookOutcome::Ignored);
    }

    let exposure = Exposure::from_tableau_workbook(&options.package_name, &options.base_url, workbook, owner, found)?;
    manifest.add_exposure(&exposure, found)?;

    let unique_id = exposure.unique_id();
    debug!(exposure = %unique_id, parents = exposure.depends_on.nodes.len(), "exposure written");
    Ok(WorkbookOutcome::Added(unique_id))
}

/// Run the whole pipeline against `manifest`, mutating it in place.
///
/// The client is not signed out; the caller owns the session.
pub async fn crawl<C>(
    client: &C,
    manifest: &mut Manifest,
    options: &CrawlOptions,
    cache: &mut MetadataCache,
) -> Result<CrawlSummary, CrawlError>
where
    C: TableauClient + ?Sized,
{
    let models = manifest.known_models();

    info!(client = client.name(), connection_type = %options.connection_type, "Retrieving lineage from Tableau");

    let custom_sqls = retrieve_custom_sql(client, Some(options.connection_type.as_str()), options.page_size).await?;
    let custom_models = parse_tables_from_sql(&custom_sqls, &models);

    let native_sqls = retrieve_native_sql(client, &options.connection_type, options.page_size).await?;
    let native_models = parse_tables_from_sql(&native_sqls, &models);

    let mut summary = CrawlSummary {
        known_models: models.len(),
        custom_sql_workbooks: custom_models.len(),
        native_sql_workbooks: native_models.len(),
        ..CrawlSummary::default()
    };

    let workbooks_models = merge_results(custom_models, native_models);
    summary.merged_workbooks = workbooks_models.len();

    info!("Retrieving workbooks and authors metadata from the Tableau REST API");

    for (reference, found) in &workbooks_models {
        let workbook = cache.workbook(client, &reference.id).await?;
        let owner = cache.user(client, &workbook.owner_id).await?;

        match add_workbook_exposure(manifest, options, &workbook, &owner, found)? {
            WorkbookOutcome::Added(unique_id) => summary.exposures.push(unique_id),
            WorkbookOutcome::Ignored => summary.skipped.push(workbook.name.clone()),
        }
    }

    info!(
        exposures = summary.exposures.len(),
        skipped = summary.skipped.len(),
        "Exposures added to manifest"
    );

    Ok(summary)
}
