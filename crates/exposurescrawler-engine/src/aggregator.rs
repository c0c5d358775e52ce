//! Per-workbook model matching and merging of the two retrieval paths

use exposurescrawler_core::{search_models_in_query, KnownModel, KnownModels, WorkbookReference};
use exposurescrawler_tableau::WorkbookSqlMapping;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Workbook -> models found in its SQL.
///
/// The list may contain the same model more than once; exposures dedup by
/// unique_id when they are built.
pub type WorkbookModelsMapping = BTreeMap<WorkbookReference, Vec<KnownModel>>;

/// Look for known models in every SQL fragment of every workbook.
///
/// Workbooks where nothing was found are left out of the result.
pub fn parse_tables_from_sql(workbooks_sqls: &WorkbookSqlMapping, models: &KnownModels) -> WorkbookModelsMapping {
    info!("Parsing SQL: looking for references to models");

    let mut output = WorkbookModelsMapping::new();

    for (workbook, sqls) in workbooks_sqls {
        let all_found: Vec<KnownModel> = sqls
            .iter()
            .flat_map(|sql| search_models_in_query(sql, models).into_values())
            .collect();

        if all_found.is_empty() {
            debug!(workbook = %workbook.name, "found no models");
            continue;
        }

        debug!(
            workbook = %workbook.name,
            models = ?all_found.iter().map(|m| m.materialized_name.as_str()).collect::<Vec<_>>(),
            "found models"
        );
        output.insert(workbook.clone(), all_found);
    }

    info!(workbooks = output.len(), "Found workbooks with linked models");
    output
}

/// Union of both paths by workbook; custom SQL hits first, then native ones.
///
/// Lists are concatenated, not deduplicated.
pub fn merge_results(custom: WorkbookModelsMapping, native: WorkbookModelsMapping) -> WorkbookModelsMapping {
    let (custom_count, native_count) = (custom.len(), native.len());

    let mut merged = custom;
    for (workbook, found) in native {
        merged.entry(workbook).or_default().extend(found);
    }

    info!(
        custom = custom_count,
        native = native_count,
        merged = merged.len(),
        "Results merged"
    );
    merged
}
