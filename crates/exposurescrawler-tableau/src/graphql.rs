//! Metadata API lineage retrieval
//!
//! Tableau reports lineage for native tables and custom SQL through two
//! different entry points: starting from workbooks, upstream tables only
//! include database tables, never custom SQL tables. Custom SQL has to be
//! queried on its own and traced downstream to its workbooks.

use crate::client::{ClientError, TableauClient};
use exposurescrawler_core::WorkbookReference;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Workbook -> SQL fragments (query text or fully qualified table names)
pub type WorkbookSqlMapping = BTreeMap<WorkbookReference, Vec<String>>;

const CUSTOM_SQL_QUERY: &str = include_str!("queries/custom_sql.graphql");
const NATIVE_SQL_QUERY: &str = include_str!("queries/native_sql.graphql");

const CUSTOM_SQL_ROOT: &str = "customSQLTablesConnection";
const NATIVE_SQL_ROOT: &str = "workbooksConnection";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,

    #[serde(default)]
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    has_next_page: bool,

    #[serde(default)]
    end_cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseRef {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    connection_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkbookNode {
    luid: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomSqlTable {
    #[serde(default)]
    query: Option<String>,

    #[serde(default)]
    database: Option<DatabaseRef>,

    #[serde(default)]
    downstream_workbooks: Vec<WorkbookNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NativeWorkbook {
    luid: String,
    name: String,

    #[serde(default)]
    embedded_datasources: Vec<EmbeddedDatasource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddedDatasource {
    #[serde(default)]
    upstream_tables: Vec<UpstreamTable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamTable {
    full_name: String,

    #[serde(default)]
    schema: Option<String>,

    #[serde(default)]
    connection_type: Option<String>,

    #[serde(default)]
    database: Option<DatabaseRef>,
}

/// Custom SQL queries per workbook.
///
/// With `only_connection_type`, queries from data connections of any other
/// type are dropped.
pub async fn retrieve_custom_sql<C>(
    client: &C,
    only_connection_type: Option<&str>,
    page_size: u32,
) -> Result<WorkbookSqlMapping, ClientError>
where
    C: TableauClient + ?Sized,
{
    let tables: Vec<CustomSqlTable> = fetch_all(client, CUSTOM_SQL_QUERY, CUSTOM_SQL_ROOT, page_size).await?;

    info!(tables = tables.len(), "Parsing GraphQL result: looking for custom SQL tables");

    let mut workbooks_custom_sqls = WorkbookSqlMapping::new();

    for table in tables {
        if let Some(only) = only_connection_type {
            let connection_type = table.database.as_ref().and_then(|db| db.connection_type.as_deref());
            if connection_type != Some(only) {
                continue;
            }
        }

        let Some(query) = table.query.filter(|q| !q.trim().is_empty()) else {
            continue;
        };

        for downstream in table.downstream_workbooks {
            let workbook = WorkbookReference::new(downstream.luid, downstream.name);

            debug!(workbook = %workbook.name, "adding custom SQL");
            workbooks_custom_sqls.entry(workbook).or_default().push(query.clone());
        }
    }

    info!(workbooks = workbooks_custom_sqls.len(), "Found workbooks with custom SQL");

    Ok(workbooks_custom_sqls)
}

/// Fully qualified names of the native tables each workbook reads from.
///
/// Only tables whose connection type equals `connection_type` are kept.
/// A table whose name cannot be repaired is logged and skipped.
pub async fn retrieve_native_sql<C>(
    client: &C,
    connection_type: &str,
    page_size: u32,
) -> Result<WorkbookSqlMapping, ClientError>
where
    C: TableauClient + ?Sized,
{
    let workbooks: Vec<NativeWorkbook> = fetch_all(client, NATIVE_SQL_QUERY, NATIVE_SQL_ROOT, page_size).await?;

    info!(workbooks = workbooks.len(), "Parsing GraphQL result: looking for native SQL tables");

    let mut workbooks_native_sqls = WorkbookSqlMapping::new();

    for native in workbooks {
        let workbook = WorkbookReference::new(native.luid, native.name);

        let tables = native
            .embedded_datasources
            .iter()
            .flat_map(|datasource| datasource.upstream_tables.iter())
            .filter(|table| table.connection_type.as_deref() == Some(connection_type));

        for table in tables {
            let database = table.database.as_ref().and_then(|db| db.name.as_deref());

            match fix_fqn(&table.full_name, database, table.schema.as_deref()) {
                Ok(fqn) => {
                    debug!(workbook = %workbook.name, fqn = %fqn, "adding native SQL");
                    workbooks_native_sqls.entry(workbook.clone()).or_default().push(fqn);
                }
                Err(e) => {
                    error!(workbook = %workbook.name, error = %e, "skipping table reference");
                }
            }
        }
    }

    info!(workbooks = workbooks_native_sqls.len(), "Found workbooks with native SQL");

    Ok(workbooks_native_sqls)
}

/// Complete a table's full name into `database.schema.table`.
///
/// The Metadata API sometimes reports `[DATABASE].[SCHEMA].[TABLE]`,
/// sometimes only `[SCHEMA].[TABLE]` or even just `TABLE`. Brackets are
/// removed, then the missing qualifiers are taken from the table's
/// database and schema.
pub fn fix_fqn(full_name: &str, database: Option<&str>, schema: Option<&str>) -> Result<String, FqnError> {
    let name = full_name.replace(['[', ']'], "");
    let separators = name.matches('.').count();

    let missing = |qualifier: &'static str| FqnError::MissingQualifier {
        full_name: full_name.to_string(),
        qualifier,
    };

    let fixed = match separators {
        2 => return Ok(name),
        1 => format!("{}.{}", database.ok_or_else(|| missing("database"))?, name),
        0 => format!(
            "{}.{}.{}",
            database.ok_or_else(|| missing("database"))?,
            schema.ok_or_else(|| missing("schema"))?,
            name
        ),
        _ => {
            return Err(FqnError::UnexpectedSeparators {
                full_name: full_name.to_string(),
                separators,
            })
        }
    };

    debug!(from = %full_name, to = %fixed, "fixing incomplete FQN");
    Ok(fixed)
}

/// A table name that cannot be turned into `database.schema.table`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FqnError {
    #[error("table name {full_name:?} has {separators} separators, expected at most 2")]
    UnexpectedSeparators { full_name: String, separators: usize },

    #[error("table name {full_name:?} is incomplete and its {qualifier} is unknown")]
    MissingQualifier { full_name: String, qualifier: &'static str },
}

/// Run a paginated Metadata API query until the last page
async fn fetch_all<T, C>(client: &C, query: &str, root: &str, page_size: u32) -> Result<Vec<T>, ClientError>
where
    T: DeserializeOwned,
    C: TableauClient + ?Sized,
{
    let mut nodes = Vec::new();
    let mut after: Option<String> = None;

    loop {
        let variables = json!({ "first": page_size, "after": after });
        let mut data = client.run_metadata_query(query, variables).await?;

        let connection = data
            .get_mut(root)
            .map(serde_json::Value::take)
            .ok_or_else(|| ClientError::InvalidResponse(format!("missing `{}` in Metadata API response", root)))?;

        let page: Connection<T> = serde_json::from_value(connection)
            .map_err(|e| ClientError::InvalidResponse(format!("{}: {}", root, e)))?;

        nodes.extend(page.nodes);

        match page.page_info {
            Some(PageInfo {
                has_next_page: true,
                end_cursor: Some(cursor),
            }) => after = Some(cursor),
            _ => break,
        }
    }

    Ok(nodes)
}
