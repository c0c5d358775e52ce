//! Fixtures for end-to-end crawl tests
//!
//! A small jaffle_shop manifest and a mock Tableau server with three
//! workbooks reading from it and one reading an unrelated table. Payload
//! shapes were captured from real Metadata API responses.

use exposurescrawler_core::{UserDetails, WorkbookDetails};
use exposurescrawler_dbt::Manifest;
use exposurescrawler_engine::CrawlOptions;
use exposurescrawler_tableau::MockTableauClient;
use serde_json::json;
use std::path::Path;

pub const MANIFEST_FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/manifest.json");

pub fn manifest() -> Manifest {
    Manifest::from_file(Path::new(MANIFEST_FIXTURE)).unwrap()
}

pub fn options() -> CrawlOptions {
    CrawlOptions {
        package_name: "jeffle_shop".to_string(),
        base_url: "https://my-tableau-server.com".to_string(),
        connection_type: "snowflake".to_string(),
        ignore_projects: Default::default(),
        page_size: 100,
    }
}

/// Workbook details with the defaults every fixture workbook shares
pub fn workbook(id: &str, name: &str) -> WorkbookDetails {
    WorkbookDetails {
        id: id.to_string(),
        name: name.to_string(),
        description: Some("Workbook description".to_string()),
        webpage_url: "http://hostname/path/to/workbook".to_string(),
        owner_id: "owner-id".to_string(),
        project_name: "A Tableau folder".to_string(),
        tags: vec![],
        created_at: "created-at".to_string(),
        updated_at: "updated-at".to_string(),
    }
}

pub fn owner() -> UserDetails {
    UserDetails {
        id: "owner-id".to_string(),
        fullname: "John Doe".to_string(),
        name: "john.doe@example.com".to_string(),
    }
}

pub fn custom_sql_connection() -> serde_json::Value {
    json!({
        "nodes": [
            {
                "query": "select * from sample_db.public.customers",
                "name": "Custom SQL Query",
                "isEmbedded": null,
                "database": {"name": "SAMPLE_DB", "connectionType": "snowflake"},
                "tables": [],
                "downstreamWorkbooks": [
                    {"luid": "customers-workbook-luid", "name": "Customers workbook"}
                ]
            },
            {
                "query": "select * from sample_db.public.customers left join sample_db.public.orders on customers.id = orders.customer_id",
                "name": "Custom SQL Query",
                "isEmbedded": null,
                "database": {"name": "SAMPLE_DB", "connectionType": "snowflake"},
                "tables": [],
                "downstreamWorkbooks": [
                    {"luid": "company-kpis-workbook-luid", "name": "Company KPIs workbook"}
                ]
            }
        ]
    })
}

pub fn native_sql_connection() -> serde_json::Value {
    json!({
        "nodes": [
            {
                "id": "[irrelevant]",
                "luid": "orders-workbook-luid",
                "name": "Orders workbook",
                "embeddedDatasources": [{
                    "id": "[irrelevant]",
                    "name": "DATASOURCE NAME",
                    "upstreamTables": [{
                        "database": {"name": "SAMPLE_DB"},
                        "schema": "PUBLIC",
                        "fullName": "[PUBLIC].[ORDERS]",
                        "connectionType": "snowflake"
                    }]
                }]
            },
            {
                "id": "[irrelevant]",
                "luid": "d2b5bfce-3211-49fb-a88d-63e5b98ee317",
                "name": "Unrelated workbook",
                "embeddedDatasources": [{
                    "id": "[irrelevant]",
                    "name": "UNRELATED DATASOURCE",
                    "upstreamTables": [{
                        "database": {"name": "FOO_DB"},
                        "schema": "PUBLIC",
                        "fullName": "FOO_DB.SOME_SCHEMA.RANDOM_TABLE",
                        "connectionType": "snowflake"
                    }]
                }]
            }
        ]
    })
}

pub fn client() -> MockTableauClient {
    let mut orders = workbook("ccc", "Orders workbook");
    orders.tags = vec!["certified".to_string()];

    MockTableauClient::new()
        .with_metadata("customSQLTablesConnection", custom_sql_connection())
        .with_metadata("workbooksConnection", native_sql_connection())
        .with_workbook("customers-workbook-luid", workbook("aaa", "Customers workbook"))
        .with_workbook("company-kpis-workbook-luid", workbook("bbb", "Company KPIs workbook"))
        .with_workbook("orders-workbook-luid", orders)
        .with_user(owner())
}
