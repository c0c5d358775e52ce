//! Metadata API payloads for retrieval tests
//!
//! Shapes follow real Metadata API responses; only the fields the
//! crawler reads are significant.

use serde_json::{json, Value};

/// Two snowflake custom SQL tables and one postgres table
pub fn custom_sql_connection() -> Value {
    json!({
        "nodes": [
            {
                "id": "cs-1",
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
                "id": "cs-2",
                "query": "select * from sample_db.public.customers left join sample_db.public.orders on customers.id = orders.customer_id",
                "name": "Custom SQL Query",
                "isEmbedded": null,
                "database": {"name": "SAMPLE_DB", "connectionType": "snowflake"},
                "tables": [],
                "downstreamWorkbooks": [
                    {"luid": "company-kpis-workbook-luid", "name": "Company KPIs workbook"},
                    {"luid": "customers-workbook-luid", "name": "Customers workbook"}
                ]
            },
            {
                "id": "cs-3",
                "query": "select * from analytics.events",
                "name": "Custom SQL Query",
                "isEmbedded": true,
                "database": {"name": "ANALYTICS", "connectionType": "postgres"},
                "tables": [],
                "downstreamWorkbooks": [
                    {"luid": "events-workbook-luid", "name": "Events workbook"}
                ]
            }
        ],
        "pageInfo": {"hasNextPage": false, "endCursor": null}
    })
}

/// Native tables: one incomplete name, one complete, one malformed, one postgres
pub fn native_sql_connection() -> Value {
    json!({
        "nodes": [
            {
                "id": "[irrelevant]",
                "luid": "orders-workbook-luid",
                "name": "Orders workbook",
                "embeddedDatasources": [
                    {
                        "id": "[irrelevant]",
                        "name": "DATASOURCE NAME",
                        "upstreamTables": [
                            {
                                "database": {"name": "SAMPLE_DB"},
                                "schema": "PUBLIC",
                                "fullName": "[PUBLIC].[ORDERS]",
                                "connectionType": "snowflake"
                            },
                            {
                                "database": {"name": "SAMPLE_DB"},
                                "schema": "PUBLIC",
                                "fullName": "[SAMPLE_DB].[PUBLIC].[WEIRD].[NAME]",
                                "connectionType": "snowflake"
                            }
                        ]
                    }
                ]
            },
            {
                "id": "[irrelevant]",
                "luid": "d2b5bfce-3211-49fb-a88d-63e5b98ee317",
                "name": "Unrelated workbook",
                "embeddedDatasources": [
                    {
                        "id": "[irrelevant]",
                        "name": "UNRELATED DATASOURCE",
                        "upstreamTables": [
                            {
                                "database": {"name": "FOO_DB"},
                                "schema": "PUBLIC",
                                "fullName": "FOO_DB.SOME_SCHEMA.RANDOM_TABLE",
                                "connectionType": "snowflake"
                            }
                        ]
                    }
                ]
            },
            {
                "id": "[irrelevant]",
                "luid": "pg-workbook-luid",
                "name": "Postgres workbook",
                "embeddedDatasources": [
                    {
                        "id": "[irrelevant]",
                        "name": "PG",
                        "upstreamTables": [
                            {
                                "database": {"name": "APP"},
                                "schema": "public",
                                "fullName": "users",
                                "connectionType": "postgres"
                            }
                        ]
                    }
                ]
            }
        ],
        "pageInfo": {"hasNextPage": false, "endCursor": null}
    })
}
