//! Mock Tableau client for testing
//!
//! Serves canned workbooks, users and Metadata API pages from memory and
//! counts the requests it receives. Useful for:
//! - Unit testing the matcher and exposure pipeline
//! - Asserting cache behaviour
//! - Simulating authentication failures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use exposurescrawler_tableau::{MockTableauClient, retrieve_custom_sql};
//! use serde_json::json;
//!
//! let client = MockTableauClient::new().with_metadata(
//!     "customSQLTablesConnection",
//!     json!({ "nodes": [] }),
//! );
//! let custom = retrieve_custom_sql(&client, Some("snowflake"), 100).await?;
//! ```
//!
//! Metadata pages are keyed by the root field the query asks for and the
//! `after` cursor it sends, so multi-page results are registered with
//! [`MockTableauClient::with_metadata_page`].

use crate::client::{ClientError, TableauClient};
use async_trait::async_trait;
use exposurescrawler_core::{UserDetails, WorkbookDetails};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MockTableauClient {
    /// Workbooks by LUID
    workbooks: HashMap<String, WorkbookDetails>,

    /// Users by id
    users: HashMap<String, UserDetails>,

    /// Metadata connection payloads by (root field, after cursor)
    metadata: HashMap<(String, Option<String>), Value>,

    /// Simulate an authentication failure on every call
    fail_authentication: bool,

    workbook_requests: AtomicUsize,
    user_requests: AtomicUsize,
    metadata_requests: AtomicUsize,
    signed_out: AtomicBool,
}

impl MockTableauClient {
    /// Create a new mock client with no data
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `workbook` for lookups of `luid`
    pub fn with_workbook(mut self, luid: impl Into<String>, workbook: WorkbookDetails) -> Self {
        self.workbooks.insert(luid.into(), workbook);
        self
    }

    /// Serve `user` for lookups of its id
    pub fn with_user(mut self, user: UserDetails) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }

    /// Serve `connection` as the first (or only) page for queries on `root`
    pub fn with_metadata(self, root: impl Into<String>, connection: Value) -> Self {
        self.with_metadata_page(root, None, connection)
    }

    /// Serve `connection` for queries on `root` sent with cursor `after`
    pub fn with_metadata_page(mut self, root: impl Into<String>, after: Option<&str>, connection: Value) -> Self {
        self.metadata
            .insert((root.into(), after.map(str::to_string)), connection);
        self
    }

    /// Fail every call with an authentication error
    pub fn with_authentication_failure(mut self) -> Self {
        self.fail_authentication = true;
        self
    }

    pub fn workbook_requests(&self) -> usize {
        self.workbook_requests.load(Ordering::SeqCst)
    }

    pub fn user_requests(&self) -> usize {
        self.user_requests.load(Ordering::SeqCst)
    }

    pub fn metadata_requests(&self) -> usize {
        self.metadata_requests.load(Ordering::SeqCst)
    }

    pub fn is_signed_out(&self) -> bool {
        self.signed_out.load(Ordering::SeqCst)
    }

    fn check_authentication(&self) -> Result<(), ClientError> {
        if self.fail_authentication {
            return Err(ClientError::AuthenticationError("Simulated sign in failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TableauClient for MockTableauClient {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn retrieve_workbook(&self, workbook_id: &str) -> Result<WorkbookDetails, ClientError> {
        self.workbook_requests.fetch_add(1, Ordering::SeqCst);
        self.check_authentication()?;

        self.workbooks
            .get(workbook_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("workbook {}", workbook_id)))
    }

    async fn retrieve_user(&self, user_id: &str) -> Result<UserDetails, ClientError> {
        self.user_requests.fetch_add(1, Ordering::SeqCst);
        self.check_authentication()?;

        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("user {}", user_id)))
    }

    async fn run_metadata_query(&self, query: &str, variables: Value) -> Result<Value, ClientError> {
        self.metadata_requests.fetch_add(1, Ordering::SeqCst);
        self.check_authentication()?;

        let after = variables.get("after").and_then(Value::as_str).map(str::to_string);

        self.metadata
            .iter()
            .find(|((root, cursor), _)| query.contains(root.as_str()) && *cursor == after)
            .map(|((root, _), connection)| json!({ root.as_str(): connection }))
            .ok_or_else(|| ClientError::GraphQlError(format!("no mock data for query (after = {:?})", after)))
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        self.signed_out.store(true, Ordering::SeqCst);
        Ok(())
    }
}
