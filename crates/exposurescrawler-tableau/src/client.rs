//! Tableau client trait

use async_trait::async_trait;
use exposurescrawler_core::{UserDetails, WorkbookDetails};
use serde_json::Value;

/// Errors that can occur when talking to Tableau
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    RequestError(String),

    #[error("Metadata API returned errors: {0}")]
    GraphQlError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// The Tableau operations the crawler needs
#[async_trait]
pub trait TableauClient: Send + Sync {
    /// Client name for logs (e.g., "Tableau REST", "Mock")
    fn name(&self) -> &'static str;

    /// Fetch workbook metadata by LUID
    async fn retrieve_workbook(&self, workbook_id: &str) -> Result<WorkbookDetails, ClientError>;

    /// Fetch user metadata by LUID
    async fn retrieve_user(&self, user_id: &str) -> Result<UserDetails, ClientError>;

    /// Run a GraphQL query against the Metadata API and return its `data` object
    async fn run_metadata_query(&self, query: &str, variables: Value) -> Result<Value, ClientError>;

    /// End the session, if one is open
    async fn sign_out(&self) -> Result<(), ClientError>;
}
