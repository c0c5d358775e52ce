//! Per-run cache of workbook and user lookups
//!
//! Several workbooks usually share an owner, and a workbook can be reached
//! from both retrieval paths. The cache lives as long as the caller keeps
//! it, typically one crawl.

use crate::client::{ClientError, TableauClient};
use exposurescrawler_core::{UserDetails, WorkbookDetails};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MetadataCache {
    workbooks: HashMap<String, WorkbookDetails>,
    users: HashMap<String, UserDetails>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workbook by LUID, fetched on first access
    pub async fn workbook<C>(&mut self, client: &C, workbook_id: &str) -> Result<WorkbookDetails, ClientError>
    where
        C: TableauClient + ?Sized,
    {
        if let Some(workbook) = self.workbooks.get(workbook_id) {
            return Ok(workbook.clone());
        }

        let workbook = client.retrieve_workbook(workbook_id).await?;
        self.workbooks.insert(workbook_id.to_string(), workbook.clone());
        Ok(workbook)
    }

    /// User by LUID, fetched on first access
    pub async fn user<C>(&mut self, client: &C, user_id: &str) -> Result<UserDetails, ClientError>
    where
        C: TableauClient + ?Sized,
    {
        if let Some(user) = self.users.get(user_id) {
            return Ok(user.clone());
        }

        let user = client.retrieve_user(user_id).await?;
        self.users.insert(user_id.to_string(), user.clone());
        Ok(user)
    }

    pub fn cached_workbooks(&self) -> usize {
        self.workbooks.len()
    }

    pub fn cached_users(&self) -> usize {
        self.users.len()
    }

    pub fn clear(&mut self) {
        self.workbooks.clear();
        self.users.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTableauClient;

    fn client() -> MockTableauClient {
        MockTableauClient::new()
            .with_workbook(
                "wb-luid",
                WorkbookDetails {
                    id: "wb-luid".to_string(),
                    name: "Sales".to_string(),
                    description: None,
                    webpage_url: "http://host/views/sales".to_string(),
                    owner_id: "owner".to_string(),
                    project_name: "Finance".to_string(),
                    tags: vec![],
                    created_at: String::new(),
                    updated_at: String::new(),
                },
            )
            .with_user(UserDetails {
                id: "owner".to_string(),
                fullname: "Jane Roe".to_string(),
                name: "jane@example.com".to_string(),
            })
    }

    #[tokio::test]
    async fn fetches_once_per_id() {
        let client = client();
        let mut cache = MetadataCache::new();

        for _ in 0..3 {
            let workbook = cache.workbook(&client, "wb-luid").await.unwrap();
            cache.user(&client, &workbook.owner_id).await.unwrap();
        }

        assert_eq!(client.workbook_requests(), 1);
        assert_eq!(client.user_requests(), 1);
        assert_eq!(cache.cached_workbooks(), 1);
        assert_eq!(cache.cached_users(), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let client = client();
        let mut cache = MetadataCache::new();

        assert!(cache.workbook(&client, "missing").await.is_err());
        assert!(cache.workbook(&client, "missing").await.is_err());

        assert_eq!(client.workbook_requests(), 2);
        assert_eq!(cache.cached_workbooks(), 0);
    }

    #[tokio::test]
    async fn clear_forgets_entries() {
        let client = client();
        let mut cache = MetadataCache::new();

        cache.workbook(&client, "wb-luid").await.unwrap();
        cache.clear();
        cache.workbook(&client, "wb-luid").await.unwrap();

        assert_eq!(client.workbook_requests(), 2);
    }
}
