//! Tableau REST API and Metadata API client
//!
//! Signs in lazily on the first request, keeps the session token for the
//! rest of the run, and signs out on [`TableauClient::sign_out`].
//!
//! Reference: https://help.tableau.com/current/api/rest_api/en-us/REST/rest_api.htm

use crate::client::{ClientError, TableauClient};
use async_trait::async_trait;
use exposurescrawler_core::{Credentials, TableauConfig, UserDetails, WorkbookDetails};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

const AUTH_HEADER: &str = "X-Tableau-Auth";

#[derive(Debug, Clone)]
struct Session {
    token: String,
    site_id: String,
}

pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    site: String,
    credentials: Credentials,
    session: Mutex<Option<Session>>,
}

#[derive(Deserialize)]
struct SignInResponse {
    credentials: SignInCredentials,
}

#[derive(Deserialize)]
struct SignInCredentials {
    token: String,
    site: SignInSite,
}

#[derive(Deserialize)]
struct SignInSite {
    id: String,
}

#[derive(Deserialize)]
struct WorkbookResponse {
    workbook: RawWorkbook,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWorkbook {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    webpage_url: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    updated_at: String,
    project: RawProject,
    owner: RawOwner,
    #[serde(default)]
    tags: RawTags,
}

#[derive(Deserialize)]
struct RawProject {
    name: String,
}

#[derive(Deserialize)]
struct RawOwner {
    id: String,
}

#[derive(Default, Deserialize)]
struct RawTags {
    #[serde(default)]
    tag: Vec<RawTag>,
}

#[derive(Deserialize)]
struct RawTag {
    label: String,
}

impl From<RawWorkbook> for WorkbookDetails {
    fn from(raw: RawWorkbook) -> Self {
        WorkbookDetails {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            webpage_url: raw.webpage_url,
            owner_id: raw.owner.id,
            project_name: raw.project.name,
            tags: raw.tags.tag.into_iter().map(|t| t.label).collect(),
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct UserResponse {
    user: RawUser,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    id: String,
    name: String,
    #[serde(default)]
    full_name: Option<String>,
}

impl From<RawUser> for UserDetails {
    fn from(raw: RawUser) -> Self {
        UserDetails {
            fullname: raw.full_name.unwrap_or_default(),
            id: raw.id,
            name: raw.name,
        }
    }
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

impl RestClient {
    /// Create a client for the server and site in `config`. No request is made yet.
    pub fn new(config: &TableauConfig, credentials: Credentials) -> Result<Self, ClientError> {
        let base_url = config
            .base_url()
            .map_err(|e| ClientError::ConfigError(e.to_string()))?
            .to_string();

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_version: config.api_version.clone(),
            site: config.site.clone(),
            credentials,
            session: Mutex::new(None),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, self.api_version, path)
    }

    fn sign_in_body(&self) -> Value {
        let site = json!({ "contentUrl": self.site });
        match &self.credentials {
            Credentials::Password { username, password } => json!({
                "credentials": { "name": username, "password": password, "site": site }
            }),
            Credentials::PersonalAccessToken { name, secret } => json!({
                "credentials": {
                    "personalAccessTokenName": name,
                    "personalAccessTokenSecret": secret,
                    "site": site
                }
            }),
        }
    }

    async fn sign_in(&self) -> Result<Session, ClientError> {
        debug!(server = %self.base_url, site = %self.site, "signing in to Tableau");

        let request = self.http.post(self.api_url("auth/signin")).json(&self.sign_in_body());
        let response: SignInResponse = send_json(request).await.map_err(|e| match e {
            ClientError::RequestError(msg) | ClientError::NotFound(msg) => ClientError::AuthenticationError(msg),
            other => other,
        })?;

        Ok(Session {
            token: response.credentials.token,
            site_id: response.credentials.site.id,
        })
    }

    async fn session(&self) -> Result<Session, ClientError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let session = self.sign_in().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn get_site_resource<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let session = self.session().await?;
        let url = self.api_url(&format!("sites/{}/{}", session.site_id, path));

        send_json(self.http.get(url).header(AUTH_HEADER, &session.token)).await
    }
}

/// Send a request expecting a JSON body, mapping HTTP failures to `ClientError`
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| ClientError::NetworkError(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::AuthenticationError(body),
            StatusCode::NOT_FOUND => ClientError::NotFound(body),
            _ => ClientError::RequestError(format!("{}: {}", status, body)),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

#[async_trait]
impl TableauClient for RestClient {
    fn name(&self) -> &'static str {
        "Tableau REST"
    }

    async fn retrieve_workbook(&self, workbook_id: &str) -> Result<WorkbookDetails, ClientError> {
        let response: WorkbookResponse = self.get_site_resource(&format!("workbooks/{}", workbook_id)).await?;
        Ok(response.workbook.into())
    }

    async fn retrieve_user(&self, user_id: &str) -> Result<UserDetails, ClientError> {
        let response: UserResponse = self.get_site_resource(&format!("users/{}", user_id)).await?;
        Ok(response.user.into())
    }

    async fn run_metadata_query(&self, query: &str, variables: Value) -> Result<Value, ClientError> {
        let session = self.session().await?;
        let url = format!("{}/api/metadata/graphql", self.base_url);

        let request = self
            .http
            .post(url)
            .header(AUTH_HEADER, &session.token)
            .json(&json!({ "query": query, "variables": variables }));
        let response: GraphQlResponse = send_json(request).await?;

        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(ClientError::GraphQlError(messages.join("; ")));
        }

        response
            .data
            .ok_or_else(|| ClientError::InvalidResponse("Metadata API response has no data".to_string()))
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };

        debug!("signing out of Tableau");

        let response = self
            .http
            .post(self.api_url("auth/signout"))
            .header(AUTH_HEADER, &session.token)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClientError::RequestError(format!("sign out failed: {}", response.status())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exposurescrawler_core::LoginMethod;

    fn config() -> TableauConfig {
        TableauConfig {
            url: Some("https://tableau.example.com/".to_string()),
            site: "analytics".to_string(),
            login_method: LoginMethod::PersonalAccessToken,
            ..TableauConfig::default()
        }
    }

    #[test]
    fn requires_base_url() {
        let result = RestClient::new(
            &TableauConfig::default(),
            Credentials::Password {
                username: "u".into(),
                password: "p".into(),
            },
        );
        assert!(matches!(result, Err(ClientError::ConfigError(_))));
    }

    #[test]
    fn builds_api_urls() {
        let client = RestClient::new(
            &config(),
            Credentials::PersonalAccessToken {
                name: "ci".into(),
                secret: "s3cret".into(),
            },
        )
        .unwrap();

        assert_eq!(client.api_url("auth/signin"), "https://tableau.example.com/api/3.15/auth/signin");
    }

    #[test]
    fn sign_in_body_per_login_method() {
        let pat = RestClient::new(
            &config(),
            Credentials::PersonalAccessToken {
                name: "ci".into(),
                secret: "s3cret".into(),
            },
        )
        .unwrap();
        assert_eq!(
            pat.sign_in_body(),
            json!({"credentials": {
                "personalAccessTokenName": "ci",
                "personalAccessTokenSecret": "s3cret",
                "site": {"contentUrl": "analytics"}
            }})
        );

        let password = RestClient::new(
            &config(),
            Credentials::Password {
                username: "bot".into(),
                password: "pw".into(),
            },
        )
        .unwrap();
        assert_eq!(
            password.sign_in_body(),
            json!({"credentials": {"name": "bot", "password": "pw", "site": {"contentUrl": "analytics"}}})
        );
    }

    #[test]
    fn workbook_payload_conversion() {
        let response: WorkbookResponse = serde_json::from_value(json!({
            "workbook": {
                "id": "ccc",
                "name": "Orders workbook",
                "description": "Workbook description",
                "webpageUrl": "http://hostname/#/workbooks/42",
                "createdAt": "2021-06-01T10:00:00Z",
                "updatedAt": "2021-07-01T10:00:00Z",
                "project": {"id": "p1", "name": "A Tableau folder"},
                "owner": {"id": "owner-id"},
                "tags": {"tag": [{"label": "certified"}, {"label": "finance"}]}
            }
        }))
        .unwrap();

        let workbook: WorkbookDetails = response.workbook.into();

        assert_eq!(workbook.owner_id, "owner-id");
        assert_eq!(workbook.project_name, "A Tableau folder");
        assert_eq!(workbook.tags, vec!["certified", "finance"]);
        assert_eq!(workbook.created_at, "2021-06-01T10:00:00Z");
    }

    #[test]
    fn empty_tags_object() {
        let response: WorkbookResponse = serde_json::from_value(json!({
            "workbook": {
                "id": "a", "name": "A", "webpageUrl": "http://h/x",
                "project": {"name": "P"}, "owner": {"id": "o"}, "tags": {}
            }
        }))
        .unwrap();

        let workbook: WorkbookDetails = response.workbook.into();
        assert!(workbook.tags.is_empty());
        assert_eq!(workbook.description, None);
    }

    #[test]
    fn user_payload_conversion() {
        let response: UserResponse = serde_json::from_value(json!({
            "user": {"id": "u1", "name": "john.doe@example.com", "fullName": "John Doe", "siteRole": "Viewer"}
        }))
        .unwrap();

        let user: UserDetails = response.user.into();
        assert_eq!(user.fullname, "John Doe");
        assert_eq!(user.name, "john.doe@example.com");
    }

    #[test]
    fn user_without_full_name_keeps_it_empty() {
        let response: UserResponse = serde_json::from_value(json!({
            "user": {"id": "u1", "name": "john.doe@example.com"}
        }))
        .unwrap();

        let user: UserDetails = response.user.into();
        assert_eq!(user.fullname, "");
        assert_eq!(user.name, "john.doe@example.com");
    }

    #[test]
    fn graphql_errors_are_collected() {
        let response: GraphQlResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [{"message": "Field 'foo' not found"}]
        }))
        .unwrap();

        assert!(response.data.is_none());
        assert_eq!(response.errors[0].message, "Field 'foo' not found");
    }
}
