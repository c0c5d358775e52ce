//! Configuration schema (exposurescrawler.toml)
//!
//! Non-secret settings come from the TOML file. The environment overrides
//! them, and is the only source of credentials.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How to authenticate against Tableau
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMethod {
    /// Username and password
    Credentials,

    /// Personal access token name and secret
    PersonalAccessToken,
}

impl Default for LoginMethod {
    fn default() -> Self {
        Self::Credentials
    }
}

impl std::str::FromStr for LoginMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credentials" => Ok(LoginMethod::Credentials),
            "personal_access_token" => Ok(LoginMethod::PersonalAccessToken),
            other => Err(ConfigError::InvalidLoginMethod(other.to_string())),
        }
    }
}

/// Tableau connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableauConfig {
    /// Base URL of the Tableau server, without trailing slash.
    /// Also used to rewrite workbook URLs.
    #[serde(default)]
    pub url: Option<String>,

    /// Site content URL ("" is the default site)
    #[serde(default)]
    pub site: String,

    /// REST API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Only tables from data connections of this type are considered
    #[serde(default = "default_connection_type")]
    pub connection_type: String,

    #[serde(default)]
    pub login_method: LoginMethod,

    /// Page size for Metadata API queries
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_api_version() -> String {
    "3.15".to_string()
}

fn default_connection_type() -> String {
    "snowflake".to_string()
}

fn default_page_size() -> u32 {
    100
}

impl Default for TableauConfig {
    fn default() -> Self {
        Self {
            url: None,
            site: String::new(),
            api_version: default_api_version(),
            connection_type: default_connection_type(),
            login_method: LoginMethod::default(),
            page_size: default_page_size(),
        }
    }
}

impl TableauConfig {
    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        match self.url.as_deref().map(|url| url.trim_end_matches('/')) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(ConfigError::MissingValue("TABLEAU_URL".to_string())),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// dbt package the exposures are added to
    #[serde(default)]
    pub dbt_package_name: Option<String>,

    /// Tableau projects (folders) whose workbooks never become exposures
    #[serde(default)]
    pub ignore_projects: Vec<String>,

    #[serde(default)]
    pub tableau: TableauConfig,
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply `TABLEAU_URL`, `TABLEAU_SITE` and `TABLEAU_LOGIN_METHOD` overrides.
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TABLEAU_URL") {
            self.tableau.url = Some(url);
        }
        if let Some(site) = lookup("TABLEAU_SITE") {
            self.tableau.site = site;
        }
        if let Some(method) = lookup("TABLEAU_LOGIN_METHOD") {
            self.tableau.login_method = method.parse()?;
        }
        Ok(())
    }
}

/// Secrets used to sign in to Tableau
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Password { username: String, password: String },
    PersonalAccessToken { name: String, secret: String },
}

impl Credentials {
    /// Read the secrets required by `method` through `lookup`
    pub fn from_lookup<F>(method: LoginMethod, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingValue(key.to_string()));

        match method {
            LoginMethod::Credentials => Ok(Credentials::Password {
                username: required("TABLEAU_USERNAME")?,
                password: required("TABLEAU_PASSWORD")?,
            }),
            LoginMethod::PersonalAccessToken => Ok(Credentials::PersonalAccessToken {
                name: required("TABLEAU_PAT_NAME")?,
                secret: required("TABLEAU_PAT_SECRET")?,
            }),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Credentials::PersonalAccessToken { name, .. } => f
                .debug_struct("PersonalAccessToken")
                .field("name", name)
                .field("secret", &"***")
                .finish(),
        }
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    IoError(String, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingValue(String),

    #[error("login method must be either \"personal_access_token\" or \"credentials\", got \"{0}\"")]
    InvalidLoginMethod(String),
}
