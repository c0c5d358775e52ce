//! dbt exposures built from Tableau workbooks

use exposurescrawler_core::{KnownModel, UserDetails, WorkbookDetails};
use deunicode::deunicode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Prefix of every generated exposure name
pub const NAME_PREFIX: &str = "tableau_";

/// Namespace prepended to every workbook tag
pub const TAG_NAMESPACE: &str = "tableau";

const NO_DESCRIPTION: &str = "*no description*";

/// Length of the workbook id suffix that disambiguates equal names
const ID_SUFFIX_LEN: usize = 3;

static SCHEME_AND_HOST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://[^/]*/").unwrap());
static APOSTROPHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'+").unwrap());
static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Dependencies structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependsOn {
    /// List of node unique_ids this exposure depends on
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Exposure owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub name: String,
    pub email: String,
}

/// A dbt exposure for one dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exposure {
    pub name: String,
    pub package_name: String,

    /// Markdown description
    pub description: String,
    pub url: String,
    pub depends_on: DependsOn,
    pub owner: Owner,

    #[serde(default)]
    pub tags: Vec<String>,

    pub resource_type: String,

    #[serde(rename = "type")]
    pub exposure_type: String,
}

/// Serialized form: the exposure plus its computed unique_id
#[derive(Serialize)]
struct ExposureRecord<'a> {
    #[serde(flatten)]
    exposure: &'a Exposure,
    unique_id: String,
}

impl Exposure {
    /// Build the exposure for a workbook and the models it was found to read.
    ///
    /// `base_url` replaces the scheme and host of the workbook URL.
    /// `models` may contain repeats; `depends_on` will not.
    pub fn from_tableau_workbook(
        package_name: &str,
        base_url: &str,
        workbook: &WorkbookDetails,
        owner: &UserDetails,
        models: &[KnownModel],
    ) -> Result<Self, ExposureError> {
        let url = rewrite_url(&workbook.webpage_url, base_url)?;
        let description = render_description(workbook, &url);

        Ok(Self {
            name: exposure_name(&workbook.name, &workbook.id),
            package_name: package_name.to_string(),
            description,
            url,
            depends_on: DependsOn {
                nodes: unique_ids(models),
            },
            owner: Owner {
                name: owner.fullname.clone(),
                email: owner.name.clone(),
            },
            tags: workbook
                .tags
                .iter()
                .map(|tag| format!("{}:{}", TAG_NAMESPACE, tag))
                .collect(),
            resource_type: "exposure".to_string(),
            exposure_type: "Dashboard".to_string(),
        })
    }

    /// `exposure.<package_name>.<name>`
    pub fn unique_id(&self) -> String {
        format!("exposure.{}.{}", self.package_name, self.name)
    }

    /// JSON record as stored under `exposures` in the manifest
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(ExposureRecord {
            exposure: self,
            unique_id: self.unique_id(),
        })
    }
}

/// `tableau_<slug>_<first 3 chars of the workbook id>`
pub fn exposure_name(workbook_name: &str, workbook_id: &str) -> String {
    let suffix: String = workbook_id.chars().take(ID_SUFFIX_LEN).collect();
    format!("{}{}_{}", NAME_PREFIX, slugify(workbook_name, "_"), suffix)
}

/// Lower-case ASCII slug.
///
/// Letters are transliterated (`Café` -> `cafe`), apostrophes split words,
/// commas between digits are dropped (`1,000` -> `1000`) and every other
/// run of non-alphanumeric characters becomes one `separator`. No leading
/// or trailing separator.
pub fn slugify(text: &str, separator: &str) -> String {
    let split_on_apostrophes = APOSTROPHES.replace_all(text, "-");
    let ascii = deunicode(&split_on_apostrophes).to_lowercase();
    // transliteration can introduce new apostrophes, those are dropped
    let ascii = APOSTROPHES.replace_all(&ascii, "");
    let joined = drop_digit_group_commas(&ascii);

    NON_ALPHANUMERIC
        .split(&joined)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn drop_digit_group_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let between_digits = |i: usize| {
        i > 0 && chars[i - 1].is_ascii_digit() && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
    };

    chars
        .iter()
        .enumerate()
        .filter(|&(i, &c)| !(c == ',' && between_digits(i)))
        .map(|(_, &c)| c)
        .collect()
}

/// Replace `http(s)://host/` with `base_url/`, keeping the path.
///
/// `base_url` is expected without a trailing slash; one is trimmed if present.
pub fn rewrite_url(webpage_url: &str, base_url: &str) -> Result<String, ExposureError> {
    let base_url = base_url.trim_end_matches('/');
    if base_url.is_empty() {
        return Err(ExposureError::MissingBaseUrl);
    }

    let host = SCHEME_AND_HOST
        .find(webpage_url)
        .ok_or_else(|| ExposureError::MalformedUrl(webpage_url.to_string()))?;

    Ok(format!("{}/{}", base_url, &webpage_url[host.end()..]))
}

/// Markdown description; timestamps are inserted verbatim
pub fn render_description(workbook: &WorkbookDetails, url: &str) -> String {
    let description = workbook
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(NO_DESCRIPTION);

    format!(
        "# {project} / {name}\n\
         {description}\n\
         \n\
         **Access**: [Link to Tableau]({url})\n\
         \n\
         **Created at**: {created_at}\n\
         \n\
         **Last updated at**: {updated_at}\n",
        project = workbook.project_name,
        name = workbook.name,
        description = description,
        url = url,
        created_at = workbook.created_at,
        updated_at = workbook.updated_at,
    )
}

/// Distinct unique_ids of `models`, sorted
pub fn unique_ids(models: &[KnownModel]) -> Vec<String> {
    models
        .iter()
        .map(|model| model.unique_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Exposure construction errors
#[derive(Debug, thiserror::Error)]
pub enum ExposureError {
    #[error("Tableau base URL is not configured (set TABLEAU_URL)")]
    MissingBaseUrl,

    #[error("Workbook URL is not an http(s) URL with a path: {0}")]
    MalformedUrl(String),
}
