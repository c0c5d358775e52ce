//! dbt manifest.json handling
//!
//! Only the four top-level collections the crawler touches are typed.
//! Everything else, including the contents of every node and source, is
//! kept as raw JSON and written back exactly as it was read.

use crate::exposure::{unique_ids, Exposure};
use exposurescrawler_core::{KnownModel, KnownModels};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// dbt manifest.json structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Model, seed, snapshot and test nodes, untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<BTreeMap<String, Value>>,

    /// Source definitions, untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<BTreeMap<String, Value>>,

    /// Exposure unique_id -> exposure record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposures: Option<BTreeMap<String, Value>>,

    /// Node -> list of parent nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_map: Option<BTreeMap<String, Vec<String>>>,

    /// Every other top-level key (metadata, child_map, macros, ...)
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Manifest {
    /// Load manifest from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse manifest from JSON string
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(json).map_err(|e| ManifestError::ParseError(e.to_string()))
    }

    /// All nodes and sources keyed by their fully qualified warehouse name
    /// (`database.schema.relation`), not by their dbt unique_id.
    ///
    /// Entries without a database or schema are skipped.
    pub fn known_models(&self) -> KnownModels {
        let mut models = KnownModels::new();

        for (id, raw) in self.nodes.iter().flatten() {
            match ManifestNode::deserialize(raw) {
                Ok(node) => match node.materialized_name() {
                    Some(fqn) => {
                        models.insert(KnownModel::new(node.unique_id, fqn, node.resource_type));
                    }
                    None => debug!(node = %id, "node has no relation name, skipping"),
                },
                Err(e) => warn!(node = %id, error = %e, "unreadable manifest node, skipping"),
            }
        }

        for (id, raw) in self.sources.iter().flatten() {
            match ManifestSource::deserialize(raw) {
                Ok(source) => match source.materialized_name() {
                    Some(fqn) => {
                        models.insert(KnownModel::new(source.unique_id, fqn, "source"));
                    }
                    None => debug!(source = %id, "source has no relation name, skipping"),
                },
                Err(e) => warn!(source = %id, error = %e, "unreadable manifest source, skipping"),
            }
        }

        info!(count = models.len(), "Loaded models and sources from manifest");
        models
    }

    /// Insert or overwrite an exposure and its parent edges.
    ///
    /// Keyed by the exposure's unique_id, so re-running over the same
    /// manifest replaces instead of duplicating.
    pub fn add_exposure(&mut self, exposure: &Exposure, found: &[KnownModel]) -> Result<(), ManifestError> {
        let unique_id = exposure.unique_id();
        let record = exposure
            .to_value()
            .map_err(|e| ManifestError::SerializeError(e.to_string()))?;

        self.exposures
            .get_or_insert_with(BTreeMap::new)
            .insert(unique_id.clone(), record);
        self.parent_map
            .get_or_insert_with(BTreeMap::new)
            .insert(unique_id, unique_ids(found));

        Ok(())
    }

    /// Look up an exposure record by unique_id
    pub fn get_exposure(&self, unique_id: &str) -> Option<&Value> {
        self.exposures.as_ref()?.get(unique_id)
    }

    /// Look up the parents recorded for a node or exposure
    pub fn parents(&self, unique_id: &str) -> Option<&[String]> {
        self.parent_map.as_ref()?.get(unique_id).map(Vec::as_slice)
    }

    /// Serialize with sorted keys and 4-space indentation
    pub fn to_json_string(&self) -> Result<String, ManifestError> {
        // Going through Value sorts every object's keys.
        let value = serde_json::to_value(self).map_err(|e| ManifestError::SerializeError(e.to_string()))?;

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        value
            .serialize(&mut serializer)
            .map_err(|e| ManifestError::SerializeError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| ManifestError::SerializeError(e.to_string()))
    }

    /// Save manifest to file
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let json = self.to_json_string()?;

        std::fs::write(path, json)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))
    }
}

/// The fields of a manifest node the crawler reads
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestNode {
    /// Unique identifier (e.g., "model.jaffle_shop.orders")
    pub unique_id: String,

    /// Node name (e.g., "orders")
    #[serde(default)]
    pub name: String,

    /// Resource type (model, test, seed, snapshot, ...)
    #[serde(default)]
    pub resource_type: String,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    /// Alias (output relation name)
    #[serde(default)]
    pub alias: Option<String>,
}

impl ManifestNode {
    /// `database.schema.alias`, falling back to the node name for the relation
    pub fn materialized_name(&self) -> Option<String> {
        let relation = self.alias.as_deref().unwrap_or(&self.name);
        relation_name(self.database.as_deref()?, self.schema.as_deref()?, relation)
    }
}

/// The fields of a manifest source the crawler reads
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestSource {
    /// Unique identifier (e.g., "source.jaffle_shop.raw.orders")
    pub unique_id: String,

    /// Table name (e.g., "orders")
    pub name: String,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    /// Identifier (actual table name)
    #[serde(default)]
    pub identifier: Option<String>,
}

impl ManifestSource {
    /// `database.schema.identifier`, falling back to the source table name
    pub fn materialized_name(&self) -> Option<String> {
        let relation = self.identifier.as_deref().unwrap_or(&self.name);
        relation_name(self.database.as_deref()?, self.schema.as_deref()?, relation)
    }
}

fn relation_name(database: &str, schema: &str, relation: &str) -> Option<String> {
    if database.is_empty() || schema.is_empty() || relation.is_empty() {
        return None;
    }
    Some(format!("{}.{}.{}", database, schema, relation))
}

/// Manifest errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read or write manifest file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse manifest JSON: {0}")]
    ParseError(String),

    #[error("Failed to serialize manifest: {0}")]
    SerializeError(String),
}
