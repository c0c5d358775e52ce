//! Known dbt models and sources, keyed by their warehouse relation name

use crate::query::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A dbt node or source that materializes as a warehouse relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownModel {
    /// dbt unique id (e.g., "model.jaffle_shop.orders"), the cross-reference key
    pub unique_id: String,

    /// Fully qualified relation name as declared in the manifest (`database.schema.object`)
    pub materialized_name: String,

    /// Resource type of the originating manifest entry (model, seed, source, ...)
    pub resource_type: String,
}

impl KnownModel {
    pub fn new(
        unique_id: impl Into<String>,
        materialized_name: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            unique_id: unique_id.into(),
            materialized_name: materialized_name.into(),
            resource_type: resource_type.into(),
        }
    }
}

/// Lookup table from normalized fully qualified name to model.
///
/// Built once per run and read-only while matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownModels {
    models: BTreeMap<String, KnownModel>,
}

impl KnownModels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under its normalized materialized name.
    ///
    /// A later model with the same relation name replaces the earlier one.
    pub fn insert(&mut self, model: KnownModel) -> Option<KnownModel> {
        self.models.insert(normalize(&model.materialized_name), model)
    }

    /// Look up a model by fully qualified name (any case, quotes allowed)
    pub fn get(&self, fqn: &str) -> Option<&KnownModel> {
        self.models.get(&normalize(fqn))
    }

    /// Iterate over `(normalized name, model)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &KnownModel)> {
        self.models.iter().map(|(name, model)| (name.as_str(), model))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl FromIterator<KnownModel> for KnownModels {
    fn from_iter<I: IntoIterator<Item = KnownModel>>(iter: I) -> Self {
        let mut models = KnownModels::new();
        for model in iter {
            models.insert(model);
        }
        models
    }
}
