//! SQL text normalization and model lookup
//!
//! This is deliberately not a SQL parser. A model is considered referenced
//! when its normalized relation name occurs anywhere in the normalized query
//! text, so comments and formatting need no special handling.
//!
//! There is no word-boundary check: `db.public.orders` is also found inside
//! `db.public.orders_archive`. Callers that need strict matching must
//! post-filter the results.

use crate::model::{KnownModel, KnownModels};
use std::collections::BTreeMap;

/// Lower-case the text and strip double and single quotes.
///
/// Nothing else is touched: whitespace and comments are preserved.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['"', '\''], "")
}

/// Find every known model whose relation name occurs in `query`.
///
/// Returns a map from normalized relation name to the model. An empty map
/// means nothing was found; this never fails.
pub fn search_models_in_query(query: &str, models: &KnownModels) -> BTreeMap<String, KnownModel> {
    let query = normalize(query);

    if query.is_empty() {
        return BTreeMap::new();
    }

    models
        .iter()
        .filter(|(name, _)| !name.is_empty() && query.contains(name))
        .map(|(name, model)| (name.to_string(), model.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn models() -> KnownModels {
        vec![
            KnownModel::new("model.mart.ride", "mart.core.ride", "model"),
            KnownModel::new("model.mart.task", "mart.tasks.task", "model"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn normalize_lowercases_and_strips_quotes() {
        assert_eq!(normalize(r#"SELECT * FROM "MART"."CORE".'RIDE'"#), "select * from mart.core.ride");
        assert_eq!(normalize("a  b\n-- c"), "a  b\n-- c");
    }

    #[test]
    fn finds_quoted_uppercase_reference_after_comment() {
        let query = r#"//comment SELECT * FROM "MART"."CORE"."RIDE""#;

        let found = search_models_in_query(query, &models());

        assert_eq!(found.keys().collect::<Vec<_>>(), vec!["mart.core.ride"]);
        assert_eq!(found["mart.core.ride"].unique_id, "model.mart.ride");
    }

    #[test]
    fn finds_multiple_models() {
        let query = "select * from mart.core.ride r join MART.TASKS.TASK t on r.id = t.ride_id";

        let found = search_models_in_query(query, &models());

        assert_eq!(found.len(), 2);
    }

    #[test]
    fn unknown_tables_yield_nothing() {
        assert!(search_models_in_query("select * from foo_db.some_schema.random_table", &models()).is_empty());
        assert!(search_models_in_query("", &models()).is_empty());
        assert!(search_models_in_query("select 1", &KnownModels::new()).is_empty());
    }

    #[test]
    fn matches_are_a_subset_of_known_models() {
        let models = models();
        let found = search_models_in_query("mart.core.ride mart.core.ride mart.other.thing", &models);

        for (name, model) in &found {
            assert_eq!(models.get(name), Some(model));
        }
    }

    /// Known limitation: no word boundaries, so a longer relation name that
    /// starts with a known one is reported as a reference to it.
    #[test]
    fn prefix_of_longer_identifier_is_matched() {
        let found = search_models_in_query("select * from mart.core.ride_archive", &models());

        assert_eq!(found.keys().collect::<Vec<_>>(), vec!["mart.core.ride"]);
    }
}
