//! Search query DSL for the deployments search endpoint.

use serde::Serialize;
use std::collections::BTreeMap;

use super::types::ResourceKind;

/// Body of a deployments search request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchRequest {
    /// The query to run.
    pub query: Query,
}

/// A query clause.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Boolean combination of clauses.
    Bool(BoolQuery),
    /// Query against a nested document path.
    Nested(NestedQuery),
    /// Full-text match on one field.
    Match(BTreeMap<String, MatchQuery>),
}

/// Boolean query.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BoolQuery {
    /// Clauses of which at least `minimum_should_match` must match.
    pub should: Vec<Query>,
    /// Minimum number of matching `should` clauses.
    pub minimum_should_match: u32,
}

/// Nested query.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NestedQuery {
    /// Path of the nested documents.
    pub path: String,
    /// Query applied to each nested document.
    pub query: Box<Query>,
}

/// Match query parameters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MatchQuery {
    /// Text to match.
    pub query: String,
    /// How the terms of `query` combine.
    pub operator: String,
}

impl SearchRequest {
    /// Builds a query matching any deployment owning a resource with the given id.
    ///
    /// One nested clause is emitted per known resource kind, OR-ed together.
    #[must_use]
    pub fn by_resource_id(resource_id: &str) -> Self {
        let should = ResourceKind::ALL
            .iter()
            .map(|kind| {
                let path = format!("resources.{}", kind.as_str());
                let mut field = BTreeMap::new();
                field.insert(
                    format!("{path}.id"),
                    MatchQuery {
                        query: resource_id.to_string(),
                        operator: String::from("and"),
                    },
                );
                Query::Nested(NestedQuery {
                    path,
                    query: Box::new(Query::Match(field)),
                })
            })
            .collect();

        Self {
            query: Query::Bool(BoolQuery {
                should,
                minimum_should_match: 1,
            }),
        }
    }
}
