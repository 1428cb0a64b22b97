//! Structured query DSL executed by the catalog store port.
//!
//! A [`StructuredQuery`] is a conjunction of filter [`Clause`]s plus paging
//! and sorting. It is deliberately small: exact terms, any-of terms, field
//! existence, integer ranges, case-insensitive substring matching, and a
//! disjunction wrapper. Field names are dotted paths into the stored
//! document source (e.g. `schemaEntityType.name`).
//!
//! The evaluation helpers ([`Clause::matches`], [`compare_for_sort`]) define
//! the reference semantics used by the in-memory store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A single filter clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Field equals the value (any element, for array fields).
    Term {
        /// Dotted field path.
        field: String,
        /// Expected value.
        value: Value,
    },
    /// Field equals any of the values.
    Terms {
        /// Dotted field path.
        field: String,
        /// Accepted values.
        values: Vec<Value>,
    },
    /// Field is present and not null.
    Exists {
        /// Dotted field path.
        field: String,
    },
    /// Integer field lies within the inclusive bounds.
    Range {
        /// Dotted field path.
        field: String,
        /// Inclusive lower bound.
        gte: Option<i64>,
        /// Inclusive upper bound.
        lte: Option<i64>,
    },
    /// Any of the string fields contains the text, ignoring case.
    Contains {
        /// Dotted field paths searched.
        fields: Vec<String>,
        /// Needle.
        text: String,
    },
    /// At least one nested clause matches.
    AnyOf(Vec<Clause>),
}

impl Clause {
    /// Creates an exact-match clause on a string value.
    #[must_use]
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Term {
            field: field.into(),
            value: Value::String(value.into()),
        }
    }

    /// Creates an any-of clause on string values.
    #[must_use]
    pub fn terms<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Terms {
            field: field.into(),
            values: values.into_iter().map(|v| Value::String(v.into())).collect(),
        }
    }

    /// Creates an existence clause.
    #[must_use]
    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
        }
    }

    /// Returns true if the document source satisfies this clause.
    #[must_use]
    pub fn matches(&self, source: &Value) -> bool {
        match self {
            Self::Term { field, value } => field_values(source, field).any(|v| v == value),
            Self::Terms { field, values } => {
                field_values(source, field).any(|v| values.iter().any(|want| want == v))
            }
            Self::Exists { field } => field_values(source, field).next().is_some(),
            Self::Range { field, gte, lte } => field_values(source, field)
                .filter_map(Value::as_i64)
                .any(|n| gte.is_none_or(|lo| n >= lo) && lte.is_none_or(|hi| n <= hi)),
            Self::Contains { fields, text } => {
                let needle = text.to_lowercase();
                fields.iter().any(|field| {
                    field_values(source, field)
                        .filter_map(Value::as_str)
                        .any(|s| s.to_lowercase().contains(&needle))
                })
            }
            Self::AnyOf(clauses) => clauses.iter().any(|c| c.matches(source)),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(Error::InvalidInput(format!(
                "sort order must be asc or desc (got {other})"
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Sort key and direction.
///
/// `fields` lists candidate paths; the first one present in a document is
/// its sort key. This lets a logical field such as a payload name resolve
/// under whichever type tag the document carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Candidate field paths, in priority order.
    pub fields: Vec<String>,
    /// Direction.
    pub order: SortOrder,
}

impl SortSpec {
    /// Returns the sort key for a document source.
    #[must_use]
    pub fn key<'a>(&self, source: &'a Value) -> Option<&'a Value> {
        self.fields
            .iter()
            .find_map(|field| field_values(source, field).next())
    }
}

/// A conjunctive filter query with paging and optional sorting.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructuredQuery {
    /// Clauses that must all match.
    pub filters: Vec<Clause>,
    /// Zero-based offset into the sorted result.
    pub from: usize,
    /// Maximum number of hits to return.
    pub size: usize,
    /// Optional sort; `None` means store-default order.
    pub sort: Option<SortSpec>,
}

impl StructuredQuery {
    /// Returns true if the document source matches every filter.
    #[must_use]
    pub fn matches(&self, source: &Value) -> bool {
        self.filters.iter().all(|c| c.matches(source))
    }
}

/// Precision of a reported hit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TotalHitRelation {
    /// The count is exact.
    #[default]
    EqualTo,
    /// The count is a lower bound.
    GreaterThanOrEqualTo,
}

impl TotalHitRelation {
    /// Stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EqualTo => "eq",
            Self::GreaterThanOrEqualTo => "gte",
        }
    }

    /// Parses the wire name.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Self::EqualTo),
            "gte" => Some(Self::GreaterThanOrEqualTo),
            _ => None,
        }
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Document id.
    pub id: String,
    /// Stored document source.
    pub source: Value,
}

/// Raw search output from the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchHits {
    /// Returned page of hits.
    pub hits: Vec<SearchHit>,
    /// Total number of matches (see `relation`).
    pub total_hits: u64,
    /// Whether `total_hits` is exact.
    pub relation: TotalHitRelation,
}

/// Iterates the values at a dotted path, flattening arrays and skipping nulls.
pub fn field_values<'a>(source: &'a Value, path: &str) -> impl Iterator<Item = &'a Value> {
    let found = path
        .split('.')
        .try_fold(source, |node, segment| node.as_object()?.get(segment));
    let values: Vec<&Value> = match found {
        Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(value) => vec![value],
    };
    values.into_iter()
}

/// Orders two sort keys. Missing keys sort last regardless of direction.
#[must_use]
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>, order: SortOrder) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ord = compare_values(a, b);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x
                .as_f64()
                .unwrap_or_default()
                .total_cmp(&y.as_f64().unwrap_or_default()),
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "tenant": "acme",
            "access": ["User:alice", "Role:reader"],
            "lastUpdatedTimeMs": 1_638_482_208_790_i64,
            "schemaEntityType": {"name": "Author", "catalog": ["books", "people"]}
        })
    }

    #[test]
    fn term_matches_scalar_and_array_fields() {
        assert!(Clause::term("tenant", "acme").matches(&doc()));
        assert!(!Clause::term("tenant", "other").matches(&doc()));
        assert!(Clause::term("schemaEntityType.catalog", "people").matches(&doc()));
    }

    #[test]
    fn terms_is_any_overlap() {
        assert!(Clause::terms("access", ["Role:writer", "Role:reader"]).matches(&doc()));
        assert!(!Clause::terms("access", ["Role:writer"]).matches(&doc()));
    }

    #[test]
    fn exists_and_any_of() {
        let either = Clause::AnyOf(vec![
            Clause::exists("indexProvider"),
            Clause::exists("schemaEntityType"),
        ]);
        assert!(either.matches(&doc()));
        assert!(!Clause::exists("ontology").matches(&doc()));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let clause = Clause::Range {
            field: "lastUpdatedTimeMs".into(),
            gte: Some(1_638_482_208_790),
            lte: None,
        };
        assert!(clause.matches(&doc()));
        let clause = Clause::Range {
            field: "lastUpdatedTimeMs".into(),
            gte: None,
            lte: Some(1_638_482_208_789),
        };
        assert!(!clause.matches(&doc()));
    }

    #[test]
    fn contains_ignores_case() {
        let clause = Clause::Contains {
            fields: vec!["schemaEntityType.name".into()],
            text: "auth".into(),
        };
        assert!(clause.matches(&doc()));
    }

    #[test]
    fn sort_order_parses_case_insensitively() {
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_eq!("Asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn missing_sort_keys_go_last() {
        let one = json!(1);
        assert_eq!(
            compare_for_sort(None, Some(&one), SortOrder::Desc),
            Ordering::Greater
        );
        assert_eq!(
            compare_for_sort(Some(&one), None, SortOrder::Asc),
            Ordering::Less
        );
    }
}
