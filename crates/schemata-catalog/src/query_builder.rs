//! Search request to structured query, and raw hits back to documents.
//!
//! Clauses are conjunctive. The tenant clause is always present; the access
//! clause only when the caller has access tokens to match; the type clause
//! only when types were requested. Free-form filters must be on the
//! allow-list below, anything else is rejected.

use std::collections::BTreeMap;

use schemata_core::{Clause, SearchHits, SortOrder, SortSpec, StructuredQuery, TenantId};

use crate::error::{CatalogError, Result};
use crate::model::document::{
    ACCESS_FIELD, CREATED_TIME_FIELD, CatalogDocument, TENANT_FIELD, UPDATED_TIME_FIELD,
};
use crate::model::object_type::ObjectType;
use crate::model::search_result::SearchResult;

/// Filter on the payload name.
pub const NAME_FILTER: &str = "name";
/// Filter on the payload description.
pub const DESCRIPTION_FILTER: &str = "description";
/// Filter on the payload sub-type label.
pub const TYPE_FILTER: &str = "type";
/// Filter on catalog membership.
pub const CATALOG_FILTER: &str = "catalog";
/// Case-insensitive substring match over name, description, and content.
pub const QUERY_FILTER: &str = "query";

/// Filter keys accepted in [`SearchRequest::filters`].
pub const ALLOWED_FILTERS: [&str; 7] = [
    NAME_FILTER,
    DESCRIPTION_FILTER,
    TYPE_FILTER,
    CATALOG_FILTER,
    CREATED_TIME_FIELD,
    UPDATED_TIME_FIELD,
    QUERY_FILTER,
];

/// Sort fields accepted in [`SearchRequest::sort_field`].
pub const ALLOWED_SORT_FIELDS: [&str; 4] =
    [CREATED_TIME_FIELD, UPDATED_TIME_FIELD, TENANT_FIELD, NAME_FILTER];

const QUERY_FIELDS: [&str; 3] = ["name", "description", "content"];

/// A typed search over catalog documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Zero-based offset of the first result.
    pub from_index: usize,
    /// Page size; `None` uses the configured default.
    pub max_items: Option<usize>,
    /// Types to include; empty means all.
    pub types: Vec<ObjectType>,
    /// Field to sort by; `None` keeps store order.
    pub sort_field: Option<String>,
    /// Sort direction; ascending when unset.
    pub sort_order: Option<SortOrder>,
    /// Allow-listed filters, keyed by filter name.
    pub filters: BTreeMap<String, String>,
}

impl SearchRequest {
    /// Restricts the search to the given types.
    #[must_use]
    pub fn with_types(mut self, types: impl IntoIterator<Item = ObjectType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    /// Adds a filter.
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    /// Sets the sort.
    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field = Some(field.into());
        self.sort_order = Some(order);
        self
    }

    /// Sets paging.
    #[must_use]
    pub fn with_page(mut self, from_index: usize, max_items: usize) -> Self {
        self.from_index = from_index;
        self.max_items = Some(max_items);
        self
    }

    fn effective_types(&self) -> Vec<ObjectType> {
        if self.types.is_empty() {
            ObjectType::all().collect()
        } else {
            self.types.clone()
        }
    }
}

/// Who a search runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchScope {
    /// Caller tenant; always filtered on.
    pub tenant: TenantId,
    /// Caller access tokens; empty means no access clause.
    pub access: Vec<String>,
}

/// Builds the structured query for a search.
///
/// # Errors
///
/// Returns `UnrecognizedFilter` for filter keys off the allow-list and
/// `InvalidRequest` for unparseable filter values or unsupported sort
/// fields.
pub fn build(
    request: &SearchRequest,
    scope: &SearchScope,
    default_max_items: usize,
) -> Result<StructuredQuery> {
    let types = request.effective_types();
    let mut filters = vec![Clause::term(TENANT_FIELD, scope.tenant.as_str())];

    if !scope.access.is_empty() {
        filters.push(Clause::terms(ACCESS_FIELD, scope.access.iter().cloned()));
    }

    if !request.types.is_empty() {
        filters.push(Clause::AnyOf(
            request
                .types
                .iter()
                .map(|t| Clause::exists(t.tag()))
                .collect(),
        ));
    }

    for (key, value) in &request.filters {
        filters.push(filter_clause(key, value, &types)?);
    }

    let sort = request
        .sort_field
        .as_deref()
        .map(|field| sort_spec(field, request.sort_order.unwrap_or_default(), &types))
        .transpose()?;

    Ok(StructuredQuery {
        filters,
        from: request.from_index,
        size: request.max_items.unwrap_or(default_max_items),
        sort,
    })
}

fn nested(types: &[ObjectType], field: &str) -> impl Iterator<Item = String> {
    types.iter().map(move |t| format!("{}.{field}", t.tag()))
}

fn filter_clause(key: &str, value: &str, types: &[ObjectType]) -> Result<Clause> {
    match key {
        NAME_FILTER | DESCRIPTION_FILTER | TYPE_FILTER | CATALOG_FILTER => Ok(Clause::AnyOf(
            nested(types, key)
                .map(|field| Clause::term(field, value))
                .collect(),
        )),
        CREATED_TIME_FIELD | UPDATED_TIME_FIELD => {
            let (gte, lte) = parse_range(key, value)?;
            Ok(Clause::Range {
                field: key.to_string(),
                gte,
                lte,
            })
        }
        QUERY_FILTER => Ok(Clause::Contains {
            fields: QUERY_FIELDS
                .into_iter()
                .flat_map(|field| nested(types, field))
                .collect(),
            text: value.to_string(),
        }),
        other => Err(CatalogError::UnrecognizedFilter {
            key: other.to_string(),
        }),
    }
}

/// Parses `from..to` (either bound optional) or an exact value.
fn parse_range(key: &str, value: &str) -> Result<(Option<i64>, Option<i64>)> {
    let parse = |bound: &str| -> Result<Option<i64>> {
        let bound = bound.trim();
        if bound.is_empty() {
            return Ok(None);
        }
        bound.parse::<i64>().map(Some).map_err(|e| {
            CatalogError::invalid_request(format!("{key}: invalid bound {bound:?}: {e}"))
        })
    };

    match value.split_once("..") {
        Some((from, to)) => {
            let range = (parse(from)?, parse(to)?);
            if let (Some(lo), Some(hi)) = range {
                if lo > hi {
                    return Err(CatalogError::invalid_request(format!(
                        "{key}: range start {lo} is after end {hi}"
                    )));
                }
            }
            Ok(range)
        }
        None => {
            let exact = parse(value)?.ok_or_else(|| {
                CatalogError::invalid_request(format!("{key}: empty filter value"))
            })?;
            Ok((Some(exact), Some(exact)))
        }
    }
}

fn sort_spec(field: &str, order: SortOrder, types: &[ObjectType]) -> Result<SortSpec> {
    let fields = match field {
        CREATED_TIME_FIELD | UPDATED_TIME_FIELD | TENANT_FIELD => vec![field.to_string()],
        NAME_FILTER => nested(types, NAME_FILTER).collect(),
        other => {
            return Err(CatalogError::invalid_request(format!(
                "unsupported sort field {other}; expected one of {}",
                ALLOWED_SORT_FIELDS.join(", ")
            )));
        }
    };
    Ok(SortSpec { fields, order })
}

/// Turns raw store hits into a search result.
///
/// # Errors
///
/// Returns a decode error if any hit is not a valid catalog document.
pub fn reshape(hits: SearchHits, request: &SearchRequest) -> Result<SearchResult> {
    let objects = hits
        .hits
        .into_iter()
        .map(|hit| CatalogDocument::from_structured(&hit.source, Some(&hit.id)))
        .collect::<Result<Vec<_>>>()?;
    Ok(SearchResult {
        start_index: request.from_index as u64,
        total_hits: hits.total_hits,
        total_hit_relation: hits.relation,
        objects,
    })
}
