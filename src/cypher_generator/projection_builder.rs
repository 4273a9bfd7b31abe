//! RETURN, ORDER BY and pagination clause construction.
//!
//! Result keys cannot contain dots, so dotted column references are
//! sanitized when aliased. Raw projection and order expressions get bare
//! columns auto-prefixed with the base alias unless already qualified.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::query_model::{OrderEntry, QueryState, ReturnItem};

use super::alias_resolver::AliasResolver;
use super::bindings::sanitize_param_name;
use super::pattern_builder::CompiledPatterns;

lazy_static! {
    static ref BARE_IDENT: Regex =
        Regex::new(r"(^|[^\w.$])(?P<ident>[A-Za-z_][A-Za-z0-9_]*)").expect("valid regex");
    static ref KEYWORDS: HashSet<&'static str> = [
        "AS", "AND", "OR", "NOT", "NULL", "TRUE", "FALSE", "ASC", "DESC", "DISTINCT", "IN",
        "IS", "CASE", "WHEN", "THEN", "ELSE", "END", "STARTS", "ENDS", "CONTAINS", "EXISTS",
        "MATCH", "WHERE", "RETURN", "WITH",
    ]
    .into_iter()
    .collect();
}

/// Prefix bare column identifiers in a raw expression with `alias.`.
///
/// Function names (identifier followed by an opening paren), already
/// qualified references, parameters, keywords, and single-quoted string
/// literals are left untouched.
pub fn prefix_bare_columns(expr: &str, alias: &str) -> String {
    let mut result = String::new();
    for (i, segment) in expr.split('\'').enumerate() {
        if i > 0 {
            result.push('\'');
        }
        if i % 2 == 0 {
            result.push_str(&prefix_segment(segment, alias));
        } else {
            result.push_str(segment);
        }
    }
    result
}

fn prefix_segment(segment: &str, alias: &str) -> String {
    let mut out = String::new();
    let mut last = 0;
    for caps in BARE_IDENT.captures_iter(segment) {
        let m = caps.name("ident").expect("ident group always present");
        out.push_str(&segment[last..m.start()]);
        let ident = m.as_str();
        let tail = &segment[m.end()..];
        let is_call = tail.trim_start().starts_with('(');
        let qualified = tail.starts_with('.');
        // The identifier after AS is a result alias, not a column
        let before = segment[..m.start()].trim_end().to_uppercase();
        let is_alias_target = before.ends_with(" AS") || before == "AS";
        if is_call
            || qualified
            || is_alias_target
            || KEYWORDS.contains(ident.to_uppercase().as_str())
        {
            out.push_str(ident);
        } else {
            out.push_str(alias);
            out.push('.');
            out.push_str(ident);
        }
        last = m.end();
    }
    out.push_str(&segment[last..]);
    out
}

/// Build the RETURN item list (before any aggregate annotations).
///
/// No explicit columns projects every matched entity. Specific columns are
/// aliased back to their original (sanitized) names whenever the whole
/// entity is not simultaneously projected, to keep result keys unambiguous.
pub fn build_return_items(
    state: &QueryState,
    resolver: &AliasResolver,
    patterns: &CompiledPatterns,
) -> Vec<String> {
    if state.columns.is_empty() {
        return patterns.entity_aliases.clone();
    }

    let has_entity = state
        .columns
        .iter()
        .any(|c| matches!(c, ReturnItem::Entity));

    let mut items = Vec::new();
    for column in &state.columns {
        match column {
            ReturnItem::Entity => items.push(resolver.base_alias().to_string()),
            ReturnItem::Column(reference) => {
                let resolved = resolver.resolve_column(reference);
                if has_entity {
                    items.push(resolved);
                } else {
                    items.push(format!("{} AS {}", resolved, sanitize_param_name(reference)));
                }
            }
            ReturnItem::Raw(expr) => {
                items.push(prefix_bare_columns(expr, resolver.base_alias()));
            }
        }
    }
    items
}

pub fn build_order_clause(state: &QueryState, resolver: &AliasResolver) -> Option<String> {
    if state.orders.is_empty() {
        return None;
    }
    let rendered: Vec<String> = state
        .orders
        .iter()
        .map(|order| match order {
            OrderEntry::Column { column, direction } => format!(
                "{} {}",
                resolver.resolve_column(column),
                direction.keyword()
            ),
            OrderEntry::Raw(expr) => prefix_bare_columns(expr, resolver.base_alias()),
        })
        .collect();
    Some(format!("ORDER BY {}", rendered.join(", ")))
}

/// SKIP and LIMIT are independent optional clauses
pub fn build_pagination_clauses(state: &QueryState) -> Vec<String> {
    let mut clauses = Vec::new();
    if let Some(skip) = state.skip {
        clauses.push(format!("SKIP {}", skip));
    }
    if let Some(limit) = state.limit {
        clauses.push(format!("LIMIT {}", limit));
    }
    clauses
}
