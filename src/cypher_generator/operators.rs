//! Operator translation table.
//!
//! Maps the builder-facing comparison operators to their Cypher
//! equivalents. Pattern-match operators translate to regex matching;
//! case-insensitive matching is handled by the predicate compiler, which
//! prepends `(?i)` to the bound pattern.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref OPERATOR_MAP: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("=", "=");
        m.insert("==", "=");
        m.insert("<", "<");
        m.insert(">", ">");
        m.insert("<=", "<=");
        m.insert(">=", ">=");
        m.insert("!=", "<>");
        m.insert("<>", "<>");
        m.insert("like", "=~");
        m.insert("ilike", "=~");
        m.insert("=~", "=~");
        m.insert("starts with", "STARTS WITH");
        m.insert("ends with", "ENDS WITH");
        m.insert("contains", "CONTAINS");
        m
    };
}

/// Operators whose compiled form wraps the comparison in `NOT (...)`
pub fn is_negated_operator(operator: &str) -> bool {
    matches!(
        operator.to_lowercase().as_str(),
        "not like" | "not ilike" | "!~"
    )
}

/// Operators that match against the bound pattern case-insensitively
pub fn is_case_insensitive_operator(operator: &str) -> bool {
    matches!(operator.to_lowercase().as_str(), "ilike" | "not ilike")
}

/// Translate a builder operator to Cypher. Negated pattern operators
/// translate to their positive form; the caller adds the `NOT` wrapper.
pub fn translate_operator(operator: &str) -> Option<&'static str> {
    let lower = operator.to_lowercase();
    let lookup = match lower.as_str() {
        "not like" | "not ilike" | "!~" => "like",
        other => other,
    };
    OPERATOR_MAP.get(lookup).copied()
}
