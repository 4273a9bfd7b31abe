//! Predicate compilation.
//!
//! Turns a list of tagged where entries into one boolean expression string
//! plus bound parameters. Entries compile strictly left-to-right, joined by
//! each entry's stored connector; no re-grouping is performed, so precedence
//! between mixed AND/OR sequences is exactly the target language's. A later
//! OR binds only to its immediate neighbor unless the caller inserted an
//! explicitly nested group.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::config::CompilerConfig;
use crate::query_model::WhereEntry;

use super::alias_resolver::AliasResolver;
use super::bindings::Bindings;
use super::errors::CypherGeneratorError;
use super::operators::{is_case_insensitive_operator, is_negated_operator, translate_operator};
use super::subquery_translator;

pub struct PredicateContext<'a> {
    pub resolver: &'a AliasResolver,
    pub config: &'a CompilerConfig,
    /// Correlated-subquery nesting depth, used to derive inner base aliases
    pub depth: usize,
    /// When false, column references render unqualified (HAVING clauses
    /// filter on WITH-stage aliases, not pattern variables)
    pub qualify: bool,
}

impl<'a> PredicateContext<'a> {
    pub fn new(resolver: &'a AliasResolver, config: &'a CompilerConfig) -> Self {
        Self {
            resolver,
            config,
            depth: 0,
            qualify: true,
        }
    }

    pub fn at_depth(resolver: &'a AliasResolver, config: &'a CompilerConfig, depth: usize) -> Self {
        Self {
            resolver,
            config,
            depth,
            qualify: true,
        }
    }

    pub fn unqualified(resolver: &'a AliasResolver, config: &'a CompilerConfig) -> Self {
        Self {
            resolver,
            config,
            depth: 0,
            qualify: false,
        }
    }

    fn column(&self, reference: &str) -> String {
        if self.qualify {
            self.resolver.resolve_column(reference)
        } else {
            reference.to_string()
        }
    }

    /// Compile a where-entry list to a single boolean expression. `None`
    /// means every entry was omitted (e.g. only empty NotIn sets).
    pub fn compile(
        &self,
        entries: &[WhereEntry],
        bindings: &mut Bindings,
    ) -> Result<Option<String>, CypherGeneratorError> {
        let mut expr = String::new();
        for entry in entries {
            let Some(text) = self.compile_entry(entry, bindings)? else {
                continue;
            };
            if expr.is_empty() {
                expr = text;
            } else {
                expr.push(' ');
                expr.push_str(entry.connector().keyword());
                expr.push(' ');
                expr.push_str(&text);
            }
        }
        Ok(if expr.is_empty() { None } else { Some(expr) })
    }

    fn compile_entry(
        &self,
        entry: &WhereEntry,
        bindings: &mut Bindings,
    ) -> Result<Option<String>, CypherGeneratorError> {
        let text = match entry {
            WhereEntry::Basic {
                column,
                operator,
                value,
                ..
            } => self.compile_basic(column, operator, value.as_ref(), bindings)?,

            WhereEntry::In { column, values, .. } => {
                // An empty IN set can never match; short-circuit to a false
                // literal without touching the bindings.
                if values.is_empty() {
                    "false".to_string()
                } else {
                    let param = bindings.add(column, Value::Array(values.clone()));
                    format!("{} IN ${}", self.column(column), param)
                }
            }

            WhereEntry::NotIn { column, values, .. } => {
                // NOT IN over an empty set holds for every row; omit the
                // entry entirely.
                if values.is_empty() {
                    return Ok(None);
                }
                let param = bindings.add(column, Value::Array(values.clone()));
                format!("NOT ({} IN ${})", self.column(column), param)
            }

            WhereEntry::Null { column, .. } => format!("{} IS NULL", self.column(column)),

            WhereEntry::NotNull { column, .. } => {
                format!("{} IS NOT NULL", self.column(column))
            }

            WhereEntry::Between {
                column,
                low,
                high,
                negated,
                ..
            } => {
                let col = self.column(column);
                let low_param = bindings.add(column, low.clone());
                let high_param = bindings.add(column, high.clone());
                let range = format!("({col} >= ${low_param} AND {col} <= ${high_param})");
                if *negated {
                    format!("NOT {}", range)
                } else {
                    range
                }
            }

            WhereEntry::Date {
                column,
                operator,
                value,
                ..
            } => {
                let normalized = normalize_date(value).ok_or_else(|| {
                    CypherGeneratorError::InvalidDateValue {
                        column: column.clone(),
                        value: value.to_string(),
                    }
                })?;
                let op = translate_operator(operator)
                    .ok_or_else(|| CypherGeneratorError::UnsupportedOperator(operator.clone()))?;
                let param = bindings.add(column, Value::String(normalized));
                // Stored timestamps compare on their date prefix only
                format!("substring({}, 0, 10) {} ${}", self.column(column), op, param)
            }

            WhereEntry::Column {
                first,
                operator,
                second,
                ..
            } => {
                let op = translate_operator(operator)
                    .ok_or_else(|| CypherGeneratorError::UnsupportedOperator(operator.clone()))?;
                format!("{} {} {}", self.column(first), op, self.column(second))
            }

            WhereEntry::Raw {
                expr,
                bindings: raw_bindings,
                ..
            } => {
                for (name, value) in raw_bindings {
                    bindings.insert_raw(name, value.clone());
                }
                expr.clone()
            }

            WhereEntry::Exists { query, negated, .. } => {
                let block =
                    super::compile_exists_block(query, self.depth + 1, bindings, self.config)?;
                let block = AliasResolver::rewrite_outer(&block, self.resolver.base_alias());
                if *negated {
                    format!("NOT {}", block)
                } else {
                    block
                }
            }

            WhereEntry::Nested { query, .. } => {
                match self.compile(&query.wheres, bindings)? {
                    Some(inner) => format!("({})", inner),
                    None => return Ok(None),
                }
            }

            WhereEntry::Relationship {
                descriptor,
                operator,
                count,
                constraint,
                ..
            } => {
                let condition = subquery_translator::compile_relationship_condition(
                    descriptor,
                    operator,
                    *count,
                    constraint.as_deref(),
                    bindings,
                    self.config,
                    self.depth,
                )?;
                AliasResolver::rewrite_outer(&condition, self.resolver.base_alias())
            }
        };
        Ok(Some(text))
    }

    fn compile_basic(
        &self,
        column: &str,
        operator: &str,
        value: Option<&Value>,
        bindings: &mut Bindings,
    ) -> Result<String, CypherGeneratorError> {
        let col = self.column(column);
        let Some(value) = value else {
            // Unary form: the operator stands alone after the column
            return Ok(format!("{} {}", col, operator));
        };

        let op = translate_operator(operator)
            .ok_or_else(|| CypherGeneratorError::UnsupportedOperator(operator.to_string()))?;

        let bound = if is_case_insensitive_operator(operator) {
            match value {
                Value::String(s) => Value::String(format!("(?i){}", s)),
                other => other.clone(),
            }
        } else {
            value.clone()
        };

        let param = bindings.add(column, bound);
        let comparison = format!("{} {} ${}", col, op, param);
        if is_negated_operator(operator) {
            Ok(format!("NOT ({})", comparison))
        } else {
            Ok(comparison)
        }
    }
}

/// Normalize a date-like value to `YYYY-MM-DD`.
///
/// Accepts plain dates, ISO-8601 datetimes (with or without offset), space-
/// separated datetimes, and integer epoch seconds.
pub fn normalize_date(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
                return Some(s.clone());
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.date_naive().format("%Y-%m-%d").to_string());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt.date().format("%Y-%m-%d").to_string());
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                return Some(dt.date().format("%Y-%m-%d").to_string());
            }
            // ISO-8601 strings carry the date in their first 10 bytes;
            // get() rejects a prefix split inside a multibyte character
            if s.len() > 10 {
                if let Some(prefix) = s.get(..10) {
                    if NaiveDate::parse_from_str(prefix, "%Y-%m-%d").is_ok() {
                        return Some(prefix.to_string());
                    }
                }
            }
            None
        }
        Value::Number(n) => {
            let secs = n.as_i64()?;
            let dt = DateTime::from_timestamp(secs, 0)?;
            Some(dt.date_naive().format("%Y-%m-%d").to_string())
        }
        _ => None,
    }
}
