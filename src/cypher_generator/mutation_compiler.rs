//! Mutation statement generation: CREATE, SET, DELETE, MERGE.
//!
//! Multi-row creates follow a batch policy: with a batch size above one,
//! rows are chunked into UNWIND statements of at most `batch_size` rows
//! each; a batch size of one (or zero) falls back to individual CREATE
//! statements.

use serde_json::{Map, Value};

use crate::config::CompilerConfig;
use crate::query_model::QueryState;

use super::alias_resolver::AliasResolver;
use super::bindings::Bindings;
use super::errors::CypherGeneratorError;
use super::pattern_builder::{build_patterns, node_pattern};
use super::predicate_compiler::PredicateContext;
use super::CompiledQuery;

pub fn compile_create(
    label_expr: &str,
    props: &Map<String, Value>,
) -> Result<CompiledQuery, CypherGeneratorError> {
    if props.is_empty() {
        return Err(CypherGeneratorError::MissingMutationProperties);
    }
    let resolver = AliasResolver::new(label_expr);
    let base = resolver.base_alias();
    let pattern = node_pattern(base, &[resolver.primary_name().to_string()]);
    let mut bindings = Bindings::new();
    bindings.insert_raw("props", Value::Object(props.clone()));
    Ok(CompiledQuery {
        text: format!("CREATE {pattern} SET {base} = $props RETURN {base}"),
        bindings,
        deferred_aggregates: Vec::new(),
    })
}

pub fn compile_create_many(
    label_expr: &str,
    rows: &[Map<String, Value>],
    config: &CompilerConfig,
) -> Result<Vec<CompiledQuery>, CypherGeneratorError> {
    if rows.is_empty() {
        return Err(CypherGeneratorError::MissingMutationProperties);
    }
    if config.batch_size <= 1 {
        log::debug!("batch size {} disables UNWIND batching", config.batch_size);
        return rows
            .iter()
            .map(|row| compile_create(label_expr, row))
            .collect();
    }

    let resolver = AliasResolver::new(label_expr);
    let base = resolver.base_alias();
    let pattern = node_pattern(base, &[resolver.primary_name().to_string()]);
    let mut statements = Vec::new();
    for chunk in rows.chunks(config.batch_size) {
        let mut bindings = Bindings::new();
        let values: Vec<Value> = chunk.iter().map(|row| Value::Object(row.clone())).collect();
        bindings.insert_raw("rows", Value::Array(values));
        statements.push(CompiledQuery {
            text: format!("UNWIND $rows AS row CREATE {pattern} SET {base} = row"),
            bindings,
            deferred_aggregates: Vec::new(),
        });
    }
    Ok(statements)
}

pub fn compile_update(
    state: &QueryState,
    values: &Map<String, Value>,
    config: &CompilerConfig,
) -> Result<CompiledQuery, CypherGeneratorError> {
    if values.is_empty() {
        return Err(CypherGeneratorError::EmptyUpdate);
    }
    let (match_where, resolver, mut bindings) = compile_match_where(state, config)?;
    let base = resolver.base_alias().to_string();

    let mut assignments = Vec::new();
    for (column, value) in values {
        let param = bindings.add(column, value.clone());
        assignments.push(format!("{}.{} = ${}", base, column, param));
    }

    Ok(CompiledQuery {
        text: format!(
            "{} SET {} RETURN count({}) AS affected",
            match_where,
            assignments.join(", "),
            base
        ),
        bindings,
        deferred_aggregates: Vec::new(),
    })
}

pub fn compile_delete(
    state: &QueryState,
    config: &CompilerConfig,
) -> Result<CompiledQuery, CypherGeneratorError> {
    let (match_where, resolver, bindings) = compile_match_where(state, config)?;
    let delete = if config.detach_delete {
        "DETACH DELETE"
    } else {
        "DELETE"
    };
    Ok(CompiledQuery {
        text: format!("{} {} {}", match_where, delete, resolver.base_alias()),
        bindings,
        deferred_aggregates: Vec::new(),
    })
}

pub fn compile_upsert(
    label_expr: &str,
    match_keys: &Map<String, Value>,
    values: &Map<String, Value>,
) -> Result<CompiledQuery, CypherGeneratorError> {
    if match_keys.is_empty() {
        return Err(CypherGeneratorError::MissingMergeKeys);
    }
    let resolver = AliasResolver::new(label_expr);
    let base = resolver.base_alias();
    let mut bindings = Bindings::new();

    let key_props: Vec<String> = match_keys
        .iter()
        .map(|(column, value)| {
            let param = bindings.add(column, value.clone());
            format!("{}: ${}", column, param)
        })
        .collect();
    let mut text = format!(
        "MERGE ({}:{} {{{}}})",
        base,
        resolver.primary_name(),
        key_props.join(", ")
    );

    if !values.is_empty() {
        bindings.insert_raw("values", Value::Object(values.clone()));
        text.push_str(&format!(
            " ON CREATE SET {base} += $values ON MATCH SET {base} += $values"
        ));
    }
    text.push_str(&format!(" RETURN {base}"));

    Ok(CompiledQuery {
        text,
        bindings,
        deferred_aggregates: Vec::new(),
    })
}

/// Shared MATCH + WHERE prefix for update/delete statements
fn compile_match_where(
    state: &QueryState,
    config: &CompilerConfig,
) -> Result<(String, AliasResolver, Bindings), CypherGeneratorError> {
    let mut resolver = AliasResolver::new(&state.from_expr);
    let mut bindings = Bindings::new();
    let patterns = build_patterns(state, &mut resolver, config)?;

    let mut predicates = patterns.join_predicates.clone();
    let ctx = PredicateContext::new(&resolver, config);
    if let Some(wheres) = ctx.compile(&state.wheres, &mut bindings)? {
        super::push_where_expression(&mut predicates, wheres);
    }

    let mut text = format!("MATCH {}", patterns.match_patterns.join(", "));
    if !predicates.is_empty() {
        text.push_str(&format!(" WHERE {}", predicates.join(" AND ")));
    }
    for optional in &patterns.optional_clauses {
        text.push(' ');
        text.push_str(optional);
    }
    Ok((text, resolver, bindings))
}
