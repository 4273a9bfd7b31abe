//! Cypher statement generation.
//!
//! Compiles a [`QueryState`] into statement text plus bound parameters.
//! Compilation is rule-based and deterministic: compiling the same state
//! twice yields byte-identical text and an identical binding map.

pub mod aggregate_compiler;
pub mod alias_resolver;
pub mod bindings;
pub mod errors;
pub mod mutation_compiler;
pub mod operators;
pub mod pattern_builder;
pub mod predicate_compiler;
pub mod projection_builder;
pub mod subquery_translator;

pub use aggregate_compiler::{DeferredAggregate, PARENT_KEY_PARAM};
pub use bindings::Bindings;
pub use errors::CypherGeneratorError;

use serde_json::{Map, Value};

use crate::config::CompilerConfig;
use crate::query_model::QueryState;

use alias_resolver::AliasResolver;
use pattern_builder::build_patterns;
use predicate_compiler::PredicateContext;

/// A compiled statement: text, parameters, and any aggregate follow-ups the
/// executor must issue per result row.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub text: String,
    pub bindings: Bindings,
    pub deferred_aggregates: Vec<DeferredAggregate>,
}

/// Statement generator. Carries the compiler configuration explicitly;
/// there are no ambient settings.
#[derive(Debug, Clone, Default)]
pub struct CypherGenerator {
    config: CompilerConfig,
}

impl CypherGenerator {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a read query.
    pub fn compile_select(
        &self,
        state: &QueryState,
    ) -> Result<CompiledQuery, CypherGeneratorError> {
        let grouped = !state.group_by.is_empty() || !state.havings.is_empty();
        if grouped && !state.aggregates.is_empty() {
            // The grouping stage re-projects through WITH aliases; a
            // correlated COUNT subquery or deferred placeholder has no slot
            // there, so the combination is rejected instead of dropped.
            return Err(CypherGeneratorError::InvalidRenderState(
                "relationship aggregates cannot be combined with grouped projections".to_string(),
            ));
        }

        let mut resolver = AliasResolver::new(&state.from_expr);
        let mut bindings = Bindings::new();
        let patterns = build_patterns(state, &mut resolver, &self.config)?;

        let mut predicates = patterns.join_predicates.clone();
        let ctx = PredicateContext::new(&resolver, &self.config);
        if let Some(wheres) = ctx.compile(&state.wheres, &mut bindings)? {
            push_where_expression(&mut predicates, wheres);
        }

        let aggregates = aggregate_compiler::compile_aggregates(
            state,
            &resolver,
            &mut bindings,
            &self.config,
        )?;

        let mut text = format!("MATCH {}", patterns.match_patterns.join(", "));
        if !predicates.is_empty() {
            text.push_str(&format!(" WHERE {}", predicates.join(" AND ")));
        }
        for optional in &patterns.optional_clauses {
            text.push(' ');
            text.push_str(optional);
        }

        let distinct = if state.distinct { "DISTINCT " } else { "" };

        if !grouped {
            let mut items = projection_builder::build_return_items(state, &resolver, &patterns);
            items.extend(aggregates.return_items.iter().cloned());
            text.push_str(&format!(" RETURN {}{}", distinct, items.join(", ")));
        } else {
            // Cypher aggregates group implicitly by the non-aggregate items
            // of a WITH stage; HAVING becomes the stage's trailing WHERE.
            let (with_items, return_aliases) = self.build_grouping_stage(state, &resolver);
            text.push_str(&format!(" WITH {}", with_items.join(", ")));
            let having_ctx = PredicateContext::unqualified(&resolver, &self.config);
            if let Some(having) = having_ctx.compile(&state.havings, &mut bindings)? {
                text.push_str(&format!(" WHERE {}", having));
            }
            text.push_str(&format!(" RETURN {}{}", distinct, return_aliases.join(", ")));
        }

        if let Some(order) = projection_builder::build_order_clause(state, &resolver) {
            text.push(' ');
            text.push_str(&order);
        }
        for clause in projection_builder::build_pagination_clauses(state) {
            text.push(' ');
            text.push_str(&clause);
        }

        log::debug!("compiled select: {}", text);
        Ok(CompiledQuery {
            text,
            bindings,
            deferred_aggregates: aggregates.deferred,
        })
    }

    /// WITH items and post-stage aliases for grouped queries. Raw aggregate
    /// projections should carry an `AS` alias so the HAVING filter and the
    /// final RETURN can reference them. Grouping columns and selected
    /// columns sharing an alias project once.
    fn build_grouping_stage(
        &self,
        state: &QueryState,
        resolver: &AliasResolver,
    ) -> (Vec<String>, Vec<String>) {
        use crate::query_model::ReturnItem;
        use std::collections::HashSet;

        let mut with_items = Vec::new();
        let mut return_aliases = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for column in &state.group_by {
            let alias = bindings::sanitize_param_name(column);
            if seen.insert(alias.clone()) {
                with_items.push(format!("{} AS {}", resolver.resolve_column(column), alias));
                return_aliases.push(alias);
            }
        }
        for item in &state.columns {
            match item {
                ReturnItem::Column(reference) => {
                    let alias = bindings::sanitize_param_name(reference);
                    if seen.insert(alias.clone()) {
                        with_items.push(format!(
                            "{} AS {}",
                            resolver.resolve_column(reference),
                            alias
                        ));
                        return_aliases.push(alias);
                    }
                }
                ReturnItem::Entity => {
                    let base = resolver.base_alias().to_string();
                    if seen.insert(base.clone()) {
                        with_items.push(base.clone());
                        return_aliases.push(base);
                    }
                }
                ReturnItem::Raw(expr) => {
                    let prefixed =
                        projection_builder::prefix_bare_columns(expr, resolver.base_alias());
                    if let Some(pos) = prefixed.to_ascii_uppercase().rfind(" AS ") {
                        let alias = prefixed[pos + 4..].trim().to_string();
                        if seen.insert(alias.clone()) {
                            with_items.push(prefixed);
                            return_aliases.push(alias);
                        }
                    } else {
                        with_items.push(prefixed.clone());
                        return_aliases.push(prefixed);
                    }
                }
            }
        }
        (with_items, return_aliases)
    }

    pub fn compile_create(
        &self,
        label_expr: &str,
        props: &Map<String, Value>,
    ) -> Result<CompiledQuery, CypherGeneratorError> {
        mutation_compiler::compile_create(label_expr, props)
    }

    pub fn compile_create_many(
        &self,
        label_expr: &str,
        rows: &[Map<String, Value>],
    ) -> Result<Vec<CompiledQuery>, CypherGeneratorError> {
        mutation_compiler::compile_create_many(label_expr, rows, &self.config)
    }

    pub fn compile_update(
        &self,
        state: &QueryState,
        values: &Map<String, Value>,
    ) -> Result<CompiledQuery, CypherGeneratorError> {
        mutation_compiler::compile_update(state, values, &self.config)
    }

    pub fn compile_delete(
        &self,
        state: &QueryState,
    ) -> Result<CompiledQuery, CypherGeneratorError> {
        mutation_compiler::compile_delete(state, &self.config)
    }

    pub fn compile_upsert(
        &self,
        label_expr: &str,
        match_keys: &Map<String, Value>,
        values: &Map<String, Value>,
    ) -> Result<CompiledQuery, CypherGeneratorError> {
        mutation_compiler::compile_upsert(label_expr, match_keys, values)
    }
}

/// AND a compiled where expression onto the join predicate list.
///
/// With join ON conditions present the expression is parenthesized as a
/// unit; a top-level OR among the where entries must not escape the join
/// conditions.
pub(crate) fn push_where_expression(predicates: &mut Vec<String>, wheres: String) {
    if predicates.is_empty() {
        predicates.push(wheres);
    } else {
        predicates.push(format!("({})", wheres));
    }
}

/// Compile a sub-query into a correlated `EXISTS { ... }` block.
///
/// The inner compilation uses a depth-derived base alias (`s1`, `s2`, ...)
/// so inner pattern variables never rebind the enclosing pattern's. Outer
/// references stay marker-tagged; the caller rewrites them to the enclosing
/// alias after the block text is produced.
pub(crate) fn compile_exists_block(
    state: &QueryState,
    depth: usize,
    bindings: &mut Bindings,
    config: &CompilerConfig,
) -> Result<String, CypherGeneratorError> {
    let inner_alias = format!("s{}", depth);
    let mut resolver = AliasResolver::with_base_alias(&state.from_expr, &inner_alias);
    let patterns = build_patterns(state, &mut resolver, config)?;

    let mut predicates = patterns.join_predicates.clone();
    let ctx = PredicateContext::at_depth(&resolver, config, depth);
    if let Some(wheres) = ctx.compile(&state.wheres, bindings)? {
        push_where_expression(&mut predicates, wheres);
    }

    let mut inner = format!("MATCH {}", patterns.match_patterns.join(", "));
    if !predicates.is_empty() {
        inner.push_str(&format!(" WHERE {}", predicates.join(" AND ")));
    }
    for optional in &patterns.optional_clauses {
        inner.push(' ');
        inner.push_str(optional);
    }
    Ok(format!("EXISTS {{ {} }}", inner))
}
