//! Relationship aggregate annotations (withCount / withAggregate).
//!
//! Two execution strategies, preserved as observed in the source system:
//! simple foreign-key shapes compile an inline `COUNT { ... }` expression
//! into the outer projection; join-table and polymorphic-many shapes (and
//! every non-count function) emit a placeholder column and defer the real
//! aggregate to one follow-up statement per result row per request. The
//! asymmetry is an intentional N+1 trade-off with known scalability limits
//! for the deferred shapes.

use std::collections::HashSet;

use crate::config::CompilerConfig;
use crate::query_model::{AggregateFunction, AggregateRequest, QueryState, RelationshipShape};

use super::alias_resolver::{AliasResolver, OUTER_MARKER};
use super::bindings::Bindings;
use super::errors::CypherGeneratorError;
use super::predicate_compiler::PredicateContext;
use super::subquery_translator::{render_match_block, shape_block};

/// Name of the correlate parameter in a deferred follow-up statement
pub const PARENT_KEY_PARAM: &str = "parent_key";

/// A follow-up aggregate statement issued once per outer result row.
#[derive(Debug, Clone)]
pub struct DeferredAggregate {
    /// Placeholder column in the outer projection this fills in
    pub alias: String,
    pub text: String,
    /// Bindings owned by the follow-up statement (morph discriminators,
    /// constraint parameters); the executor adds the per-row correlate
    /// under [`PARENT_KEY_PARAM`]
    pub bindings: Bindings,
    /// Column on the outer row's entity map supplying the correlate value
    pub source_column: String,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledAggregates {
    /// Items appended to the outer RETURN list (inline subqueries or
    /// `0 AS alias` placeholders)
    pub return_items: Vec<String>,
    pub deferred: Vec<DeferredAggregate>,
}

fn compiles_inline(request: &AggregateRequest) -> bool {
    request.function == AggregateFunction::Count
        && matches!(
            request.descriptor.shape,
            RelationshipShape::OneToMany
                | RelationshipShape::ManyToOne
                | RelationshipShape::Through
                | RelationshipShape::PolymorphicInverse
        )
}

pub fn compile_aggregates(
    state: &QueryState,
    resolver: &AliasResolver,
    bindings: &mut Bindings,
    config: &CompilerConfig,
) -> Result<CompiledAggregates, CypherGeneratorError> {
    let mut compiled = CompiledAggregates::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for request in &state.aggregates {
        if !seen.insert(request.alias.as_str()) {
            return Err(CypherGeneratorError::DuplicateAggregateAlias(
                request.alias.clone(),
            ));
        }
        if request.function != AggregateFunction::Count && request.column.is_none() {
            return Err(CypherGeneratorError::MissingAggregateColumn {
                alias: request.alias.clone(),
                function: request.function.cypher_name().to_string(),
            });
        }

        if compiles_inline(request) {
            let item = compile_inline(request, resolver, bindings, config)?;
            compiled.return_items.push(item);
        } else {
            log::debug!(
                "aggregate '{}' on {:?} defers to a follow-up statement per row",
                request.alias,
                request.descriptor.shape
            );
            compiled
                .return_items
                .push(format!("0 AS {}", request.alias));
            compiled.deferred.push(build_deferred(request, config)?);
        }
    }
    Ok(compiled)
}

fn compile_inline(
    request: &AggregateRequest,
    resolver: &AliasResolver,
    bindings: &mut Bindings,
    config: &CompilerConfig,
) -> Result<String, CypherGeneratorError> {
    let descriptor = &request.descriptor;

    if descriptor.shape == RelationshipShape::PolymorphicInverse {
        let morph = descriptor.morph.as_ref().ok_or_else(|| {
            CypherGeneratorError::IncompleteDescriptor {
                name: descriptor.name.clone(),
                what: "morph".to_string(),
            }
        })?;
        let base = resolver.base_alias();
        return Ok(format!(
            "(CASE WHEN {base}.{id} IS NOT NULL AND {base}.{ty} IS NOT NULL THEN 1 ELSE 0 END) AS {alias}",
            id = morph.id_column,
            ty = morph.type_column,
            alias = request.alias,
        ));
    }

    let mut block = shape_block(descriptor, bindings, config, 0)?;
    if let Some(constraint) = &request.constraint {
        let inner =
            AliasResolver::with_base_alias(&descriptor.related_label, &block.related_alias);
        let ctx = PredicateContext::at_depth(&inner, config, 1);
        if let Some(extra) = ctx.compile(&constraint.wheres, bindings)? {
            block.predicates.push(format!("({})", extra));
        }
    }
    let inner = render_match_block(&block);
    let text = format!("COUNT {{ {} }} AS {}", inner, request.alias);
    Ok(AliasResolver::rewrite_outer(&text, resolver.base_alias()))
}

/// Build the self-contained follow-up statement for a deferred aggregate.
///
/// The shape template is reused; outer-scope correlate references are
/// rewritten to the `$parent_key` parameter.
fn build_deferred(
    request: &AggregateRequest,
    config: &CompilerConfig,
) -> Result<DeferredAggregate, CypherGeneratorError> {
    let descriptor = &request.descriptor;

    if descriptor.shape == RelationshipShape::PolymorphicInverse {
        return Err(CypherGeneratorError::InvalidRenderState(format!(
            "aggregate '{}' cannot run against a polymorphic inverse relationship",
            request.alias
        )));
    }

    let mut bindings = Bindings::new();
    let mut block = shape_block(descriptor, &mut bindings, config, 0)?;

    if let Some(constraint) = &request.constraint {
        let inner =
            AliasResolver::with_base_alias(&descriptor.related_label, &block.related_alias);
        let ctx = PredicateContext::at_depth(&inner, config, 1);
        if let Some(extra) = ctx.compile(&constraint.wheres, &mut bindings)? {
            block.predicates.push(format!("({})", extra));
        }
    }

    // ManyToOne correlates on the parent's own foreign key; every other
    // shape correlates on the parent's local key.
    let source_column = if descriptor.shape == RelationshipShape::ManyToOne {
        descriptor.foreign_key.clone()
    } else {
        descriptor.local_key.clone()
    };

    let correlate = format!("{}.{}", OUTER_MARKER, source_column);
    let param_ref = format!("${}", PARENT_KEY_PARAM);
    let uses_edge_pattern = block
        .patterns
        .iter()
        .any(|p| p.contains(&format!("({})", OUTER_MARKER)));
    if uses_edge_pattern {
        // Native-edge traversal: anchor the parent node by key instead of
        // referencing the outer pattern variable
        for pattern in &mut block.patterns {
            *pattern = pattern.replace(&format!("({})", OUTER_MARKER), "(p0)");
        }
        block
            .predicates
            .insert(0, format!("p0.{} = {}", source_column, param_ref));
    } else {
        for predicate in &mut block.predicates {
            *predicate = predicate.replace(&correlate, &param_ref);
        }
    }

    let target = match request.function {
        AggregateFunction::Count => format!("count({})", block.related_alias),
        function => format!(
            "{}({}.{})",
            function.cypher_name(),
            block.related_alias,
            request
                .column
                .as_ref()
                .expect("checked by compile_aggregates")
        ),
    };

    let text = format!(
        "{} RETURN {} AS {}",
        render_match_block(&block),
        target,
        request.alias
    );
    Ok(DeferredAggregate {
        alias: request.alias.clone(),
        text,
        bindings,
        source_column,
    })
}
