//! MATCH pattern construction.
//!
//! Cypher has no JOIN clause, so join entries are emulated structurally:
//! inner and cross joins become additional comma-separated patterns in the
//! single MATCH (inner joins contribute their ON conditions to the WHERE
//! expression), left joins become trailing OPTIONAL MATCH clauses carrying
//! their ON condition locally, and right joins swap roles: the joined
//! entity takes over the MATCH and the original primary becomes the
//! OPTIONAL pattern.

use crate::config::CompilerConfig;
use crate::query_model::{JoinKind, OnCondition, QueryState};

use super::alias_resolver::{parse_name, AliasResolver};
use super::errors::CypherGeneratorError;
use super::operators::translate_operator;

/// The structural output of join emulation, ready for clause assembly.
#[derive(Debug, Clone, Default)]
pub struct CompiledPatterns {
    /// Comma-joined into the single MATCH clause
    pub match_patterns: Vec<String>,
    /// Inner-join ON conditions, ANDed into the main WHERE expression
    pub join_predicates: Vec<String>,
    /// Complete `OPTIONAL MATCH ... [WHERE ...]` clauses, emitted after the
    /// main WHERE
    pub optional_clauses: Vec<String>,
    /// Base plus join aliases, in declaration order, for whole-entity
    /// projection
    pub entity_aliases: Vec<String>,
}

/// Render a node pattern `(alias:Label1:Label2)`
pub fn node_pattern(alias: &str, labels: &[String]) -> String {
    format!("({}:{})", alias, labels.join(":"))
}

pub fn build_patterns(
    state: &QueryState,
    resolver: &mut AliasResolver,
    _config: &CompilerConfig,
) -> Result<CompiledPatterns, CypherGeneratorError> {
    let mut compiled = CompiledPatterns::default();

    let base_pattern = node_pattern(resolver.base_alias(), &state.labels());
    compiled.entity_aliases.push(resolver.base_alias().to_string());

    let has_right_join = state.joins.iter().any(|j| j.kind == JoinKind::Right);

    // Aliases are assigned in declaration order regardless of join kind so
    // the numbering is deterministic.
    let mut right_join_predicates: Vec<String> = Vec::new();
    let mut pending_optionals: Vec<String> = Vec::new();
    for join in &state.joins {
        let alias = resolver.register_join(&join.target);
        compiled.entity_aliases.push(alias.clone());
        let label = parse_name(&join.target).0;
        let pattern = node_pattern(&alias, &[label]);

        match join.kind {
            JoinKind::Inner => {
                compiled.match_patterns.push(pattern);
                for on in &join.on {
                    compiled
                        .join_predicates
                        .push(render_on_condition(on, resolver)?);
                }
            }
            JoinKind::Cross => {
                compiled.match_patterns.push(pattern);
            }
            JoinKind::Left => {
                let conditions = join
                    .on
                    .iter()
                    .map(|on| render_on_condition(on, resolver))
                    .collect::<Result<Vec<_>, _>>()?;
                pending_optionals.push(optional_clause(&pattern, &conditions));
            }
            JoinKind::Right => {
                compiled.match_patterns.push(pattern);
                for on in &join.on {
                    right_join_predicates.push(render_on_condition(on, resolver)?);
                }
            }
        }
    }

    if has_right_join {
        // Structural swap: the original primary becomes the optional side
        // and carries the right joins' ON conditions.
        log::debug!("right join: demoting primary pattern to OPTIONAL MATCH");
        compiled
            .optional_clauses
            .push(optional_clause(&base_pattern, &right_join_predicates));
    } else {
        compiled.match_patterns.insert(0, base_pattern);
    }
    compiled.optional_clauses.extend(pending_optionals);

    Ok(compiled)
}

fn optional_clause(pattern: &str, conditions: &[String]) -> String {
    if conditions.is_empty() {
        format!("OPTIONAL MATCH {}", pattern)
    } else {
        format!("OPTIONAL MATCH {} WHERE {}", pattern, conditions.join(" AND "))
    }
}

fn render_on_condition(
    on: &OnCondition,
    resolver: &AliasResolver,
) -> Result<String, CypherGeneratorError> {
    let operator = translate_operator(&on.operator)
        .ok_or_else(|| CypherGeneratorError::UnsupportedOperator(on.operator.clone()))?;
    Ok(format!(
        "{} {} {}",
        resolver.resolve_column(&on.first),
        operator,
        resolver.resolve_column(&on.second)
    ))
}
