//! Relationship-to-subquery translation.
//!
//! Dispatches on the closed [`RelationshipShape`] enumeration and produces
//! one of three condition forms from `(operator, count)`:
//!
//! | form               | when                    | compiles to                      |
//! |--------------------|-------------------------|----------------------------------|
//! | plain existence    | `>=` and count 1        | `EXISTS { MATCH ... WHERE ... }` |
//! | negated existence  | `<`  and count 1        | `NOT EXISTS { ... }`             |
//! | threshold          | any other pair          | `COUNT { ... } <op> <count>`     |
//!
//! All produced text references the enclosing entity through the outer-scope
//! marker; the caller rewrites it to the enclosing alias.

use serde_json::Value;

use crate::config::CompilerConfig;
use crate::query_model::{QueryState, RelationshipDescriptor, RelationshipShape};

use super::alias_resolver::{AliasResolver, OUTER_MARKER};
use super::bindings::Bindings;
use super::errors::CypherGeneratorError;
use super::operators::translate_operator;
use super::pattern_builder::node_pattern;
use super::predicate_compiler::PredicateContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionForm {
    Existence,
    NegatedExistence,
    Threshold,
}

pub fn condition_form(operator: &str, count: i64) -> ConditionForm {
    match (operator, count) {
        (">=", 1) => ConditionForm::Existence,
        ("<", 1) => ConditionForm::NegatedExistence,
        _ => ConditionForm::Threshold,
    }
}

/// The correlated match block for one relationship shape: patterns,
/// predicates (referencing the parent via the outer marker), and the alias
/// bound to the related entity.
#[derive(Debug, Clone)]
pub struct ShapeBlock {
    pub patterns: Vec<String>,
    pub predicates: Vec<String>,
    pub related_alias: String,
}

/// Build the per-shape pattern template. `PolymorphicInverse` has no
/// related pattern to match and is special-cased by the callers.
pub fn shape_block(
    descriptor: &RelationshipDescriptor,
    bindings: &mut Bindings,
    config: &CompilerConfig,
    depth: usize,
) -> Result<ShapeBlock, CypherGeneratorError> {
    let d = depth + 1;
    let related_alias = format!("r{}", d);
    let related_label = vec![descriptor.related_label.clone()];

    let block = match descriptor.shape {
        RelationshipShape::OneToMany => ShapeBlock {
            patterns: vec![node_pattern(&related_alias, &related_label)],
            predicates: vec![format!(
                "{}.{} = {}.{}",
                related_alias, descriptor.foreign_key, OUTER_MARKER, descriptor.local_key
            )],
            related_alias,
        },

        RelationshipShape::ManyToOne => ShapeBlock {
            patterns: vec![node_pattern(&related_alias, &related_label)],
            predicates: vec![format!(
                "{}.{} = {}.{}",
                related_alias, descriptor.related_key, OUTER_MARKER, descriptor.foreign_key
            )],
            related_alias,
        },

        RelationshipShape::ManyToMany => {
            if let (Some(edge_type), true) = (&descriptor.edge_type, config.prefer_native_edges) {
                // Native typed edge: single traversal from the parent
                ShapeBlock {
                    patterns: vec![format!(
                        "({})-[:{}]->{}",
                        OUTER_MARKER,
                        edge_type,
                        node_pattern(&related_alias, &related_label)
                    )],
                    predicates: Vec::new(),
                    related_alias,
                }
            } else {
                let pivot = descriptor.pivot.as_ref().ok_or_else(|| {
                    CypherGeneratorError::IncompleteDescriptor {
                        name: descriptor.name.clone(),
                        what: "pivot".to_string(),
                    }
                })?;
                let pivot_alias = format!("p{}", d);
                ShapeBlock {
                    patterns: vec![
                        node_pattern(&pivot_alias, &[pivot.label.clone()]),
                        node_pattern(&related_alias, &related_label),
                    ],
                    predicates: vec![
                        format!(
                            "{}.{} = {}.{}",
                            pivot_alias, pivot.parent_key, OUTER_MARKER, descriptor.local_key
                        ),
                        format!(
                            "{}.{} = {}.{}",
                            related_alias, descriptor.related_key, pivot_alias, pivot.related_key
                        ),
                    ],
                    related_alias,
                }
            }
        }

        RelationshipShape::Through => {
            let through = descriptor.through.as_ref().ok_or_else(|| {
                CypherGeneratorError::IncompleteDescriptor {
                    name: descriptor.name.clone(),
                    what: "through".to_string(),
                }
            })?;
            let through_alias = format!("t{}", d);
            ShapeBlock {
                patterns: vec![
                    node_pattern(&through_alias, &[through.label.clone()]),
                    node_pattern(&related_alias, &related_label),
                ],
                predicates: vec![
                    format!(
                        "{}.{} = {}.{}",
                        through_alias, through.first_key, OUTER_MARKER, descriptor.local_key
                    ),
                    format!(
                        "{}.{} = {}.{}",
                        related_alias, through.second_key, through_alias, through.local_key
                    ),
                ],
                related_alias,
            }
        }

        RelationshipShape::PolymorphicMany => {
            let morph = descriptor.morph.as_ref().ok_or_else(|| {
                CypherGeneratorError::IncompleteDescriptor {
                    name: descriptor.name.clone(),
                    what: "morph".to_string(),
                }
            })?;
            let type_param = bindings.add(
                &morph.type_column,
                Value::String(morph.type_value.clone()),
            );
            ShapeBlock {
                patterns: vec![node_pattern(&related_alias, &related_label)],
                predicates: vec![
                    format!(
                        "{}.{} = {}.{}",
                        related_alias, morph.id_column, OUTER_MARKER, descriptor.local_key
                    ),
                    format!("{}.{} = ${}", related_alias, morph.type_column, type_param),
                ],
                related_alias,
            }
        }

        RelationshipShape::PolymorphicInverse => {
            return Err(CypherGeneratorError::InvalidRenderState(
                "polymorphic inverse relationships have no match pattern".to_string(),
            ))
        }
    };
    Ok(block)
}

/// Compile a relationship condition (whereHas / whereDoesntHave / has with
/// threshold) into its correlated boolean text.
pub fn compile_relationship_condition(
    descriptor: &RelationshipDescriptor,
    operator: &str,
    count: i64,
    constraint: Option<&QueryState>,
    bindings: &mut Bindings,
    config: &CompilerConfig,
    depth: usize,
) -> Result<String, CypherGeneratorError> {
    let form = condition_form(operator, count);

    if descriptor.shape == RelationshipShape::PolymorphicInverse {
        return compile_inverse_condition(descriptor, operator, count, form);
    }

    let mut block = shape_block(descriptor, bindings, config, depth)?;

    if let Some(constraint) = constraint {
        let resolver =
            AliasResolver::with_base_alias(&descriptor.related_label, &block.related_alias);
        let ctx = PredicateContext::at_depth(&resolver, config, depth + 1);
        if let Some(extra) = ctx.compile(&constraint.wheres, bindings)? {
            block.predicates.push(format!("({})", extra));
        }
    }

    let inner = render_match_block(&block);
    let text = match form {
        ConditionForm::Existence => format!("EXISTS {{ {} }}", inner),
        ConditionForm::NegatedExistence => format!("NOT EXISTS {{ {} }}", inner),
        ConditionForm::Threshold => {
            let op = translate_operator(operator)
                .ok_or_else(|| CypherGeneratorError::UnsupportedOperator(operator.to_string()))?;
            format!("COUNT {{ {} }} {} {}", inner, op, count)
        }
    };
    Ok(text)
}

/// The inverse side has no related pattern: both discriminator properties
/// non-null means the relationship exists, both null means it does not.
fn compile_inverse_condition(
    descriptor: &RelationshipDescriptor,
    operator: &str,
    count: i64,
    form: ConditionForm,
) -> Result<String, CypherGeneratorError> {
    let morph = descriptor.morph.as_ref().ok_or_else(|| {
        CypherGeneratorError::IncompleteDescriptor {
            name: descriptor.name.clone(),
            what: "morph".to_string(),
        }
    })?;
    let id_col = format!("{}.{}", OUTER_MARKER, morph.id_column);
    let type_col = format!("{}.{}", OUTER_MARKER, morph.type_column);
    let text = match form {
        ConditionForm::Existence => {
            format!("({id_col} IS NOT NULL AND {type_col} IS NOT NULL)")
        }
        ConditionForm::NegatedExistence => {
            format!("({id_col} IS NULL AND {type_col} IS NULL)")
        }
        ConditionForm::Threshold => {
            let op = translate_operator(operator)
                .ok_or_else(|| CypherGeneratorError::UnsupportedOperator(operator.to_string()))?;
            format!(
                "(CASE WHEN {id_col} IS NOT NULL AND {type_col} IS NOT NULL THEN 1 ELSE 0 END) {op} {count}"
            )
        }
    };
    Ok(text)
}

pub fn render_match_block(block: &ShapeBlock) -> String {
    if block.predicates.is_empty() {
        format!("MATCH {}", block.patterns.join(", "))
    } else {
        format!(
            "MATCH {} WHERE {}",
            block.patterns.join(", "),
            block.predicates.join(" AND ")
        )
    }
}
