//! Join entries and their ON conditions.
//!
//! Cypher has no JOIN clause; each entry is emulated with additional MATCH
//! patterns or OPTIONAL MATCH clauses by the pattern builder.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

/// One `left column <op> right column` pair from a join's ON clause
#[derive(Debug, Clone)]
pub struct OnCondition {
    pub first: String,
    pub operator: String,
    pub second: String,
}

impl OnCondition {
    pub fn new(
        first: impl Into<String>,
        operator: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self {
            first: first.into(),
            operator: operator.into(),
            second: second.into(),
        }
    }
}

/// A joined entity. The target may carry a declared alias
/// (`"roles AS r"`); the compiled alias is assigned once by the alias
/// resolver and memoized for the life of the query state.
#[derive(Debug, Clone)]
pub struct JoinEntry {
    pub kind: JoinKind,
    pub target: String,
    pub on: Vec<OnCondition>,
}

impl JoinEntry {
    pub fn new(kind: JoinKind, target: impl Into<String>, on: Vec<OnCondition>) -> Self {
        Self {
            kind,
            target: target.into(),
            on,
        }
    }
}
