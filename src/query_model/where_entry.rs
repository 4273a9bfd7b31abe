//! Tagged where-entry variants.
//!
//! Each entry carries the boolean connector to its predecessor. Entries are
//! compiled strictly left-to-right; nested groups are whole query states
//! compiled recursively and parenthesized.

use serde_json::Value;

use super::relationship::RelationshipDescriptor;
use super::QueryState;

/// Boolean connector between a where entry and the entry before it.
///
/// The connector on the first entry is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn keyword(&self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// One predicate in a query's WHERE list.
#[derive(Debug, Clone)]
pub enum WhereEntry {
    /// `column <op> value`; a missing value renders the operator alone
    /// (unary forms)
    Basic {
        column: String,
        operator: String,
        value: Option<Value>,
        connector: Connector,
    },

    /// Set membership. An empty value list compiles to an always-false
    /// literal and binds nothing.
    In {
        column: String,
        values: Vec<Value>,
        connector: Connector,
    },

    /// Negated set membership. An empty value list is omitted entirely.
    NotIn {
        column: String,
        values: Vec<Value>,
        connector: Connector,
    },

    Null {
        column: String,
        connector: Connector,
    },

    NotNull {
        column: String,
        connector: Connector,
    },

    /// Two-sided range with two distinct bound parameters
    Between {
        column: String,
        low: Value,
        high: Value,
        negated: bool,
        connector: Connector,
    },

    /// Compares the date portion of a stored timestamp. The value is
    /// normalized to `YYYY-MM-DD` before binding.
    Date {
        column: String,
        operator: String,
        value: Value,
        connector: Connector,
    },

    /// Column-to-column comparison, no parameter binding
    Column {
        first: String,
        operator: String,
        second: String,
        connector: Connector,
    },

    /// Verbatim predicate text with caller-supplied bindings merged as-is.
    /// Escape hatch with no safety net.
    Raw {
        expr: String,
        bindings: Vec<(String, Value)>,
        connector: Connector,
    },

    /// Correlated existence of a sub-query's matches
    Exists {
        query: Box<QueryState>,
        negated: bool,
        connector: Connector,
    },

    /// Parenthesized group of entries, itself a query state
    Nested {
        query: Box<QueryState>,
        connector: Connector,
    },

    /// Relationship existence / threshold condition, translated per shape by
    /// the subquery translator
    Relationship {
        descriptor: RelationshipDescriptor,
        operator: String,
        count: i64,
        constraint: Option<Box<QueryState>>,
        connector: Connector,
    },
}

impl WhereEntry {
    pub fn connector(&self) -> Connector {
        match self {
            WhereEntry::Basic { connector, .. }
            | WhereEntry::In { connector, .. }
            | WhereEntry::NotIn { connector, .. }
            | WhereEntry::Null { connector, .. }
            | WhereEntry::NotNull { connector, .. }
            | WhereEntry::Between { connector, .. }
            | WhereEntry::Date { connector, .. }
            | WhereEntry::Column { connector, .. }
            | WhereEntry::Raw { connector, .. }
            | WhereEntry::Exists { connector, .. }
            | WhereEntry::Nested { connector, .. }
            | WhereEntry::Relationship { connector, .. } => *connector,
        }
    }
}
