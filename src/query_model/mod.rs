//! In-memory representation of a pending query.
//!
//! `QueryState` is a structurally immutable value: every builder method
//! consumes the state and returns a new one, so derived queries (pagination
//! probing, chunked iteration, subquery construction) never mutate their
//! original. The compiler in [`crate::cypher_generator`] consumes the state
//! read-only.

pub mod join_entry;
pub mod order_entry;
pub mod relationship;
pub mod where_entry;

pub use join_entry::{JoinEntry, JoinKind, OnCondition};
pub use order_entry::{OrderEntry, SortDirection};
pub use relationship::{
    AggregateFunction, AggregateRequest, RelationshipDescriptor, RelationshipShape,
};
pub use where_entry::{Connector, WhereEntry};

use serde_json::Value;

/// Label used when a query is compiled without any declared target entity.
/// Keeps compilation total; the output is obviously wrong-by-default rather
/// than silently unlabeled.
pub const SENTINEL_LABEL: &str = "Entity";

/// One item of the RETURN projection
#[derive(Debug, Clone)]
pub enum ReturnItem {
    /// A resolved `alias.column` reference
    Column(String),
    /// Verbatim expression; bare columns inside aggregate calls are
    /// auto-prefixed with the base alias
    Raw(String),
    /// The whole base entity
    Entity,
}

/// The declarative intent for one query.
#[derive(Debug, Clone)]
pub struct QueryState {
    /// Primary target entity, possibly with a declared alias
    /// (`"users AS u"`). Defaults to [`SENTINEL_LABEL`].
    pub from_expr: String,
    /// Additional labels on the target entity (AND semantics)
    pub extra_labels: Vec<String>,
    pub columns: Vec<ReturnItem>,
    pub distinct: bool,
    pub wheres: Vec<WhereEntry>,
    pub joins: Vec<JoinEntry>,
    pub orders: Vec<OrderEntry>,
    pub group_by: Vec<String>,
    pub havings: Vec<WhereEntry>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub aggregates: Vec<AggregateRequest>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            from_expr: SENTINEL_LABEL.to_string(),
            extra_labels: Vec::new(),
            columns: Vec::new(),
            distinct: false,
            wheres: Vec::new(),
            joins: Vec::new(),
            orders: Vec::new(),
            group_by: Vec::new(),
            havings: Vec::new(),
            limit: None,
            skip: None,
            aggregates: Vec::new(),
        }
    }
}

impl QueryState {
    /// Start a query against an entity, optionally aliased
    /// (`"users AS u"`)
    pub fn from(entity: impl Into<String>) -> Self {
        Self {
            from_expr: entity.into(),
            ..Self::default()
        }
    }

    /// Add an extra label on the target entity (AND semantics)
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.extra_labels.push(label.into());
        self
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns
            .extend(columns.iter().map(|c| ReturnItem::Column(c.to_string())));
        self
    }

    pub fn select_raw(mut self, expr: impl Into<String>) -> Self {
        self.columns.push(ReturnItem::Raw(expr.into()));
        self
    }

    /// Project the whole base entity alongside any specific columns
    pub fn select_entity(mut self) -> Self {
        self.columns.push(ReturnItem::Entity);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Append an arbitrary where entry. The typed methods below cover the
    /// common forms.
    pub fn push_where(mut self, entry: WhereEntry) -> Self {
        self.wheres.push(entry);
        self
    }

    pub fn and_where(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.push_where(WhereEntry::Basic {
            column: column.to_string(),
            operator: operator.to_string(),
            value: Some(value.into()),
            connector: Connector::And,
        })
    }

    pub fn or_where(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.push_where(WhereEntry::Basic {
            column: column.to_string(),
            operator: operator.to_string(),
            value: Some(value.into()),
            connector: Connector::Or,
        })
    }

    /// Unary operator form, e.g. a bare `IS NOT NULL` style operator with no
    /// bound value
    pub fn where_unary(self, column: &str, operator: &str) -> Self {
        self.push_where(WhereEntry::Basic {
            column: column.to_string(),
            operator: operator.to_string(),
            value: None,
            connector: Connector::And,
        })
    }

    pub fn where_in(self, column: &str, values: Vec<Value>) -> Self {
        self.push_where(WhereEntry::In {
            column: column.to_string(),
            values,
            connector: Connector::And,
        })
    }

    pub fn or_where_in(self, column: &str, values: Vec<Value>) -> Self {
        self.push_where(WhereEntry::In {
            column: column.to_string(),
            values,
            connector: Connector::Or,
        })
    }

    pub fn where_not_in(self, column: &str, values: Vec<Value>) -> Self {
        self.push_where(WhereEntry::NotIn {
            column: column.to_string(),
            values,
            connector: Connector::And,
        })
    }

    pub fn where_null(self, column: &str) -> Self {
        self.push_where(WhereEntry::Null {
            column: column.to_string(),
            connector: Connector::And,
        })
    }

    pub fn or_where_null(self, column: &str) -> Self {
        self.push_where(WhereEntry::Null {
            column: column.to_string(),
            connector: Connector::Or,
        })
    }

    pub fn where_not_null(self, column: &str) -> Self {
        self.push_where(WhereEntry::NotNull {
            column: column.to_string(),
            connector: Connector::And,
        })
    }

    pub fn where_between(
        self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.push_where(WhereEntry::Between {
            column: column.to_string(),
            low: low.into(),
            high: high.into(),
            negated: false,
            connector: Connector::And,
        })
    }

    pub fn where_not_between(
        self,
        column: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.push_where(WhereEntry::Between {
            column: column.to_string(),
            low: low.into(),
            high: high.into(),
            negated: true,
            connector: Connector::And,
        })
    }

    pub fn where_date(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.push_where(WhereEntry::Date {
            column: column.to_string(),
            operator: operator.to_string(),
            value: value.into(),
            connector: Connector::And,
        })
    }

    pub fn where_column(self, first: &str, operator: &str, second: &str) -> Self {
        self.push_where(WhereEntry::Column {
            first: first.to_string(),
            operator: operator.to_string(),
            second: second.to_string(),
            connector: Connector::And,
        })
    }

    pub fn where_raw(self, expr: impl Into<String>, bindings: Vec<(String, Value)>) -> Self {
        self.push_where(WhereEntry::Raw {
            expr: expr.into(),
            bindings,
            connector: Connector::And,
        })
    }

    /// Parenthesized group; the group's wheres compile recursively, so mixed
    /// and/or precedence inside the group stays local to it
    pub fn where_nested(self, query: QueryState) -> Self {
        self.push_where(WhereEntry::Nested {
            query: Box::new(query),
            connector: Connector::And,
        })
    }

    pub fn or_where_nested(self, query: QueryState) -> Self {
        self.push_where(WhereEntry::Nested {
            query: Box::new(query),
            connector: Connector::Or,
        })
    }

    pub fn where_exists(self, query: QueryState) -> Self {
        self.push_where(WhereEntry::Exists {
            query: Box::new(query),
            negated: false,
            connector: Connector::And,
        })
    }

    pub fn where_not_exists(self, query: QueryState) -> Self {
        self.push_where(WhereEntry::Exists {
            query: Box::new(query),
            negated: true,
            connector: Connector::And,
        })
    }

    /// Relationship existence with the default `(>=, 1)` form
    pub fn where_has(self, descriptor: RelationshipDescriptor) -> Self {
        self.where_has_count(descriptor, ">=", 1)
    }

    pub fn where_has_count(
        self,
        descriptor: RelationshipDescriptor,
        operator: &str,
        count: i64,
    ) -> Self {
        self.push_where(WhereEntry::Relationship {
            descriptor,
            operator: operator.to_string(),
            count,
            constraint: None,
            connector: Connector::And,
        })
    }

    /// Relationship existence filtered by a constraint on the related entity
    pub fn where_has_constrained(
        self,
        descriptor: RelationshipDescriptor,
        operator: &str,
        count: i64,
        constraint: QueryState,
    ) -> Self {
        self.push_where(WhereEntry::Relationship {
            descriptor,
            operator: operator.to_string(),
            count,
            constraint: Some(Box::new(constraint)),
            connector: Connector::And,
        })
    }

    /// Negated relationship existence, i.e. the `(<, 1)` form
    pub fn where_doesnt_have(self, descriptor: RelationshipDescriptor) -> Self {
        self.where_has_count(descriptor, "<", 1)
    }

    pub fn join(self, target: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_on(
            JoinKind::Inner,
            target,
            vec![OnCondition::new(first, operator, second)],
        )
    }

    pub fn left_join(self, target: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_on(
            JoinKind::Left,
            target,
            vec![OnCondition::new(first, operator, second)],
        )
    }

    pub fn right_join(self, target: &str, first: &str, operator: &str, second: &str) -> Self {
        self.join_on(
            JoinKind::Right,
            target,
            vec![OnCondition::new(first, operator, second)],
        )
    }

    pub fn cross_join(self, target: &str) -> Self {
        self.join_on(JoinKind::Cross, target, Vec::new())
    }

    pub fn join_on(mut self, kind: JoinKind, target: &str, on: Vec<OnCondition>) -> Self {
        self.joins.push(JoinEntry::new(kind, target, on));
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.orders.push(OrderEntry::Column {
            column: column.to_string(),
            direction: SortDirection::Asc,
        });
        self
    }

    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.orders.push(OrderEntry::Column {
            column: column.to_string(),
            direction: SortDirection::Desc,
        });
        self
    }

    pub fn order_by_raw(mut self, expr: impl Into<String>) -> Self {
        self.orders.push(OrderEntry::Raw(expr.into()));
        self
    }

    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by
            .extend(columns.iter().map(|c| c.to_string()));
        self
    }

    pub fn having(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.havings.push(WhereEntry::Basic {
            column: column.to_string(),
            operator: operator.to_string(),
            value: Some(value.into()),
            connector: Connector::And,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Annotate each result row with the count of a relationship's matches
    pub fn with_count(self, descriptor: RelationshipDescriptor, alias: &str) -> Self {
        self.with_aggregate(descriptor, AggregateFunction::Count, None, alias)
    }

    pub fn with_aggregate(
        mut self,
        descriptor: RelationshipDescriptor,
        function: AggregateFunction,
        column: Option<&str>,
        alias: &str,
    ) -> Self {
        self.aggregates.push(AggregateRequest {
            descriptor,
            function,
            column: column.map(|c| c.to_string()),
            alias: alias.to_string(),
            constraint: None,
        });
        self
    }

    /// The full compiled label list: parsed base label plus extra labels.
    /// Never empty.
    pub fn labels(&self) -> Vec<String> {
        let base = crate::cypher_generator::alias_resolver::parse_name(&self.from_expr).0;
        let mut labels = vec![base];
        labels.extend(self.extra_labels.iter().cloned());
        labels
    }
}
