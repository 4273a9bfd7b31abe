//! Relationship descriptors.
//!
//! A descriptor identifies a relationship by its shape, key names, and the
//! related entity's label. Descriptors are produced by model-introspection
//! collaborators outside this crate and consumed read-only by the subquery
//! translator. The relationship name is passed explicitly at construction
//! time; it is never inferred from the call stack.

use super::QueryState;

/// Closed enumeration of the supported relationship shapes.
///
/// Shape drives both the correlated pattern template and the aggregate
/// execution strategy (inline vs deferred).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipShape {
    /// hasOne / hasMany: foreign key on the related entity
    OneToMany,
    /// belongsTo: foreign key on the parent entity
    ManyToOne,
    /// belongsToMany: through a pivot node carrying both foreign keys, or a
    /// native typed edge when the descriptor declares one
    ManyToMany,
    /// hasManyThrough: parent -> through -> related chain
    Through,
    /// morphOne / morphMany: foreign key plus type discriminator on the
    /// related entity
    PolymorphicMany,
    /// morphTo: the inverse side holds both discriminator properties itself
    PolymorphicInverse,
}

/// Key names on the intermediate pivot node of a many-to-many relationship
#[derive(Debug, Clone)]
pub struct PivotKeys {
    pub label: String,
    /// Foreign key on the pivot pointing back at the parent
    pub parent_key: String,
    /// Foreign key on the pivot pointing at the related entity
    pub related_key: String,
}

/// Key names for a through-intermediate chain
#[derive(Debug, Clone)]
pub struct ThroughKeys {
    pub label: String,
    /// Foreign key on the through entity pointing at the parent
    pub first_key: String,
    /// Foreign key on the related entity pointing at the through entity
    pub second_key: String,
    /// The through entity's own key matched by `second_key`
    pub local_key: String,
}

/// Discriminator properties of a polymorphic relationship
#[derive(Debug, Clone)]
pub struct MorphKeys {
    /// Property holding the owning type's identifier
    pub type_column: String,
    /// Property holding the owning entity's key
    pub id_column: String,
    /// The owning type's identifier value, bound as a parameter
    pub type_value: String,
}

#[derive(Debug, Clone)]
pub struct RelationshipDescriptor {
    /// Human-readable relationship name, supplied explicitly by the caller
    pub name: String,
    pub shape: RelationshipShape,
    pub related_label: String,
    /// Foreign-key side of the single-hop equality; on the related entity
    /// for OneToMany, on the parent for ManyToOne
    pub foreign_key: String,
    /// Key on the parent entity
    pub local_key: String,
    /// Key on the related entity (the owner key for ManyToOne, the key the
    /// pivot's `related_key` points at for ManyToMany)
    pub related_key: String,
    pub pivot: Option<PivotKeys>,
    /// Native typed edge backing a many-to-many relationship
    pub edge_type: Option<String>,
    pub through: Option<ThroughKeys>,
    pub morph: Option<MorphKeys>,
}

impl RelationshipDescriptor {
    fn base(name: &str, shape: RelationshipShape, related_label: &str) -> Self {
        Self {
            name: name.to_string(),
            shape,
            related_label: related_label.to_string(),
            foreign_key: String::new(),
            local_key: "id".to_string(),
            related_key: "id".to_string(),
            pivot: None,
            edge_type: None,
            through: None,
            morph: None,
        }
    }

    pub fn has_many(name: &str, related_label: &str, foreign_key: &str, local_key: &str) -> Self {
        Self {
            foreign_key: foreign_key.to_string(),
            local_key: local_key.to_string(),
            ..Self::base(name, RelationshipShape::OneToMany, related_label)
        }
    }

    pub fn belongs_to(name: &str, related_label: &str, foreign_key: &str, owner_key: &str) -> Self {
        Self {
            foreign_key: foreign_key.to_string(),
            related_key: owner_key.to_string(),
            ..Self::base(name, RelationshipShape::ManyToOne, related_label)
        }
    }

    pub fn belongs_to_many(
        name: &str,
        related_label: &str,
        pivot_label: &str,
        parent_key: &str,
        related_key: &str,
    ) -> Self {
        Self {
            pivot: Some(PivotKeys {
                label: pivot_label.to_string(),
                parent_key: parent_key.to_string(),
                related_key: related_key.to_string(),
            }),
            ..Self::base(name, RelationshipShape::ManyToMany, related_label)
        }
    }

    /// Many-to-many backed by a native typed edge instead of a pivot node
    pub fn with_edge_type(mut self, edge_type: &str) -> Self {
        self.edge_type = Some(edge_type.to_string());
        self
    }

    pub fn has_many_through(
        name: &str,
        related_label: &str,
        through_label: &str,
        first_key: &str,
        second_key: &str,
    ) -> Self {
        Self {
            through: Some(ThroughKeys {
                label: through_label.to_string(),
                first_key: first_key.to_string(),
                second_key: second_key.to_string(),
                local_key: "id".to_string(),
            }),
            ..Self::base(name, RelationshipShape::Through, related_label)
        }
    }

    pub fn morph_many(
        name: &str,
        related_label: &str,
        type_column: &str,
        id_column: &str,
        type_value: &str,
    ) -> Self {
        Self {
            morph: Some(MorphKeys {
                type_column: type_column.to_string(),
                id_column: id_column.to_string(),
                type_value: type_value.to_string(),
            }),
            ..Self::base(name, RelationshipShape::PolymorphicMany, related_label)
        }
    }

    pub fn morph_to(name: &str, type_column: &str, id_column: &str) -> Self {
        Self {
            morph: Some(MorphKeys {
                type_column: type_column.to_string(),
                id_column: id_column.to_string(),
                type_value: String::new(),
            }),
            ..Self::base(name, RelationshipShape::PolymorphicInverse, "")
        }
    }

    /// Override the parent-side key (defaults to `id`)
    pub fn with_local_key(mut self, local_key: &str) -> Self {
        self.local_key = local_key.to_string();
        self
    }

    /// Override the related-side key (defaults to `id`)
    pub fn with_related_key(mut self, related_key: &str) -> Self {
        self.related_key = related_key.to_string();
        self
    }
}

/// Aggregate function applied to a related set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn cypher_name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

/// A requested relationship aggregate annotation (`withCount` and friends).
///
/// The alias must be unique within one query state.
#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub descriptor: RelationshipDescriptor,
    pub function: AggregateFunction,
    /// Target column; `None` for plain counts
    pub column: Option<String>,
    pub alias: String,
    pub constraint: Option<Box<QueryState>>,
}
