use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CypherGeneratorError {
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid date value for column {column}: {value}")]
    InvalidDateValue { column: String, value: String },

    #[error("Relationship '{name}' is missing {what} keys required by its shape")]
    IncompleteDescriptor { name: String, what: String },

    #[error("Duplicate aggregate alias: {0}")]
    DuplicateAggregateAlias(String),

    #[error("Aggregate '{alias}' needs a target column for {function}")]
    MissingAggregateColumn { alias: String, function: String },

    #[error("Create statement has no properties")]
    MissingMutationProperties,

    #[error("Update statement has no SET values")]
    EmptyUpdate,

    #[error("Upsert statement has no match keys")]
    MissingMergeKeys,

    #[error("Invalid render state: {0}")]
    InvalidRenderState(String),
}
