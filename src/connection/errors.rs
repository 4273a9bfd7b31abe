//! Error classification taxonomy.
//!
//! Drivers surface failures as message strings, not structured codes, so
//! classification is heuristic substring matching. The taxonomy is the
//! single source of truth for two independent policies: retry eligibility
//! and whether the physical socket must be reopened before the next
//! attempt.

use thiserror::Error;

use crate::cypher_generator::CypherGeneratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Transient,
    Network,
    Authentication,
    Constraint,
    Query,
    Transaction,
    Unknown,
}

impl ErrorClass {
    /// Only transient and network failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::Transient | ErrorClass::Network)
    }
}

/// Classify a driver failure message.
pub fn classify(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();

    if contains_any(
        &lower,
        &["unauthorized", "authentication", "invalid credentials", "password"],
    ) {
        return ErrorClass::Authentication;
    }
    if contains_any(&lower, &["constraint", "already exists", "unique"]) {
        return ErrorClass::Constraint;
    }
    if needs_reconnect(message) || contains_any(&lower, &["unreachable", "network", "refused"]) {
        return ErrorClass::Network;
    }
    if contains_any(
        &lower,
        &["transient", "deadlock", "timed out", "timeout", "temporarily unavailable"],
    ) {
        return ErrorClass::Transient;
    }
    if contains_any(&lower, &["transaction", "rolled back", "terminated"]) {
        return ErrorClass::Transaction;
    }
    if contains_any(
        &lower,
        &["syntax", "invalid", "unknown function", "type mismatch", "parameter"],
    ) {
        return ErrorClass::Query;
    }
    ErrorClass::Unknown
}

/// Narrower pattern set indicating the physical socket is unusable and must
/// be reopened before another attempt.
pub fn needs_reconnect(message: &str) -> bool {
    let lower = message.to_lowercase();
    contains_any(
        &lower,
        &[
            "broken pipe",
            "connection reset",
            "connection refused",
            "connection closed",
            "socket closed",
        ],
    )
}

/// A rollback failing because the transaction was already terminated by a
/// prior failure is idempotent and not surfaced as a new error.
pub fn is_terminated_transaction(message: &str) -> bool {
    let lower = message.to_lowercase();
    contains_any(
        &lower,
        &[
            "no transaction",
            "already been terminated",
            "has been rolled back",
            "transaction closed",
        ],
    )
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("could not open connection: {0}")]
    ConnectFailed(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("constraint violation: {0} (a MERGE with ON MATCH SET can upsert instead of creating a duplicate)")]
    Constraint(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("{class:?} failure persisted after {attempts} attempts: {message}")]
    RetriesExhausted {
        class: ErrorClass,
        attempts: u32,
        message: String,
    },

    #[error("compilation failed: {0}")]
    Compile(#[from] CypherGeneratorError),
}

impl ConnectionError {
    /// Wrap a classified driver failure once the retry budget (if any) is
    /// spent. Retryable classes report the attempt count; the rest map to
    /// their class-specific variant with diagnostic context.
    pub fn from_failure(class: ErrorClass, message: String, attempts: u32) -> Self {
        match class {
            ErrorClass::Authentication => ConnectionError::Authentication(message),
            ErrorClass::Constraint => ConnectionError::Constraint(message),
            ErrorClass::Transaction => ConnectionError::Transaction(message),
            ErrorClass::Transient | ErrorClass::Network => ConnectionError::RetriesExhausted {
                class,
                attempts,
                message,
            },
            ErrorClass::Query | ErrorClass::Unknown => ConnectionError::Query(message),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ConnectionError::ConnectFailed(_) => ErrorClass::Network,
            ConnectionError::Authentication(_) => ErrorClass::Authentication,
            ConnectionError::Constraint(_) => ErrorClass::Constraint,
            ConnectionError::Transaction(_) => ErrorClass::Transaction,
            ConnectionError::Query(_) => ErrorClass::Query,
            ConnectionError::RetriesExhausted { class, .. } => *class,
            ConnectionError::Compile(_) => ErrorClass::Query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(classify("Neo.ClientError.Security.Unauthorized"), ErrorClass::Authentication);
        assert_eq!(classify("node already exists with label"), ErrorClass::Constraint);
        assert_eq!(classify("connection reset by peer"), ErrorClass::Network);
        assert_eq!(classify("deadlock detected"), ErrorClass::Transient);
        assert_eq!(classify("transaction has been rolled back"), ErrorClass::Transaction);
        assert_eq!(classify("Invalid input 'MTCH'"), ErrorClass::Query);
        assert_eq!(classify("something odd"), ErrorClass::Unknown);
    }

    #[test]
    fn test_retryability() {
        assert!(ErrorClass::Transient.is_retryable());
        assert!(ErrorClass::Network.is_retryable());
        assert!(!ErrorClass::Authentication.is_retryable());
        assert!(!ErrorClass::Constraint.is_retryable());
        assert!(!ErrorClass::Query.is_retryable());
        assert!(!ErrorClass::Unknown.is_retryable());
    }

    #[test]
    fn test_reconnect_is_narrower_than_network() {
        assert!(needs_reconnect("broken pipe"));
        assert!(!needs_reconnect("host unreachable"));
        assert_eq!(classify("host unreachable"), ErrorClass::Network);
    }

    #[test]
    fn test_terminated_rollback_detection() {
        assert!(is_terminated_transaction("No transaction to roll back"));
        assert!(is_terminated_transaction(
            "transaction has already been terminated"
        ));
        assert!(!is_terminated_transaction("deadlock detected"));
    }
}
