//! Execution layer behavior against the scripted driver.

use serde_json::json;

use cypherquill::connection::{Connection, ErrorClass, RetryPolicy};
use cypherquill::cypher_generator::Bindings;
use cypherquill::query_model::RelationshipDescriptor;
use cypherquill::{ConnectionConfig, ConnectionError, CypherGenerator, QueryState};

use crate::support::{row, ScriptedDriver};

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3).with_initial_delay_ms(1).without_jitter()
}

fn connect(driver: ScriptedDriver) -> Connection<ScriptedDriver> {
    Connection::new(driver, ConnectionConfig::default())
        .expect("connection")
        .with_retry_policy(fast_policy())
}

#[test]
fn test_deferred_aggregate_follow_up_per_row() {
    let state = QueryState::from("users").with_count(
        RelationshipDescriptor::belongs_to_many("roles", "Role", "role_user", "user_id", "role_id"),
        "roles_count",
    );
    let compiled = CypherGenerator::default()
        .compile_select(&state)
        .expect("compile");

    let (mut driver, calls) = ScriptedDriver::new();
    driver.push_rows(vec![
        row(&[("n", json!({"id": 7})), ("roles_count", json!(0))]),
        row(&[("n", json!({"id": 8})), ("roles_count", json!(0))]),
    ]);
    driver.push_rows(vec![row(&[("roles_count", json!(2))])]);
    driver.push_rows(vec![row(&[("roles_count", json!(5))])]);
    let mut conn = connect(driver);

    let rows = conn.run_compiled(&compiled).expect("run");
    assert_eq!(rows[0].get("roles_count"), Some(&json!(2)));
    assert_eq!(rows[1].get("roles_count"), Some(&json!(5)));

    let queries = calls.borrow().queries.clone();
    assert_eq!(queries.len(), 3);
    assert_eq!(queries[0], compiled.text);
    assert_eq!(queries[1], compiled.deferred_aggregates[0].text);
}

#[test]
fn test_write_unit_retries_transient_failures() {
    let (driver, calls) = ScriptedDriver::new();
    let mut conn = connect(driver);

    let mut attempts = 0;
    let value = conn
        .write(|_| {
            attempts += 1;
            if attempts == 1 {
                Err(ConnectionError::from_failure(
                    ErrorClass::Transient,
                    "deadlock detected".to_string(),
                    1,
                ))
            } else {
                Ok(42)
            }
        })
        .expect("write");

    assert_eq!(value, 42);
    assert_eq!(attempts, 2);
    let calls = calls.borrow();
    assert_eq!(calls.begins, 2);
    assert_eq!(calls.rollbacks, 1);
    assert_eq!(calls.commits, 1);
}

#[test]
fn test_write_does_not_retry_query_failures() {
    let (driver, calls) = ScriptedDriver::new();
    let mut conn = connect(driver);

    let result: Result<(), _> = conn.write(|_| Err(ConnectionError::Query("bad".to_string())));
    assert!(matches!(result, Err(ConnectionError::Query(_))));
    let calls = calls.borrow();
    assert_eq!(calls.begins, 1);
    assert_eq!(calls.rollbacks, 1);
    assert_eq!(calls.commits, 0);
}

#[test]
fn test_compiled_statement_reports_affected_count() {
    let state = QueryState::from("users").and_where("active", "=", false);
    let compiled = CypherGenerator::default()
        .compile_delete(&state)
        .expect("compile");

    let (mut driver, calls) = ScriptedDriver::new();
    driver.push_affected(3);
    let mut conn = connect(driver);

    let affected = conn.run_compiled_statement(&compiled).expect("run");
    assert_eq!(affected, 3);
    assert_eq!(calls.borrow().statements, vec![compiled.text.clone()]);
}

#[test]
fn test_query_log_records_names_not_values() {
    let (driver, _calls) = ScriptedDriver::new();
    let mut conn = connect(driver);

    let state = QueryState::from("users").and_where("age", ">", 21);
    let compiled = CypherGenerator::default()
        .compile_select(&state)
        .expect("compile");
    conn.run_compiled(&compiled).expect("run");

    let entries: Vec<_> = conn.query_log().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, compiled.text);
    assert_eq!(entries[0].param_names, vec!["age".to_string()]);
    assert_eq!(entries[0].rows, Some(0));
}

#[test]
fn test_reconnect_after_broken_pipe_then_succeed() {
    let (mut driver, calls) = ScriptedDriver::new();
    driver.push_query_failure("broken pipe");
    driver.push_rows(vec![row(&[("n", json!({"id": 1}))])]);
    let mut conn = connect(driver);

    let rows = conn.select("MATCH (n:users) RETURN n", &Bindings::new()).expect("select");
    assert_eq!(rows.len(), 1);
    let calls = calls.borrow();
    assert_eq!(calls.disconnects, 1);
    assert_eq!(calls.connects, 2);
}
