//! Builder-to-Cypher compilation through the public surface.

use serde_json::json;

use cypherquill::{CypherGenerator, QueryState};

fn compile(state: &QueryState) -> cypherquill::CompiledQuery {
    CypherGenerator::default()
        .compile_select(state)
        .expect("compile")
}

#[test]
fn test_two_inner_joins_and_a_left_join() {
    let state = QueryState::from("users")
        .join("profiles", "profiles.user_id", "=", "users.id")
        .join("accounts", "accounts.user_id", "=", "users.id")
        .left_join("posts", "posts.author_id", "=", "users.id")
        .and_where("users.active", "=", true);
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users), (j1:profiles), (j2:accounts) \
         WHERE j1.user_id = n.id AND j2.user_id = n.id AND (n.active = $users_active) \
         OPTIONAL MATCH (j3:posts) WHERE j3.author_id = n.id \
         RETURN n, j1, j2, j3"
    );
    assert_eq!(compiled.bindings.get("users_active"), Some(&json!(true)));
}

#[test]
fn test_or_where_cannot_escape_the_join_conditions() {
    let state = QueryState::from("users")
        .join("roles", "roles.user_id", "=", "users.id")
        .and_where("a", "=", 1)
        .or_where("b", "=", 2);
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users), (j1:roles) WHERE j1.user_id = n.id AND (n.a = $a OR n.b = $b) RETURN n, j1"
    );
}

#[test]
fn test_declared_alias_resolves_to_base() {
    let state = QueryState::from("users AS u").and_where("u.age", ">", 21);
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users) WHERE n.age > $u_age RETURN n"
    );
}

#[test]
fn test_empty_in_set_compiles_to_false() {
    let state = QueryState::from("users").where_in("status", Vec::new());
    let compiled = compile(&state);
    assert_eq!(compiled.text, "MATCH (n:users) WHERE false RETURN n");
    assert!(compiled.bindings.is_empty());
}

#[test]
fn test_empty_not_in_set_is_omitted() {
    let state = QueryState::from("users").where_not_in("status", Vec::new());
    let compiled = compile(&state);
    assert_eq!(compiled.text, "MATCH (n:users) RETURN n");
    assert!(compiled.bindings.is_empty());
}

#[test]
fn test_not_in_binds_the_whole_set() {
    let state =
        QueryState::from("users").where_not_in("status", vec![json!("banned"), json!("deleted")]);
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users) WHERE NOT (n.status IN $status) RETURN n"
    );
    assert_eq!(
        compiled.bindings.get("status"),
        Some(&json!(["banned", "deleted"]))
    );
}

#[test]
fn test_repeated_column_parameters_are_disambiguated() {
    let state = QueryState::from("users")
        .and_where("users.age", ">", 18)
        .and_where("users.age", "<", 65);
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users) WHERE n.age > $users_age AND n.age < $users_age_2 RETURN n"
    );
    assert_eq!(compiled.bindings.get("users_age"), Some(&json!(18)));
    assert_eq!(compiled.bindings.get("users_age_2"), Some(&json!(65)));
}

#[test]
fn test_date_filter_normalizes_epoch_seconds() {
    let state = QueryState::from("events").where_date("created_at", ">=", 1709284521);
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:events) WHERE substring(n.created_at, 0, 10) >= $created_at RETURN n"
    );
    assert_eq!(
        compiled.bindings.get("created_at"),
        Some(&json!("2024-03-01"))
    );
}

#[test]
fn test_ilike_prepends_case_insensitive_flag() {
    let state = QueryState::from("users").and_where("name", "ilike", "ali.*");
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users) WHERE n.name =~ $name RETURN n"
    );
    assert_eq!(compiled.bindings.get("name"), Some(&json!("(?i)ali.*")));
}

#[test]
fn test_negated_pattern_operator_wraps_in_not() {
    let state = QueryState::from("users").and_where("name", "not like", "bot.*");
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users) WHERE NOT (n.name =~ $name) RETURN n"
    );
}

#[test]
fn test_between_expands_to_bounds() {
    let state = QueryState::from("users").where_between("age", 18, 65);
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users) WHERE (n.age >= $age AND n.age <= $age_2) RETURN n"
    );
}

#[test]
fn test_raw_predicate_carries_its_bindings() {
    let state = QueryState::from("users").where_raw(
        "n.score > $min_score",
        vec![("min_score".to_string(), json!(10))],
    );
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users) WHERE n.score > $min_score RETURN n"
    );
    assert_eq!(compiled.bindings.get("min_score"), Some(&json!(10)));
}

#[test]
fn test_selected_columns_alias_back_to_their_names() {
    let state = QueryState::from("users").select(&["name", "users.email"]);
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users) RETURN n.name AS name, n.email AS users_email"
    );
}

#[test]
fn test_distinct_order_and_pagination() {
    let state = QueryState::from("users")
        .distinct()
        .order_by("name")
        .skip(10)
        .limit(5);
    let compiled = compile(&state);
    assert_eq!(
        compiled.text,
        "MATCH (n:users) RETURN DISTINCT n ORDER BY n.name ASC SKIP 10 LIMIT 5"
    );
}
