//! Relationship conditions across every shape and condition form.

use serde_json::json;
use test_case::test_case;

use cypherquill::query_model::RelationshipDescriptor;
use cypherquill::{CypherGenerator, QueryState};

fn descriptor(shape: &str) -> RelationshipDescriptor {
    match shape {
        "one_to_many" => RelationshipDescriptor::has_many("posts", "Post", "user_id", "id"),
        "many_to_one" => RelationshipDescriptor::belongs_to("author", "User", "author_id", "id"),
        "many_to_many" => RelationshipDescriptor::belongs_to_many(
            "roles", "Role", "role_user", "user_id", "role_id",
        ),
        "through" => RelationshipDescriptor::has_many_through(
            "comments", "Comment", "Post", "user_id", "post_id",
        ),
        "polymorphic_many" => RelationshipDescriptor::morph_many(
            "comments",
            "Comment",
            "commentable_type",
            "commentable_id",
            "users",
        ),
        "polymorphic_inverse" => {
            RelationshipDescriptor::morph_to("commentable", "commentable_type", "commentable_id")
        }
        other => panic!("unknown shape {other}"),
    }
}

#[test_case("one_to_many", ">=", 1,
    "EXISTS { MATCH (r1:Post) WHERE r1.user_id = n.id }" ; "one to many existence")]
#[test_case("one_to_many", "<", 1,
    "NOT EXISTS { MATCH (r1:Post) WHERE r1.user_id = n.id }" ; "one to many negated")]
#[test_case("one_to_many", ">=", 3,
    "COUNT { MATCH (r1:Post) WHERE r1.user_id = n.id } >= 3" ; "one to many threshold")]
#[test_case("many_to_one", ">=", 1,
    "EXISTS { MATCH (r1:User) WHERE r1.id = n.author_id }" ; "many to one existence")]
#[test_case("many_to_one", "<", 1,
    "NOT EXISTS { MATCH (r1:User) WHERE r1.id = n.author_id }" ; "many to one negated")]
#[test_case("many_to_one", "=", 1,
    "COUNT { MATCH (r1:User) WHERE r1.id = n.author_id } = 1" ; "many to one threshold")]
#[test_case("many_to_many", ">=", 1,
    "EXISTS { MATCH (p1:role_user), (r1:Role) WHERE p1.user_id = n.id AND r1.id = p1.role_id }" ; "many to many existence")]
#[test_case("many_to_many", "<", 1,
    "NOT EXISTS { MATCH (p1:role_user), (r1:Role) WHERE p1.user_id = n.id AND r1.id = p1.role_id }" ; "many to many negated")]
#[test_case("many_to_many", ">", 2,
    "COUNT { MATCH (p1:role_user), (r1:Role) WHERE p1.user_id = n.id AND r1.id = p1.role_id } > 2" ; "many to many threshold")]
#[test_case("through", ">=", 1,
    "EXISTS { MATCH (t1:Post), (r1:Comment) WHERE t1.user_id = n.id AND r1.post_id = t1.id }" ; "through existence")]
#[test_case("through", "<", 1,
    "NOT EXISTS { MATCH (t1:Post), (r1:Comment) WHERE t1.user_id = n.id AND r1.post_id = t1.id }" ; "through negated")]
#[test_case("through", ">=", 5,
    "COUNT { MATCH (t1:Post), (r1:Comment) WHERE t1.user_id = n.id AND r1.post_id = t1.id } >= 5" ; "through threshold")]
#[test_case("polymorphic_many", ">=", 1,
    "EXISTS { MATCH (r1:Comment) WHERE r1.commentable_id = n.id AND r1.commentable_type = $commentable_type }" ; "polymorphic many existence")]
#[test_case("polymorphic_many", "<", 1,
    "NOT EXISTS { MATCH (r1:Comment) WHERE r1.commentable_id = n.id AND r1.commentable_type = $commentable_type }" ; "polymorphic many negated")]
#[test_case("polymorphic_many", "<", 3,
    "COUNT { MATCH (r1:Comment) WHERE r1.commentable_id = n.id AND r1.commentable_type = $commentable_type } < 3" ; "polymorphic many threshold")]
#[test_case("polymorphic_inverse", ">=", 1,
    "(n.commentable_id IS NOT NULL AND n.commentable_type IS NOT NULL)" ; "polymorphic inverse existence")]
#[test_case("polymorphic_inverse", "<", 1,
    "(n.commentable_id IS NULL AND n.commentable_type IS NULL)" ; "polymorphic inverse negated")]
#[test_case("polymorphic_inverse", "=", 1,
    "(CASE WHEN n.commentable_id IS NOT NULL AND n.commentable_type IS NOT NULL THEN 1 ELSE 0 END) = 1" ; "polymorphic inverse threshold")]
fn relationship_condition(shape: &str, operator: &str, count: i64, expected: &str) {
    let state = QueryState::from("users").where_has_count(descriptor(shape), operator, count);
    let compiled = CypherGenerator::default()
        .compile_select(&state)
        .expect("compile");
    assert_eq!(
        compiled.text,
        format!("MATCH (n:users) WHERE {} RETURN n", expected)
    );
}

#[test]
fn test_polymorphic_many_binds_the_type_discriminator() {
    let state = QueryState::from("users").where_has(descriptor("polymorphic_many"));
    let compiled = CypherGenerator::default()
        .compile_select(&state)
        .expect("compile");
    assert_eq!(
        compiled.bindings.get("commentable_type"),
        Some(&json!("users"))
    );
}

#[test]
fn test_doesnt_have_negates_with_the_foreign_key() {
    let state = QueryState::from("users").where_doesnt_have(RelationshipDescriptor::has_many(
        "posts", "Post", "user_id", "id",
    ));
    let compiled = CypherGenerator::default()
        .compile_select(&state)
        .expect("compile");
    assert_eq!(
        compiled.text,
        "MATCH (n:users) WHERE NOT EXISTS { MATCH (r1:Post) WHERE r1.user_id = n.id } RETURN n"
    );
}

#[test]
fn test_constrained_has_filters_the_related_entity() {
    let constraint = QueryState::default().and_where("published", "=", true);
    let state = QueryState::from("users").where_has_constrained(
        RelationshipDescriptor::has_many("posts", "Post", "user_id", "id"),
        ">=",
        1,
        constraint,
    );
    let compiled = CypherGenerator::default()
        .compile_select(&state)
        .expect("compile");
    assert_eq!(
        compiled.text,
        "MATCH (n:users) WHERE EXISTS { MATCH (r1:Post) WHERE r1.user_id = n.id AND (r1.published = $published) } RETURN n"
    );
    assert_eq!(compiled.bindings.get("published"), Some(&json!(true)));
}

#[test]
fn test_native_edge_replaces_the_pivot_pattern() {
    let state = QueryState::from("users").where_has(
        RelationshipDescriptor::belongs_to_many("roles", "Role", "role_user", "user_id", "role_id")
            .with_edge_type("HAS_ROLE"),
    );
    let compiled = CypherGenerator::default()
        .compile_select(&state)
        .expect("compile");
    assert_eq!(
        compiled.text,
        "MATCH (n:users) WHERE EXISTS { MATCH (n)-[:HAS_ROLE]->(r1:Role) } RETURN n"
    );
}

#[test]
fn test_inline_count_annotation() {
    let state = QueryState::from("users").with_count(
        RelationshipDescriptor::has_many("posts", "Post", "user_id", "id"),
        "posts_count",
    );
    let compiled = CypherGenerator::default()
        .compile_select(&state)
        .expect("compile");
    assert_eq!(
        compiled.text,
        "MATCH (n:users) RETURN n, COUNT { MATCH (r1:Post) WHERE r1.user_id = n.id } AS posts_count"
    );
    assert!(compiled.deferred_aggregates.is_empty());
}

#[test]
fn test_deferred_count_leaves_a_placeholder() {
    let state = QueryState::from("users").with_count(descriptor("many_to_many"), "roles_count");
    let compiled = CypherGenerator::default()
        .compile_select(&state)
        .expect("compile");
    assert_eq!(compiled.text, "MATCH (n:users) RETURN n, 0 AS roles_count");
    assert_eq!(compiled.deferred_aggregates.len(), 1);
    assert_eq!(compiled.deferred_aggregates[0].source_column, "id");
}
