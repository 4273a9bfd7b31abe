//! cypherquill: a declarative graph-query builder and Cypher compiler.
//!
//! Queries are assembled as immutable [`query_model::QueryState`] values,
//! compiled by [`cypher_generator::CypherGenerator`] into parameterized
//! Cypher text, and executed through [`connection::Connection`] against any
//! [`connection::GraphDriver`] implementation. Execution is synchronous,
//! with classified retries and nested logical transactions.
//!
//! ```no_run
//! use cypherquill::query_model::QueryState;
//! use cypherquill::cypher_generator::CypherGenerator;
//!
//! let state = QueryState::from("users")
//!     .and_where("age", ">", 21)
//!     .order_by_desc("created_at")
//!     .limit(10);
//! let compiled = CypherGenerator::default().compile_select(&state)?;
//! assert!(compiled.text.starts_with("MATCH (n:users)"));
//! # Ok::<(), cypherquill::cypher_generator::CypherGeneratorError>(())
//! ```

pub mod config;
pub mod connection;
pub mod cypher_generator;
pub mod query_model;

pub use config::{CompilerConfig, ConnectionConfig};
pub use connection::{Connection, ConnectionError, GraphDriver, RetryPolicy, Row};
pub use cypher_generator::{CompiledQuery, CypherGenerator, CypherGeneratorError};
pub use query_model::QueryState;
