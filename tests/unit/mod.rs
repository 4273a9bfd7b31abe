//! Integration tests exercising the public crate surface: builder to
//! compiled Cypher, relationship condition translation, and execution
//! against a scripted driver.

mod support;

mod compile;
mod execution;
mod relationships;
