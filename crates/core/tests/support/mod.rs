#![allow(dead_code)]

//! Shared test helpers for `restock-core` integration tests.
//!
//! These helpers provide lightweight store and sink mocks so that pipeline
//! tests can focus on behaviour instead of boilerplate.

pub mod repositories;
