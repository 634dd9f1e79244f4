//! Integration tests for `slugpack compile`.

mod common;
mod compile_tests;
