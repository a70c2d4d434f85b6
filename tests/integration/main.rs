//! Integration test suite entry point.

mod pipeline_tests;
mod server_tests;
mod support;
