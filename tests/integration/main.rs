//! Integration test suite entry point.

mod cli_workflow_tests;
mod merge_tests;
mod workflow_tests;
