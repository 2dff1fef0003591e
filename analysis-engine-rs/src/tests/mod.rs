//! Test suite for the orchestration engine

mod support;

mod aggregate_tests;
mod notify_tests;
mod registry_tests;
