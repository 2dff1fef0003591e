//! Tests for the backend SDK
//!
//! Organized by concern, mirroring the module layout.

mod remote_backend_tests;
