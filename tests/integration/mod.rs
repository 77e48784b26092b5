//! Integration test suite for reportloom
//!
//! End-to-end tests that load real packages, compile and render them, and read
//! the results back. They run in CI on every commit.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **scenarios**: The reference row and column loop workbooks
//! - **loops**: Row, column and nested loops in OpenDocument spreadsheets
//! - **images**: Image embedding, deduplication and manifest entries
//! - **escaping**: Property tests for value escaping and markup pass-through
//! - **errors**: Malformed templates and failed renders
//! - **container**: Package round-trips and compression
//! - **concurrency**: Many renders from one template
//! - **cli**: The `reportloom` binary

// Shared test utilities (from parent tests/ directory)
#[path = "../common/mod.rs"]
mod common;

mod cli;
mod concurrency;
mod container;
mod errors;
mod escaping;
mod images;
mod loops;
mod scenarios;
