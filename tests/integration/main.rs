//! Integration tests for the record-scanner load pipeline.
//!
//! Run with: `cargo test --test integration`

mod common;
mod end_to_end;
mod failure_paths;
mod loader_lifecycle;
