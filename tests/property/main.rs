//! Property-based tests for the record scanner.
//!
//! Run with: `cargo test --test property`

mod differential;
mod scan_shape;
