//! Integration test crate for the Eksporyuk affiliate ledger.
//!
//! This crate has no library code. It only contains integration tests
//! that exercise end-to-end flows across the workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p eksporyuk-integration-tests
//! ```
