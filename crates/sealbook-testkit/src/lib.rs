//! # Sealbook Testkit
//!
//! Testing utilities for the Sealbook ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A fully wired ledger-plus-oracle bench for integration
//!   scenarios
//! - **Generators**: Proptest strategies for property-based testing
//! - **Protocol vectors**: Deterministic message encodings for
//!   cross-implementation checks
//!
//! ## Fixtures
//!
//! Quickly set up an end-to-end scenario:
//!
//! ```rust
//! use sealbook::RecordValues;
//! use sealbook_testkit::fixtures::{party, TestBench};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bench = TestBench::with_seed([9u8; 32]);
//! let owner = party(1);
//! let values = RecordValues { user_id: 1001, quantity: 2, amount: 700 };
//!
//! let receipt = bench.add(&owner, "Coffee", values).await.unwrap();
//! assert_eq!(receipt.index, 0);
//! # }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sealbook_testkit::generators::{item, record_values};
//!
//! proptest! {
//!     #[test]
//!     fn labels_always_validate(item in item()) {
//!         prop_assert!(sealbook_core::validate_item(&item).is_ok());
//!     }
//! }
//! ```
//!
//! ## Protocol Vectors
//!
//! Export the canonical signing bytes for another implementation:
//!
//! ```rust
//! use sealbook_testkit::vectors::report;
//!
//! for row in report() {
//!     println!("{}: {}", row.name, row.signing_bytes);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{party, TestBench};
pub use vectors::{all_vectors, report, signing_bytes_for, ProtocolVector, VectorReport};
