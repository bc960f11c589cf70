//! Budgeted directory walker
//!
//! The aggregator measures a single top-level subdirectory; the coordinator
//! loops over all of them, sharing one [`IopsBudget`](crate::budget::IopsBudget).
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │     ScanCoordinator     │
//!                     │  - enumerate parent     │
//!                     │  - bounded parallelism  │
//!                     └───────────┬─────────────┘
//!                                 │
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │ Aggregator│             │ Aggregator│             │ Aggregator│
//! │  alice/   │             │   bob/    │             │  carol/   │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └────────── acquire() ────┼───────────────────────────┘
//!                          ┌──────▼──────┐
//!                          │ IopsBudget  │
//!                          └─────────────┘
//! ```

pub mod aggregator;
pub mod coordinator;

pub use aggregator::{DirectoryAggregate, DirectoryAggregator};
pub use coordinator::{PassSummary, ScanCoordinator};
