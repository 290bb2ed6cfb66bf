//! # Term Reconcile - Source/Target Table Comparison for Rust
//!
//! Term Reconcile compares a *source* table (ground truth) with a *target*
//! table (the system under validation), possibly living on different
//! database engines, and classifies the differences into a single verdict.
//! It is built on the same DataFusion/Arrow stack as the Term data
//! validation library.
//!
//! ## Overview
//!
//! Three comparisons form the core, each callable on its own:
//!
//! - **Schema**: missing/extra columns, normalized type, DECIMAL precision,
//!   TEXT length and nullability differences
//! - **Row count**: filtered `COUNT(*)` on both sides with a relative tolerance
//! - **NULL pattern**: per shared column NULL ratio, MATCH or DIVERGENT
//!
//! Two more cover keyed column-value comparison and single-table row bounds.
//! A [`core::ComparisonSuite`] bundles any of them and aggregates the results
//! into a [`core::ValidationVerdict`] with status PASS, WARN, FAIL or ERROR.
//!
//! ## Quick Start
//!
//! ```rust
//! use term_reconcile::prelude::*;
//! use term_reconcile::core::{ComparisonKind, ComparisonSuite, TableDescriptor, VerdictStatus};
//! use term_reconcile::engine::DataFusionEngine;
//! use datafusion::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let legacy = SessionContext::new();
//! legacy.sql("CREATE TABLE orders (id INT, amount DOUBLE, phone VARCHAR)").await?;
//! let migrated = SessionContext::new();
//! migrated.sql("CREATE TABLE orders (id INT, amount DOUBLE, phone VARCHAR)").await?;
//!
//! let source = TableDescriptor::parse(Arc::new(DataFusionEngine::new(legacy)), "orders")?;
//! let target = TableDescriptor::parse(Arc::new(DataFusionEngine::new(migrated)), "orders")?;
//!
//! let verdict = ComparisonSuite::builder("orders_smoke")
//!     .kinds(ComparisonKind::SMOKE)
//!     .build()
//!     .run(&source, &target)
//!     .await?;
//!
//! assert_eq!(verdict.status, VerdictStatus::Pass);
//! println!("{}", verdict.to_json()?);
//! # Ok(())
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
//! ```
//!
//! ## Engines
//!
//! Comparators depend only on the [`engine::TableEngine`] trait.
//! [`engine::DataFusionEngine`] covers anything registered in a DataFusion
//! `SessionContext`; the `postgres` feature adds a native PostgreSQL engine.
//!
//! ## Error Handling
//!
//! Only configuration errors (bad identifiers, invalid options, unknown
//! comparison types) are returned as `Err` from a suite run. Database
//! failures are captured per component as ERROR outcomes carrying an
//! [`error::ErrorClass`], so a caller can retry transient failures.
//!
//! ## Logging
//!
//! All comparators emit `tracing` spans and events. Use
//! [`logging::setup::init_logging`] or install your own subscriber.

pub mod compare;
pub mod core;
pub mod engine;
pub mod error;
pub mod logging;
pub mod params;
pub mod prelude;
pub mod security;

#[cfg(test)]
pub mod test_helpers;
