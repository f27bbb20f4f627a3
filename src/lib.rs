//! Reconciles class-registration form submissions against capacity-bounded
//! class rosters held in an external row/column ledger.
//!
//! The heart of the crate is [`workflows::registration`]: a deterministic,
//! single-pass allocation engine plus the identity registry, roster snapshot,
//! and notification bookkeeping needed to make repeated runs idempotent.
//! Storage stays behind the [`storage::Table`] trait so the same run logic
//! drives a spreadsheet ledger in production and in-memory tables in tests.

pub mod config;
pub mod error;
pub mod storage;
pub mod telemetry;
pub mod workflows;
