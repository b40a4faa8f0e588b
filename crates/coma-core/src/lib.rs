//! # coma-core
//!
//! The COMA gate runtime.
//!
//! This crate provides:
//! - The trait seams (`RepositoryReader`, `AuditWriter`)
//! - The request reader
//! - The `Gate` that runs every verification stage in order and turns the
//!   result into a `Decision`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use coma_core::Gate;
//!
//! let gate = Gate::new(policy, Box::new(repository));
//! let decision = gate.evaluate(&stdin_text);
//! ```

pub mod gate;
pub mod request;
pub mod traits;

pub use gate::{deny_unconfigured, Gate, GateOutcome};
