//! # coma-policy
//!
//! Loads the operator's [`GatePolicy`](coma_contracts::policy::GatePolicy)
//! from a TOML file.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//!
//! let policy = coma_policy::from_file(Path::new("/etc/coma-gate.toml"))?;
//! ```
//!
//! An empty document is a valid policy and reproduces the built-in contract.

pub mod loader;

pub use loader::{from_file, from_toml_str};

// ── Tests ─────────────────────────────────────────────────────────────────────
