//! # coma-contracts
//!
//! Shared types, errors, and contracts for the COMA approval gate.
//!
//! Every crate in the workspace imports from here. No verification logic
//! lives in this crate, only data definitions and error types.

pub mod audit;
pub mod bundle;
pub mod decision;
pub mod error;
pub mod policy;
pub mod request;
