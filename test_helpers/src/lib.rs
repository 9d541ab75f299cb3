//! Test helpers shared across crates in the confstack workspace.
//!
//! Provides temporary fragment trees, deterministic EJSON fixtures and
//! `figment::Jail` glue.

pub mod ejson;
pub mod figment;
pub mod tree;
