//! File-backed usage dataset for billstat
//!
//! This crate implements the usage store, user directory and role provider
//! traits over a directory of JSON files, so reports can be produced without
//! a database.

pub mod data_loader;

pub use data_loader::{DatasetStore, Directory};
