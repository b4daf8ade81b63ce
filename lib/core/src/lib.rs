//! Core types shared by the admin-gate crates.
//!
//! This crate provides the strongly-typed identifiers for persisted entities.

pub mod id;

pub use id::{ParseIdError, PrincipalId};
