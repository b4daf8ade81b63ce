//! admin-gate web server.
//!
//! This crate serves the admin panel over HTTP: every request under
//! `/admin` is turned into a gated dispatch, with sessions and principals
//! persisted in PostgreSQL.

pub mod actions;
pub mod app;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
