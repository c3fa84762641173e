//! # replus
//!
//! HTTP server for the replus workout tracker.
//!
//! - [`api`] - JSON routes over sessions, exercises and lines
//! - [`auth`] - accounts, password hashing and bearer tokens
//! - [`config`] - `replus.toml` loading and CLI overrides

pub mod api;
pub mod auth;
pub mod config;
